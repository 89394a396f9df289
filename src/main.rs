use std::fs;
use std::path::Path;

use shade::{CoalesceStrategy, PlatformConfig, allocate, loader};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args = std::env::args().collect::<Vec<String>>();

    let mut file: Option<String> = None;
    let mut target: Option<String> = None;
    let mut platform_file: Option<String> = None;
    let mut strategy = CoalesceStrategy::LargestFirst;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-v" => {
                println!("Shade Allocator {}", VERSION);
                return;
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                return;
            }
            "--target" | "-t" => {
                i += 1;
                match args.get(i) {
                    Some(name) => target = Some(name.clone()),
                    None => {
                        eprintln!("error: --target needs a value");
                        std::process::exit(1);
                    }
                }
            }
            "--platform" | "-p" => {
                i += 1;
                match args.get(i) {
                    Some(path) => platform_file = Some(path.clone()),
                    None => {
                        eprintln!("error: --platform needs a value");
                        std::process::exit(1);
                    }
                }
            }
            "--strategy" | "-s" => {
                i += 1;
                strategy = match args.get(i).map(String::as_str) {
                    Some("largest") => CoalesceStrategy::LargestFirst,
                    Some("connected") => CoalesceStrategy::MostConnected,
                    Some(other) => {
                        eprintln!("error: unknown strategy '{}' (expected largest or connected)", other);
                        std::process::exit(1);
                    }
                    None => {
                        eprintln!("error: --strategy needs a value");
                        std::process::exit(1);
                    }
                };
            }
            other if file.is_none() && !other.starts_with('-') => {
                file = Some(other.to_string());
            }
            other => {
                eprintln!("error: unexpected argument '{}'", other);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(file) = file else {
        print_usage(&args[0]);
        std::process::exit(1);
    };

    // Read project description
    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}: {}", file, e);
            std::process::exit(1);
        }
    };

    // Parse into a function table
    let mut project = match loader::load_str(&source, target.as_deref()) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    // A custom memory map replaces the target preset; the project's own
    // zero-page reservations still apply on top.
    if let Some(path) = platform_file {
        match PlatformConfig::load(Path::new(&path)) {
            Ok(mut custom) => {
                custom.user_reserved.extend(project.platform.user_reserved.iter().copied());
                project.platform = custom;
            }
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Run the allocation pipeline
    match allocate(&project.table, &project.platform, strategy) {
        Ok(layout) => {
            for warning in &layout.warnings {
                eprintln!("warning: {}", warning);
            }
            print!("{}", layout.report(&project.table, &project.platform));
        }
        Err(errors) => {
            for error in &errors {
                eprintln!("error: {}", error);
            }
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <project.toml> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --target <name>       Target machine: c64, c128, vic20, x16");
    eprintln!("  -p, --platform <file>     Custom memory map (TOML), replaces the preset");
    eprintln!("  -s, --strategy <name>     Coalescing order: largest, connected");
    eprintln!("  -h, --help                Print this help message");
    eprintln!("  -v, --version             Print version information");
}
