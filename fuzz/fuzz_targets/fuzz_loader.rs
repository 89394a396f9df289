use afl::fuzz;

use shade::config::PlatformConfig;
use shade::table::loader;
use shade::{CoalesceStrategy, allocate};

fn main() {
    fuzz!(|data: &[u8]| {
        // Convert bytes to string
        if let Ok(input) = std::str::from_utf8(data) {
            // Parse the project description
            if let Ok(project) = loader::load_str(input, None) {
                // Run the whole allocation pipeline
                let _ = allocate(
                    &project.table,
                    &PlatformConfig::c64(),
                    CoalesceStrategy::LargestFirst,
                );
            }
        }
    });
}
