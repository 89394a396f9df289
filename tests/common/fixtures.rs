//! Reusable program shapes for pipeline tests

use shade::table::{EntryKind, FunctionTable};

use super::harness::{FnSpec, build};

/// `main -> update -> physics`, `main -> draw`, plus a raster IRQ that
/// shares `mixer` with the main line. The classic small game loop.
pub fn game_loop() -> FunctionTable {
    build(vec![
        FnSpec::new("main")
            .entry(EntryKind::Reset)
            .calls("update")
            .calls("draw")
            .calls("mixer")
            .local("frame", 2),
        FnSpec::new("update").calls("physics").local("dt", 1),
        FnSpec::new("physics").local("vel", 2).local("acc", 2),
        FnSpec::new("draw").pointer("screen", 9).local("row", 1),
        FnSpec::new("irq_raster")
            .entry(EntryKind::Irq)
            .calls("mixer")
            .local("scanline", 1),
        FnSpec::new("mixer").local("voice", 1),
    ])
}

/// Wide fan-out: one dispatcher, eight leaf handlers with fat frames.
/// All leaves are pairwise coalescable.
pub fn fan_out(leaves: usize) -> FunctionTable {
    let mut specs =
        vec![(0..leaves).fold(FnSpec::new("dispatch").local("op", 1), |spec, i| {
            spec.calls(&format!("handler{}", i))
        })];
    for i in 0..leaves {
        specs.push(
            FnSpec::new(format!("handler{}", i).as_str())
                .local("buf", 8)
                .local("tmp", 2),
        );
    }
    build(specs)
}

/// Deep call chain `f0 -> f1 -> ... -> f{depth-1}`; nothing coalesces.
pub fn deep_chain(depth: usize) -> FunctionTable {
    let mut specs = Vec::new();
    for i in 0..depth {
        let mut spec = FnSpec::new(&format!("f{}", i)).local("slot", 2);
        if i + 1 < depth {
            spec = spec.calls(&format!("f{}", i + 1));
        }
        specs.push(spec);
    }
    build(specs)
}
