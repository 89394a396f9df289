//! Zero-page placement through the full pipeline

use shade::config::{PlatformConfig, ZpRange};
use shade::table::EntryKind;
use shade::{AllocWarning, CoalesceStrategy, Region};

use crate::common::fixtures;
use crate::common::harness::{FnSpec, build, run, run_with};

#[test]
fn grants_stay_inside_the_budget() {
    // More pointer bytes than the VIC-20 has free zero page; overflow
    // must spill to RAM, never into reserved ranges.
    let mut spec = FnSpec::new("main").entry(EntryKind::Reset);
    for i in 0..8 {
        spec = spec.pointer(&format!("p{}", i), 4);
    }
    let table = build(vec![spec]);
    let platform = PlatformConfig::vic20();
    let layout = run_with(&table, &platform, CoalesceStrategy::LargestFirst).unwrap();

    assert!(layout.zero_page_bytes(&table) <= platform.zp_budget());
    for (id, function) in table.iter() {
        for index in 0..function.variables.len() {
            let var = shade::table::VariableId { function: id, index: index as u32 };
            let allocation = layout.allocation(var).unwrap();
            if allocation.region == Region::ZeroPage {
                assert!(!platform.zp_is_reserved(allocation.address as u8));
            }
        }
    }
}

#[test]
fn required_zero_page_is_honored() {
    let table = build(vec![
        FnSpec::new("main").entry(EntryKind::Reset).zp_local("cursor", 2).local("pad", 4),
    ]);
    let layout = run(&table).unwrap();
    let main = table.lookup("main").unwrap();
    let cursor = shade::table::VariableId { function: main, index: 0 };
    let pad = shade::table::VariableId { function: main, index: 1 };

    assert_eq!(layout.allocation(cursor).unwrap().region, Region::ZeroPage);
    // 4 bytes is past the eligibility cutoff; it lands in RAM.
    assert_eq!(layout.allocation(pad).unwrap().region, Region::Ram);
}

#[test]
fn fallback_is_reported_as_warning() {
    // Squeeze the C64 map down to two free bytes so the lower-scoring
    // candidate loses its zero-page spot.
    let mut platform = PlatformConfig::c64();
    platform.user_reserved.push(ZpRange::new(0x04, 0x8F));
    let table = build(vec![
        FnSpec::new("main")
            .entry(EntryKind::Reset)
            .pointer("ptr", 9)
            .local("count", 1),
    ]);
    let layout = run_with(&table, &platform, CoalesceStrategy::LargestFirst).unwrap();

    assert_eq!(layout.warnings.len(), 1);
    let AllocWarning::ZeroPageFallback { variable } = &layout.warnings[0];
    assert_eq!(variable, "main::count");

    let main = table.lookup("main").unwrap();
    let count = shade::table::VariableId { function: main, index: 1 };
    assert_eq!(layout.allocation(count).unwrap().region, Region::Ram);
}

#[test]
fn pinned_zero_page_bytes_stay_exclusive() {
    // $02 is the first free C64 byte; pinning a port there must push
    // the scored pointer past it instead of stacking both at $02.
    let table = build(vec![
        FnSpec::new("main")
            .entry(EntryKind::Reset)
            .fixed("port", 1, 0x02)
            .pointer("ptr", 9),
    ]);
    let layout = run(&table).unwrap();
    let main = table.lookup("main").unwrap();
    let port = layout
        .allocation(shade::table::VariableId { function: main, index: 0 })
        .unwrap();
    let ptr = layout
        .allocation(shade::table::VariableId { function: main, index: 1 })
        .unwrap();

    assert_eq!(port, shade::Allocation { region: Region::ZeroPage, address: 0x02 });
    assert_eq!(ptr.region, Region::ZeroPage);
    assert_eq!(ptr.address, 0x03);
}

#[test]
fn hot_pointers_outrank_cold_bytes() {
    let table = fixtures::game_loop();
    let layout = run(&table).unwrap();
    // draw::screen is the only hot pointer in the fixture; with the
    // whole C64 zero page free it must be granted.
    let draw = table.lookup("draw").unwrap();
    let screen = shade::table::VariableId { function: draw, index: 0 };
    assert_eq!(layout.allocation(screen).unwrap().region, Region::ZeroPage);
}

#[test]
fn recursive_locals_never_reach_the_zero_page() {
    let table = build(vec![
        FnSpec::new("main").entry(EntryKind::Reset).calls("walk"),
        FnSpec::new("walk").recursive().calls("walk").pointer("node", 20),
    ]);
    let layout = run(&table).unwrap();
    let walk = table.lookup("walk").unwrap();
    let node = shade::table::VariableId { function: walk, index: 0 };
    assert_eq!(layout.allocation(node).unwrap().region, Region::Stack);
}
