//! Placement diagnostics surfaced by the full pipeline

use shade::AllocError;
use shade::config::{PlatformConfig, ZpRange};
use shade::table::EntryKind;
use shade::CoalesceStrategy;

use crate::common::harness::{FnSpec, build, run, run_with};

#[test]
fn required_zero_page_variable_reports_occupants() {
    // Two free zero-page bytes, both taken by a hot pointer before the
    // required byte gets a look in.
    let mut platform = PlatformConfig::c64();
    platform.user_reserved.push(ZpRange::new(0x04, 0x8F));
    let table = build(vec![
        FnSpec::new("main")
            .entry(EntryKind::Reset)
            .pointer("cursor", 9)
            .zp_local("x", 1),
    ]);
    let errors = run_with(&table, &platform, CoalesceStrategy::LargestFirst).unwrap_err();
    match &errors[0] {
        AllocError::ZeroPageExhausted { unplaced, occupants } => {
            assert_eq!(unplaced, &["main::x"]);
            assert_eq!(occupants.len(), 1);
            assert_eq!(occupants[0].0, "main::cursor");
            assert_eq!(occupants[0].1, 9 * 0x800);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn fixed_address_inside_reserved_zero_page_fails() {
    let table = build(vec![
        FnSpec::new("main").entry(EntryKind::Reset).fixed("port", 1, 0x0001),
    ]);
    let errors = run(&table).unwrap_err();
    match &errors[0] {
        AllocError::ReservedAddressConflict { variable, address, range } => {
            assert_eq!(variable, "main::port");
            assert_eq!(*address, 0x0001);
            assert!(range.contains("zero page"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn fixed_address_inside_the_data_section_fails() {
    let table = build(vec![
        FnSpec::new("main").entry(EntryKind::Reset).fixed("clash", 2, 0xC100),
    ]);
    let errors = run(&table).unwrap_err();
    match &errors[0] {
        AllocError::ReservedAddressConflict { range, .. } => {
            assert!(range.contains("data section"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn single_frame_larger_than_ram_overflows() {
    let table = build(vec![
        FnSpec::new("main").entry(EntryKind::Reset).ram_local("huge", 5000),
    ]);
    let errors = run(&table).unwrap_err();
    match &errors[0] {
        AllocError::FrameOverflow { name, bytes, available } => {
            assert_eq!(name, "main");
            assert_eq!(*bytes, 5000);
            assert_eq!(*available, 0x1000);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn interrupt_entry_count_is_bounded() {
    // One more irq handler than the thread mask can tag.
    let mut specs = vec![FnSpec::new("main").entry(EntryKind::Reset)];
    for i in 0..32 {
        specs.push(
            FnSpec::new(&format!("irq{}", i))
                .entry(EntryKind::Irq)
                .local("save", 1),
        );
    }
    let errors = run(&build(specs)).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        AllocError::TooManyInterruptEntries { count: 32, limit: 31 }
    ));
}

#[test]
fn non_coalescable_frames_can_exhaust_ram_together() {
    // Five 1000-byte frames on one call chain never overlay; the fifth
    // does not fit in the C64's 4K data section.
    let mut specs = Vec::new();
    for i in 0..5 {
        let mut spec = FnSpec::new(&format!("f{}", i)).ram_local("buf", 1000);
        if i == 0 {
            spec = spec.entry(EntryKind::Reset);
        }
        if i + 1 < 5 {
            spec = spec.calls(&format!("f{}", i + 1));
        }
        specs.push(spec);
    }
    let errors = run(&build(specs)).unwrap_err();
    match &errors[0] {
        AllocError::FrameOverflow { name, bytes, .. } => {
            assert_eq!(name, "f4");
            assert_eq!(*bytes, 1000);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
