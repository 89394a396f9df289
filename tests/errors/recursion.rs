//! Recursion diagnostics surfaced by the full pipeline

use shade::AllocError;
use shade::table::EntryKind;

use crate::common::harness::{FnSpec, build, run};

#[test]
fn unmarked_cycle_names_a_closed_chain() {
    let table = build(vec![
        FnSpec::new("a").entry(EntryKind::Reset).calls("b").local("x", 1),
        FnSpec::new("b").calls("c"),
        FnSpec::new("c").calls("a"),
    ]);
    let errors = run(&table).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        AllocError::UnmarkedRecursion { chain, unmarked } => {
            assert_eq!(chain, &["a", "b", "c", "a"]);
            assert_eq!(unmarked, &["a", "b", "c"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn unmarked_self_call_is_caught() {
    let table = build(vec![
        FnSpec::new("main").entry(EntryKind::Reset).calls("retry"),
        FnSpec::new("retry").calls("retry"),
    ]);
    let errors = run(&table).unwrap_err();
    match &errors[0] {
        AllocError::UnmarkedRecursion { chain, unmarked } => {
            assert_eq!(chain, &["retry", "retry"]);
            assert_eq!(unmarked, &["retry"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn partially_marked_cycle_lists_only_the_missing() {
    let table = build(vec![
        FnSpec::new("even").recursive().calls("odd"),
        FnSpec::new("odd").calls("even"),
    ]);
    let errors = run(&table).unwrap_err();
    match &errors[0] {
        AllocError::UnmarkedRecursion { unmarked, .. } => {
            assert_eq!(unmarked, &["odd"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn recursion_errors_preempt_later_diagnostics() {
    // The fixed address below would be a ReservedAddressConflict, but
    // the cycle makes every downstream pass meaningless; only the
    // recursion error may surface.
    let table = build(vec![
        FnSpec::new("loop").calls("loop").fixed("bad", 1, 0x0000),
    ]);
    let errors = run(&table).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], AllocError::UnmarkedRecursion { .. }));
}
