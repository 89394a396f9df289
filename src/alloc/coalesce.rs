//! Frame Coalescing
//!
//! Partitions all static-convention functions into equivalence classes
//! that share one backing address range. Members of a class are never
//! live at the same time, so overlaying their frames is free memory.
//! Minimal coloring of the conflict graph is NP-hard, so classes are
//! built greedily in a tunable order and then re-audited pair by pair.

use crate::alloc::AllocError;
use crate::alloc::activity::ActivityInfo;
use crate::graph::interrupt::ThreadMap;
use crate::graph::recursion::RecursionInfo;
use crate::table::{FunctionId, FunctionTable};

/// Greedy visit order. Affects how much memory coalescing saves, never
/// whether the result is sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoalesceStrategy {
    /// Biggest frames first; they are the hardest to place.
    #[default]
    LargestFirst,
    /// Most conflict-edges first, classic graph-coloring order.
    MostConnected,
}

/// Functions sharing one backing address range.
#[derive(Debug, Clone)]
pub struct EquivalenceClass {
    pub members: Vec<FunctionId>,
}

/// Partition of all static functions into equivalence classes.
#[derive(Debug)]
pub struct CoalesceResult {
    pub classes: Vec<EquivalenceClass>,
    class_of: Vec<Option<usize>>,
}

impl CoalesceResult {
    /// Index of the class a function was assigned to, if it has static
    /// convention.
    pub fn class_of(&self, id: FunctionId) -> Option<usize> {
        self.class_of[id.index()]
    }
}

/// Can `f` and `g` ever be live at the same time?
///
/// Three ways to conflict: thread preemption (anything except one
/// identical single thread), one function sitting on the other's call
/// stack, or both touching hardware-mapped state (conservative aliasing
/// rule).
pub fn conflicts(
    f: FunctionId,
    g: FunctionId,
    table: &FunctionTable,
    activity: &ActivityInfo,
    threads: &ThreadMap,
) -> bool {
    let tf = threads.threads(f);
    let tg = threads.threads(g);
    if tf != tg || !tf.is_singleton() {
        return true;
    }
    if activity.activity(f).contains(g) || activity.activity(g).contains(f) {
        return true;
    }
    table.get(f).touches_volatile() && table.get(g).touches_volatile()
}

/// Greedy first-fit class construction over the chosen visit order.
pub fn coalesce(
    table: &FunctionTable,
    activity: &ActivityInfo,
    threads: &ThreadMap,
    recursion: &RecursionInfo,
    strategy: CoalesceStrategy,
) -> CoalesceResult {
    let statics: Vec<FunctionId> = table
        .ids()
        .filter(|&id| !recursion.is_recursive(id))
        .collect();

    let order = visit_order(&statics, table, activity, threads, strategy);

    let mut classes: Vec<EquivalenceClass> = Vec::new();
    let mut class_of: Vec<Option<usize>> = vec![None; table.len()];

    for &id in &order {
        let slot = classes.iter().position(|class| {
            class
                .members
                .iter()
                .all(|&member| !conflicts(id, member, table, activity, threads))
        });
        match slot {
            Some(index) => {
                classes[index].members.push(id);
                class_of[id.index()] = Some(index);
            }
            None => {
                class_of[id.index()] = Some(classes.len());
                classes.push(EquivalenceClass { members: vec![id] });
            }
        }
    }

    CoalesceResult { classes, class_of }
}

fn visit_order(
    statics: &[FunctionId],
    table: &FunctionTable,
    activity: &ActivityInfo,
    threads: &ThreadMap,
    strategy: CoalesceStrategy,
) -> Vec<FunctionId> {
    let mut order = statics.to_vec();
    match strategy {
        CoalesceStrategy::LargestFirst => {
            order.sort_by_key(|&id| (std::cmp::Reverse(table.get(id).frame_bytes()), id));
        }
        CoalesceStrategy::MostConnected => {
            let degree = |id: FunctionId| {
                statics
                    .iter()
                    .filter(|&&other| other != id && conflicts(id, other, table, activity, threads))
                    .count()
            };
            order.sort_by_key(|&id| (std::cmp::Reverse(degree(id)), id));
        }
    }
    order
}

/// Independent pairwise recheck of every class. A hit here is a
/// coalescer bug, never a user error; the pipeline turns it into
/// `InterruptUnsafeSharing` and aborts.
pub fn audit(
    result: &CoalesceResult,
    table: &FunctionTable,
    activity: &ActivityInfo,
    threads: &ThreadMap,
) -> Vec<AllocError> {
    let mut errors = Vec::new();
    for class in &result.classes {
        for (i, &f) in class.members.iter().enumerate() {
            for &g in &class.members[i + 1..] {
                if conflicts(f, g, table, activity, threads) {
                    errors.push(AllocError::InterruptUnsafeSharing {
                        first: table.get(f).name.clone(),
                        second: table.get(g).name.clone(),
                    });
                }
            }
        }
    }
    errors
}
