//! Activity Sets
//!
//! For every statically-allocated function `f`, the set of functions
//! that can be live on the call stack at the same time as `f`: itself
//! plus all of its transitive callers. Sets are bitsets over the dense
//! function indices so the coalescer's membership checks are O(1).

use crate::graph::CallGraph;
use crate::graph::recursion::RecursionInfo;
use crate::table::{FunctionId, FunctionTable};

/// Fixed-capacity bitset over function indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncBitSet {
    words: Vec<u64>,
}

impl FuncBitSet {
    pub fn new(capacity: usize) -> Self {
        Self { words: vec![0; capacity.div_ceil(64)] }
    }

    pub fn insert(&mut self, id: FunctionId) {
        self.words[id.index() / 64] |= 1 << (id.index() % 64);
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        self.words[id.index() / 64] & (1 << (id.index() % 64)) != 0
    }

    pub fn union_with(&mut self, other: &FuncBitSet) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    pub fn is_disjoint(&self, other: &FuncBitSet) -> bool {
        self.words.iter().zip(&other.words).all(|(w, o)| w & o == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &w)| {
            (0..64)
                .filter(move |b| w & (1 << b) != 0)
                .map(move |b| FunctionId((wi * 64 + b) as u32))
        })
    }
}

/// Activity sets for all static-convention functions.
#[derive(Debug)]
pub struct ActivityInfo {
    sets: Vec<FuncBitSet>,
}

impl ActivityInfo {
    pub fn activity(&self, id: FunctionId) -> &FuncBitSet {
        &self.sets[id.index()]
    }
}

/// Compute `activity(f) = {f} ∪ transitive_callers(f)` for every
/// non-recursive function by walking caller edges. Recursive functions
/// use stack frames and are skipped (their sets stay empty).
///
/// Caller chains are followed through recursive functions too: a static
/// frame shared under a recursive caller is still live for the whole
/// recursion.
pub fn build(
    table: &FunctionTable,
    graph: &CallGraph,
    recursion: &RecursionInfo,
) -> ActivityInfo {
    let n = table.len();
    let mut sets = vec![FuncBitSet::new(n); n];

    for id in table.ids() {
        if recursion.is_recursive(id) {
            continue;
        }
        let set = &mut sets[id.index()];
        set.insert(id);

        // Reverse-edge DFS; the bitset doubles as the visited mark.
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            for &caller in graph.callers(node) {
                if !set.contains(caller) {
                    set.insert(caller);
                    stack.push(caller);
                }
            }
        }
    }

    ActivityInfo { sets }
}
