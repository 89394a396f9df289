//! Interrupt Reachability
//!
//! Work-list fixpoint that tags every function with the threads it can
//! run on: one thread per interrupt entry point (irq/nmi handlers) plus
//! the implicit main line. Two functions tagged with different threads
//! can preempt each other even when no call path connects them, which is
//! why this pass exists at all.

use crate::graph::CallGraph;
use crate::table::{EntryKind, FunctionId, FunctionTable, MAIN_LINE, ThreadId, ThreadSet};

/// `ThreadSet` is a 32-bit mask and thread 0 is the main line, which
/// caps the interrupt entry points a program may declare.
pub const MAX_INTERRUPT_ENTRIES: usize = 31;

/// Per-function thread tags plus the thread name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMap {
    /// Thread label by id; index 0 is the main line.
    names: Vec<String>,
    /// Tags per function, indexed by function id.
    threads: Vec<ThreadSet>,
}

impl ThreadMap {
    pub fn threads(&self, id: FunctionId) -> ThreadSet {
        self.threads[id.index()]
    }

    pub fn thread_name(&self, thread: ThreadId) -> &str {
        &self.names[thread.0 as usize]
    }

    pub fn thread_count(&self) -> usize {
        self.names.len()
    }

    /// True when the function can run on an interrupt thread.
    pub fn interrupt_reachable(&self, id: FunctionId) -> bool {
        self.threads(id).iter().any(|t| t != MAIN_LINE)
    }
}

/// Seed every entry point with its thread and propagate tags along call
/// edges until nothing changes.
///
/// Main-line is propagated the same way, seeded from `reset` entries and
/// from functions nobody calls (library roots). Functions unreachable
/// from any seed default to main-line only.
pub fn propagate(table: &FunctionTable, graph: &CallGraph) -> ThreadMap {
    let mut names = vec!["main".to_string()];
    let mut threads = vec![ThreadSet::empty(); table.len()];
    let mut worklist: Vec<FunctionId> = Vec::new();

    for (id, function) in table.iter() {
        let seed = match function.entry {
            Some(kind @ (EntryKind::Irq | EntryKind::Nmi)) => {
                let thread = ThreadId(names.len() as u8);
                names.push(format!("{} '{}'", kind.label(), function.name));
                Some(thread)
            }
            Some(EntryKind::Reset) => Some(MAIN_LINE),
            None if graph.callers(id).is_empty() => Some(MAIN_LINE),
            None => None,
        };
        if let Some(thread) = seed {
            threads[id.index()].insert(thread);
            worklist.push(id);
        }
    }

    while let Some(id) = worklist.pop() {
        let tags = threads[id.index()];
        for &callee in graph.callees(id) {
            let merged = threads[callee.index()].union(tags);
            if merged != threads[callee.index()] {
                threads[callee.index()] = merged;
                worklist.push(callee);
            }
        }
    }

    // Dead code still needs storage decisions; default it to main-line.
    for tags in &mut threads {
        if tags.is_empty() {
            tags.insert(MAIN_LINE);
        }
    }

    ThreadMap { names, threads }
}
