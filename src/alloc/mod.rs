//! Storage Allocation Pipeline
//!
//! Runs the whole-program analysis in dependency order: call graph,
//! recursion detection, interrupt reachability, activity sets, frame
//! coalescing, zero-page allocation, calling conventions, and finally
//! layout emission. Errors are collected rather than short-circuited,
//! except where a failed pass makes everything downstream meaningless
//! (unmarked recursion leaves activity sets undefined).

pub mod activity;
pub mod coalesce;
pub mod convention;
pub mod layout;
pub mod zero_page;

use crate::config::PlatformConfig;
use crate::graph::{CallGraph, interrupt, recursion};
use crate::table::{EntryKind, FunctionTable};

pub use coalesce::CoalesceStrategy;
pub use layout::{Allocation, FunctionLayout, ProgramLayout, Region};

/// Fatal allocation diagnostics. Always collected into a list; any
/// entry aborts code generation.
#[derive(Debug, Clone)]
pub enum AllocError {
    /// A call cycle exists without the required recursive opt-in.
    UnmarkedRecursion {
        /// A concrete closed call chain, first function repeated last.
        chain: Vec<String>,
        /// Cycle members missing the opt-in.
        unmarked: Vec<String>,
    },

    /// A `RequireZeroPage` variable could not be honored.
    ZeroPageExhausted {
        unplaced: Vec<String>,
        /// Current occupants with scores, highest first.
        occupants: Vec<(String, u32)>,
    },

    /// A pinned hardware address sits inside a reserved range.
    ReservedAddressConflict {
        variable: String,
        address: u16,
        range: String,
    },

    /// Two concurrently-live functions were coalesced. Internal
    /// invariant; seeing this means a coalescer bug, not a user error.
    InterruptUnsafeSharing {
        first: String,
        second: String,
    },

    /// A frame (or the data section as a whole) exceeds available RAM.
    FrameOverflow {
        name: String,
        bytes: u32,
        available: usize,
    },

    /// More interrupt entry points than thread tags can represent.
    TooManyInterruptEntries {
        count: usize,
        limit: usize,
    },
}

impl std::fmt::Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocError::UnmarkedRecursion { chain, unmarked } => {
                write!(
                    f,
                    "recursive call cycle without 'recursive' opt-in: {} (missing on: {})",
                    chain.join(" -> "),
                    unmarked.join(", ")
                )
            }
            AllocError::ZeroPageExhausted { unplaced, occupants } => {
                write!(
                    f,
                    "out of zero page memory: cannot place required variable(s) {}",
                    unplaced.join(", ")
                )?;
                if let Some((lowest, score)) = occupants.last() {
                    write!(
                        f,
                        "; lowest-priority occupant is {} (score ${:04X})",
                        lowest, score
                    )?;
                }
                if !occupants.is_empty() {
                    write!(f, "; occupants: ")?;
                    for (i, (name, score)) in occupants.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} (${:04X})", name, score)?;
                    }
                }
                Ok(())
            }
            AllocError::ReservedAddressConflict { variable, address, range } => {
                write!(
                    f,
                    "fixed address ${:04X} for '{}' collides with reserved {}",
                    address, variable, range
                )
            }
            AllocError::InterruptUnsafeSharing { first, second } => {
                write!(
                    f,
                    "internal error: '{}' and '{}' share storage but can be live concurrently",
                    first, second
                )
            }
            AllocError::FrameOverflow { name, bytes, available } => {
                write!(
                    f,
                    "frame overflow: '{}' needs {} byte(s) but only {} are available",
                    name, bytes, available
                )
            }
            AllocError::TooManyInterruptEntries { count, limit } => {
                write!(
                    f,
                    "{} interrupt entry points declared, at most {} are supported",
                    count, limit
                )
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// Non-fatal diagnostics; surfaced to the user, never block compilation.
#[derive(Debug, Clone)]
pub enum AllocWarning {
    /// An unrequired variable moved from the preferred zero page to RAM.
    ZeroPageFallback {
        variable: String,
    },
}

impl std::fmt::Display for AllocWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocWarning::ZeroPageFallback { variable } => {
                write!(f, "zero page full: '{}' placed in RAM instead", variable)
            }
        }
    }
}

/// Run the whole pipeline on one compilation unit.
///
/// Everything is computed fresh from the inputs; no state survives the
/// call. Identical inputs produce byte-identical layouts.
pub fn allocate(
    table: &FunctionTable,
    platform: &PlatformConfig,
    strategy: CoalesceStrategy,
) -> Result<ProgramLayout, Vec<AllocError>> {
    let interrupt_entries = table
        .iter()
        .filter(|(_, f)| matches!(f.entry, Some(EntryKind::Irq | EntryKind::Nmi)))
        .count();
    if interrupt_entries > interrupt::MAX_INTERRUPT_ENTRIES {
        return Err(vec![AllocError::TooManyInterruptEntries {
            count: interrupt_entries,
            limit: interrupt::MAX_INTERRUPT_ENTRIES,
        }]);
    }

    let graph = CallGraph::build(table);

    // Unmarked recursion leaves activity sets undefined, so these
    // errors block everything downstream.
    let rec = recursion::analyze(table, &graph)?;

    let threads = interrupt::propagate(table, &graph);
    let act = activity::build(table, &graph, &rec);
    let classes = coalesce::coalesce(table, &act, &threads, &rec, strategy);

    let mut errors = coalesce::audit(&classes, table, &act, &threads);

    match zero_page::allocate(table, &rec, platform) {
        Ok(zp) if errors.is_empty() => {
            let conventions = convention::select(table, &rec);
            layout::emit(table, platform, &rec, &classes, &zp, &conventions)
        }
        Ok(_) => Err(errors),
        Err(zp_errors) => {
            errors.extend(zp_errors);
            Err(errors)
        }
    }
}
