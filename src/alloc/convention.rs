//! Calling Conventions
//!
//! Static functions pass their first scalar parameter in registers (one
//! byte in A, a word in A/X) and everything else through statically
//! addressed slots; there is no prologue and no stack traffic. Recursive
//! functions must be reentrant, so all of their parameters and returns
//! go through the software stack instead.

use crate::graph::recursion::RecursionInfo;
use crate::table::{CallingConvention, FunctionId, FunctionTable};

/// Where one parameter travels on a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamPlacement {
    /// Single byte in the accumulator.
    Accumulator,
    /// Word in accumulator (low) and X index register (high).
    AccumulatorIndex,
    /// Statically addressed slot in the callee's frame.
    StaticSlot,
    /// Pushed through the software stack.
    StackFrame,
}

/// Where the return value travels. Mirrors [`ParamPlacement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPlacement {
    None,
    Accumulator,
    AccumulatorIndex,
    StaticSlot,
    StackFrame,
}

/// Per-function convention and placement plan.
#[derive(Debug, Clone)]
pub struct ConventionPlan {
    pub convention: CallingConvention,
    /// One entry per parameter, in declaration order.
    pub params: Vec<ParamPlacement>,
    pub returns: ReturnPlacement,
}

/// Plans for every function, indexed by function id.
#[derive(Debug)]
pub struct ConventionInfo {
    plans: Vec<ConventionPlan>,
}

impl ConventionInfo {
    pub fn plan(&self, id: FunctionId) -> &ConventionPlan {
        &self.plans[id.index()]
    }
}

pub fn select(table: &FunctionTable, recursion: &RecursionInfo) -> ConventionInfo {
    let plans = table
        .iter()
        .map(|(id, function)| {
            if recursion.is_recursive(id) {
                // Reentrancy would corrupt a register or static slot
                // handoff mid-flight.
                let params = function
                    .parameters(id)
                    .map(|_| ParamPlacement::StackFrame)
                    .collect();
                let returns = if function.signature.returns == 0 {
                    ReturnPlacement::None
                } else {
                    ReturnPlacement::StackFrame
                };
                ConventionPlan {
                    convention: CallingConvention::StackFrame,
                    params,
                    returns,
                }
            } else {
                let mut register_given = false;
                let params = function
                    .parameters(id)
                    .map(|(_, variable)| {
                        if !register_given && variable.size == 1 {
                            register_given = true;
                            ParamPlacement::Accumulator
                        } else if !register_given && variable.size == 2 {
                            register_given = true;
                            ParamPlacement::AccumulatorIndex
                        } else {
                            ParamPlacement::StaticSlot
                        }
                    })
                    .collect();
                let returns = match function.signature.returns {
                    0 => ReturnPlacement::None,
                    1 => ReturnPlacement::Accumulator,
                    2 => ReturnPlacement::AccumulatorIndex,
                    _ => ReturnPlacement::StaticSlot,
                };
                ConventionPlan {
                    convention: CallingConvention::Static,
                    params,
                    returns,
                }
            }
        })
        .collect();

    ConventionInfo { plans }
}
