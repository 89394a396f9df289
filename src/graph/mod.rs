//! Call Graph
//!
//! Dense adjacency lists over the function table. Indirect call sites
//! have no points-to information at this stage, so they fan out to every
//! function with a matching signature and the edges are flagged
//! unresolved.

pub mod interrupt;
pub mod recursion;

use rustc_hash::FxHashSet as HashSet;

use crate::table::{CallSite, FunctionId, FunctionTable};

/// One call edge. `resolved` is false for edges synthesized from
/// indirect call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge {
    pub caller: FunctionId,
    pub callee: FunctionId,
    pub resolved: bool,
}

/// Whole-program call graph with both edge directions materialized.
#[derive(Debug)]
pub struct CallGraph {
    callees: Vec<Vec<FunctionId>>,
    callers: Vec<Vec<FunctionId>>,
    edges: Vec<CallEdge>,
}

impl CallGraph {
    /// Build the graph from all call sites in the table.
    pub fn build(table: &FunctionTable) -> Self {
        let n = table.len();
        let mut callees: Vec<Vec<FunctionId>> = vec![Vec::new(); n];
        let mut callers: Vec<Vec<FunctionId>> = vec![Vec::new(); n];
        let mut edges = Vec::new();
        let mut seen: HashSet<(FunctionId, FunctionId)> = HashSet::default();

        for (caller, function) in table.iter() {
            for site in &function.call_sites {
                match site {
                    CallSite::Direct(callee) => {
                        push_edge(
                            &mut callees, &mut callers, &mut edges, &mut seen,
                            CallEdge { caller, callee: *callee, resolved: true },
                        );
                    }
                    CallSite::Indirect(signature) => {
                        // Conservative fan-out: any function with this
                        // signature may be the target.
                        for (callee, candidate) in table.iter() {
                            if candidate.signature == *signature {
                                push_edge(
                                    &mut callees, &mut callers, &mut edges, &mut seen,
                                    CallEdge { caller, callee, resolved: false },
                                );
                            }
                        }
                    }
                }
            }
        }

        Self { callees, callers, edges }
    }

    pub fn callees(&self, id: FunctionId) -> &[FunctionId] {
        &self.callees[id.index()]
    }

    pub fn callers(&self, id: FunctionId) -> &[FunctionId] {
        &self.callers[id.index()]
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.callees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callees.is_empty()
    }
}

fn push_edge(
    callees: &mut [Vec<FunctionId>],
    callers: &mut [Vec<FunctionId>],
    edges: &mut Vec<CallEdge>,
    seen: &mut HashSet<(FunctionId, FunctionId)>,
    edge: CallEdge,
) {
    // A direct and an indirect site to the same callee collapse to one
    // adjacency entry; the first edge wins in the edge list.
    if seen.insert((edge.caller, edge.callee)) {
        callees[edge.caller.index()].push(edge.callee);
        callers[edge.callee.index()].push(edge.caller);
        edges.push(edge);
    }
}
