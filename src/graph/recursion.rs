//! Recursion Detection
//!
//! Finds call cycles (including self-calls and mutual recursion through
//! indirect edges) and validates that every function on a cycle carries
//! the explicit recursive opt-in. Functions on a cycle must use the
//! stack-frame calling convention; everything else keeps static frames.

use crate::alloc::AllocError;
use crate::graph::CallGraph;
use crate::table::{FunctionId, FunctionTable};

/// Result of the recursion pass: which functions sit on a call cycle.
#[derive(Debug)]
pub struct RecursionInfo {
    recursive: Vec<bool>,
}

impl RecursionInfo {
    pub fn is_recursive(&self, id: FunctionId) -> bool {
        self.recursive[id.index()]
    }

    /// Ids of all recursive functions, ascending.
    pub fn recursive_ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.recursive
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r)
            .map(|(i, _)| FunctionId(i as u32))
    }
}

/// Detect cycles and validate opt-ins. All unmarked cycles are reported
/// together, one error per strongly connected component, each carrying a
/// concrete closed call chain.
pub fn analyze(
    table: &FunctionTable,
    graph: &CallGraph,
) -> Result<RecursionInfo, Vec<AllocError>> {
    let mut recursive = vec![false; table.len()];
    let mut errors = Vec::new();

    for component in strongly_connected_components(graph) {
        let self_loop = component.len() == 1
            && graph.callees(component[0]).contains(&component[0]);
        if component.len() < 2 && !self_loop {
            continue;
        }

        for &id in &component {
            recursive[id.index()] = true;
        }

        let unmarked: Vec<String> = component
            .iter()
            .filter(|&&id| !table.get(id).declared_recursive)
            .map(|&id| table.get(id).name.clone())
            .collect();

        if !unmarked.is_empty() {
            let chain = cycle_chain(graph, &component)
                .into_iter()
                .map(|id| table.get(id).name.clone())
                .collect();
            errors.push(AllocError::UnmarkedRecursion { chain, unmarked });
        }
    }

    if errors.is_empty() {
        Ok(RecursionInfo { recursive })
    } else {
        Err(errors)
    }
}

/// Iterative Tarjan. Components come out sorted by smallest member so
/// diagnostics are deterministic.
fn strongly_connected_components(graph: &CallGraph) -> Vec<Vec<FunctionId>> {
    let n = graph.len();
    let mut index: Vec<Option<u32>> = vec![None; n];
    let mut lowlink: Vec<u32> = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0u32;
    let mut components = Vec::new();

    // Explicit DFS frames: (node, next callee position).
    let mut frames: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }
        frames.push((root, 0));
        index[root] = Some(next_index);
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&mut (node, ref mut pos)) = frames.last_mut() {
            let callees = graph.callees(FunctionId(node as u32));
            if *pos < callees.len() {
                let next = callees[*pos].index();
                *pos += 1;
                match index[next] {
                    None => {
                        index[next] = Some(next_index);
                        lowlink[next] = next_index;
                        next_index += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        frames.push((next, 0));
                    }
                    Some(next_idx) => {
                        if on_stack[next] {
                            lowlink[node] = lowlink[node].min(next_idx);
                        }
                    }
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }
                if Some(lowlink[node]) == index[node] {
                    let mut component = Vec::new();
                    loop {
                        let member = stack.pop().expect("scc stack underflow");
                        on_stack[member] = false;
                        component.push(FunctionId(member as u32));
                        if member == node {
                            break;
                        }
                    }
                    component.sort();
                    components.push(component);
                }
            }
        }
    }

    components.sort_by_key(|c| c[0]);
    components
}

/// Walk one concrete cycle through a strongly connected component,
/// returned closed: `[a, b, c, a]`. A self-loop yields `[a, a]`.
fn cycle_chain(graph: &CallGraph, component: &[FunctionId]) -> Vec<FunctionId> {
    let start = component[0];
    let in_component = |id: FunctionId| component.contains(&id);

    let mut path = vec![start];
    let mut positions = vec![0usize];
    let mut visited = vec![start];

    while let Some(&node) = path.last() {
        let pos = positions.last_mut().expect("path/position mismatch");
        let callees = graph.callees(node);
        if *pos < callees.len() {
            let next = callees[*pos];
            *pos += 1;
            if next == start {
                path.push(start);
                return path;
            }
            if in_component(next) && !visited.contains(&next) {
                visited.push(next);
                path.push(next);
                positions.push(0);
            }
        } else {
            path.pop();
            positions.pop();
        }
    }

    // Strong connectivity guarantees the walk above closes the cycle.
    unreachable!("no cycle found in strongly connected component")
}
