//! Base-first ordering of identities and typedefs.

use std::collections::VecDeque;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use crate::schema::NodeId;

/// Order `nodes` so that every node comes after its base.
///
/// `base_of` returns a node's base when that base is itself in `nodes`;
/// bases outside the set (external, already resolved) impose no ordering.
/// Ties are broken by the position in `nodes`, so the result is stable.
///
/// On failure returns one cycle, starting and ending with the same node.
pub fn topological_order(
    nodes: &[NodeId],
    base_of: impl Fn(NodeId) -> Option<NodeId>,
) -> Result<Vec<NodeId>, Vec<NodeId>> {
    let members: IndexSet<NodeId> = nodes.iter().copied().collect();
    let mut pending: FxHashMap<NodeId, usize> = FxHashMap::default();
    let mut dependents: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();

    for &node in &members {
        match base_of(node).filter(|b| members.contains(b)) {
            Some(base) => {
                pending.insert(node, 1);
                dependents.entry(base).or_default().push(node);
            }
            None => {
                pending.insert(node, 0);
            }
        }
    }

    let mut ready: VecDeque<NodeId> = members
        .iter()
        .copied()
        .filter(|n| pending[n] == 0)
        .collect();
    let mut order = Vec::with_capacity(members.len());

    while let Some(node) = ready.pop_front() {
        order.push(node);
        for &dependent in dependents.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(count) = pending.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push_back(dependent);
                }
            }
        }
    }

    if order.len() == members.len() {
        return Ok(order);
    }

    // Every unplaced node still waits on an unplaced base, so walking base
    // links from any of them must revisit a node.
    let placed: IndexSet<NodeId> = order.into_iter().collect();
    let start = members
        .iter()
        .copied()
        .find(|n| !placed.contains(n))
        .unwrap_or(nodes[0]);
    let mut seen = IndexSet::new();
    let mut current = start;
    while seen.insert(current) {
        match base_of(current) {
            Some(base) => current = base,
            None => break,
        }
    }
    let from = seen.get_index_of(&current).unwrap_or(0);
    let mut cycle: Vec<NodeId> = seen.into_iter().skip(from).collect();
    cycle.push(current);
    Err(cycle)
}
