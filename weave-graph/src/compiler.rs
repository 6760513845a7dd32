//! Plan compilation: topological ordering and memory-release analysis
//!
//! Compilation linearises a network's graph into a sequence of [`Step`]s.
//! The ordering is a lexicographical topological sort: Kahn's algorithm
//! with a priority queue keyed by `(sort key, insertion index)`. Data
//! nodes sort first among ready nodes so values surface immediately before
//! their consumers; sibling control nodes sort by their chain position so
//! guards evaluate in source order.
//!
//! After each operation the compiler emits a [`Step::Delete`] for every
//! predecessor value that no later operation in the order consumes, so the
//! evaluator can release intermediates as early as possible. Condition
//! needs of control nodes are read through the cache at run time and do
//! not extend a value's lifetime.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::debug;

use weave_core::{EngineError, EngineResult};

use crate::graph::{Graph, GraphNode, NodeKey};
use crate::network::{Network, Step};

impl Network {
    /// Compile the graph into a linear plan. Idempotent until the next
    /// mutation; rebuilding clears the memoised prune results.
    pub fn compile(&mut self) -> EngineResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let ordered = lexical_topological_order(self.graph())?;
        self.steps = emit_steps(self.graph(), &ordered);
        self.dirty = false;
        self.lock_prune_cache().clear();

        debug!(network = self.name(), steps = self.steps.len(), "compiled plan");
        Ok(())
    }
}

/// Priority key for the ready queue: data first, then operations and
/// sub-networks, then control nodes in chain order.
fn sort_key(node: &GraphNode) -> i64 {
    match node {
        GraphNode::Data(_) => i64::MIN,
        GraphNode::Operation(_) | GraphNode::Subnet(_) => 0,
        GraphNode::Control(ctrl) => ctrl.order() as i64,
    }
}

/// Kahn's algorithm with a stable `(sort key, insertion index)` queue.
///
/// The key is total, so the sort itself cannot fail on a DAG; the only
/// failure mode is a cycle, which is reported with the unresolved nodes.
fn lexical_topological_order(graph: &Graph) -> EngineResult<Vec<NodeKey>> {
    let keys: Vec<&NodeKey> = graph.nodes_in_order().map(|(key, _)| key).collect();
    let index: HashMap<&NodeKey, usize> =
        keys.iter().enumerate().map(|(i, key)| (*key, i)).collect();

    let mut indegree: Vec<usize> = keys.iter().map(|key| graph.predecessors(key).len()).collect();
    let mut ready: BinaryHeap<Reverse<(i64, usize)>> = BinaryHeap::new();

    for (i, key) in keys.iter().enumerate() {
        if indegree[i] == 0 {
            if let Some(node) = graph.node(key) {
                ready.push(Reverse((sort_key(node), i)));
            }
        }
    }

    let mut ordered = Vec::with_capacity(keys.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        let key = keys[i];
        ordered.push(key.clone());
        for succ in graph.successors(key) {
            let j = index[succ];
            indegree[j] -= 1;
            if indegree[j] == 0 {
                if let Some(node) = graph.node(succ) {
                    ready.push(Reverse((sort_key(node), j)));
                }
            }
        }
    }

    if ordered.len() != keys.len() {
        let placed: HashSet<&NodeKey> = ordered.iter().collect();
        let stuck: Vec<String> = keys
            .iter()
            .filter(|key| !placed.contains(**key))
            .map(|key| key.name().to_string())
            .collect();
        return Err(EngineError::GraphCycle { nodes: stuck });
    }

    Ok(ordered)
}

/// Walk the ordered nodes and emit execution and release steps.
fn emit_steps(graph: &Graph, ordered: &[NodeKey]) -> Vec<Step> {
    // Needs of each operation/sub-network position, for the last-use scan.
    let consumer_needs: Vec<Option<HashSet<String>>> = ordered
        .iter()
        .map(|key| match graph.node(key) {
            Some(GraphNode::Operation(op)) => {
                Some(op.needs().iter().map(|p| p.name.clone()).collect())
            }
            Some(GraphNode::Subnet(net)) => {
                Some(net.needs().into_iter().map(|p| p.name).collect())
            }
            _ => None,
        })
        .collect();

    let mut steps = Vec::new();
    for (i, key) in ordered.iter().enumerate() {
        match graph.node(key) {
            None | Some(GraphNode::Data(_)) => {}
            Some(GraphNode::Control(ctrl)) => steps.push(Step::Control(ctrl.clone())),
            Some(GraphNode::Operation(op)) => {
                steps.push(Step::Operation(op.clone()));
                emit_deletes(graph, ordered, &consumer_needs, i, key, &mut steps);
            }
            Some(GraphNode::Subnet(net)) => {
                steps.push(Step::Subnet(net.clone()));
                emit_deletes(graph, ordered, &consumer_needs, i, key, &mut steps);
            }
        }
    }
    steps
}

/// Release each predecessor value of `ordered[i]` that no later consumer
/// in the order still needs.
fn emit_deletes(
    graph: &Graph,
    ordered: &[NodeKey],
    consumer_needs: &[Option<HashSet<String>>],
    i: usize,
    key: &NodeKey,
    steps: &mut Vec<Step>,
) {
    for pred in graph.predecessors(key) {
        let NodeKey::Data(name) = pred else { continue };
        let still_needed = (i + 1..ordered.len())
            .any(|j| consumer_needs[j].as_ref().is_some_and(|needs| needs.contains(name)));
        if !still_needed {
            steps.push(Step::Delete(name.clone()));
        }
    }
}
