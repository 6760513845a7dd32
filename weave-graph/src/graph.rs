//! The directed graph underlying a network
//!
//! Nodes are either data names or steps (operations, control nodes,
//! embedded sub-networks), modelled as a tagged variant rather than trait
//! objects. Edges run from a step's needs to the step and from the step to
//! its provides; control nodes additionally receive edges from their
//! condition needs so guards participate in topological ordering.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use weave_core::{DataPort, EngineError, EngineResult, Operation, ValueType};

use crate::control::ControlNode;
use crate::network::Network;

/// Key of a graph node. Data names and step names live in separate
/// namespaces, mirroring how values and layers may share a label.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// A named value channel
    Data(String),
    /// An operation, control node, or sub-network
    Step(String),
}

impl NodeKey {
    /// The node's display name
    pub fn name(&self) -> &str {
        match self {
            NodeKey::Data(name) | NodeKey::Step(name) => name,
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Recorded attributes of a data node
#[derive(Clone, Debug, Default)]
pub struct DataInfo {
    /// Declared type; fixed by the first port that constrains this name
    pub ty: Option<ValueType>,
}

/// Payload of a graph node
pub enum GraphNode {
    Data(DataInfo),
    Operation(Arc<Operation>),
    Control(Arc<ControlNode>),
    Subnet(Arc<Network>),
}

/// Directed acyclic graph of data names and steps.
///
/// Mutation happens only through the `insert_*` methods; the compiler and
/// pruner read the structure through the traversal accessors.
pub struct Graph {
    nodes: HashMap<NodeKey, GraphNode>,
    /// Node creation order; the stable tiebreak for the compiler
    order: Vec<NodeKey>,
    succ: HashMap<NodeKey, Vec<NodeKey>>,
    pred: HashMap<NodeKey, Vec<NodeKey>>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            succ: HashMap::new(),
            pred: HashMap::new(),
        }
    }

    // =========================================================================
    // Builder
    // =========================================================================

    /// Insert an operation and wire its needs and provides by name.
    pub fn insert_operation(&mut self, op: Arc<Operation>) -> EngineResult<()> {
        let key = self.claim_step(op.name())?;
        for port in op.needs() {
            self.ensure_data(&port.name, port.ty)?;
            self.add_edge(NodeKey::Data(port.name.clone()), key.clone());
        }
        for port in op.provides() {
            self.ensure_data(&port.name, port.ty)?;
            self.add_edge(key.clone(), NodeKey::Data(port.name.clone()));
        }
        self.install_step(key, GraphNode::Operation(op));
        Ok(())
    }

    /// Insert a control node; its condition needs participate in ordering.
    pub fn insert_control(&mut self, ctrl: Arc<ControlNode>) -> EngineResult<()> {
        let key = self.claim_step(ctrl.name())?;
        if let Some(guard) = ctrl.guard() {
            for name in guard.needs() {
                self.ensure_data(name, None)?;
                self.add_edge(NodeKey::Data(name.clone()), key.clone());
            }
        }
        self.install_step(key, GraphNode::Control(ctrl));
        Ok(())
    }

    /// Insert a sub-network as a single opaque node, wired through the data
    /// names it externally references.
    pub fn insert_subnet(&mut self, net: Arc<Network>) -> EngineResult<()> {
        let key = self.claim_step(net.name())?;
        for port in net.needs() {
            self.ensure_data(&port.name, port.ty)?;
            self.add_edge(NodeKey::Data(port.name.clone()), key.clone());
        }
        for port in net.provides() {
            self.ensure_data(&port.name, port.ty)?;
            self.add_edge(key.clone(), NodeKey::Data(port.name.clone()));
        }
        self.install_step(key, GraphNode::Subnet(net));
        Ok(())
    }

    /// Check a step name is free, rejecting duplicates.
    fn claim_step(&self, name: &str) -> EngineResult<NodeKey> {
        let key = NodeKey::Step(name.to_string());
        if self.nodes.contains_key(&key) {
            return Err(EngineError::invalid_operation(format!(
                "operation '{name}' may only be added once"
            )));
        }
        Ok(key)
    }

    fn install_step(&mut self, key: NodeKey, node: GraphNode) {
        self.order.push(key.clone());
        self.nodes.insert(key, node);
    }

    /// Create or revisit a data node, enforcing per-name type consistency.
    ///
    /// An unconstrained port never conflicts; the first constrained
    /// declaration fixes the type and later declarations must agree.
    fn ensure_data(&mut self, name: &str, ty: Option<ValueType>) -> EngineResult<()> {
        let key = NodeKey::Data(name.to_string());
        match self.nodes.get_mut(&key) {
            None => {
                self.nodes.insert(key.clone(), GraphNode::Data(DataInfo { ty }));
                self.order.push(key);
            }
            Some(GraphNode::Data(info)) => match (info.ty, ty) {
                (Some(expected), Some(got)) if expected != got => {
                    return Err(EngineError::type_conflict(name, expected, got));
                }
                (None, Some(got)) => info.ty = Some(got),
                _ => {}
            },
            Some(_) => {
                return Err(EngineError::internal(format!(
                    "node key collision on data '{name}'"
                )));
            }
        }
        Ok(())
    }

    fn add_edge(&mut self, from: NodeKey, to: NodeKey) {
        let out = self.succ.entry(from.clone()).or_default();
        if !out.contains(&to) {
            out.push(to.clone());
        }
        let inc = self.pred.entry(to).or_default();
        if !inc.contains(&from) {
            inc.push(from);
        }
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    pub fn has_data(&self, name: &str) -> bool {
        self.nodes.contains_key(&NodeKey::Data(name.to_string()))
    }

    /// Declared type of a data node, if constrained
    pub fn data_type(&self, name: &str) -> Option<ValueType> {
        match self.nodes.get(&NodeKey::Data(name.to_string())) {
            Some(GraphNode::Data(info)) => info.ty,
            _ => None,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in creation order
    pub fn nodes_in_order(&self) -> impl Iterator<Item = (&NodeKey, &GraphNode)> {
        self.order
            .iter()
            .filter_map(|key| self.nodes.get(key).map(|node| (key, node)))
    }

    pub fn successors(&self, key: &NodeKey) -> &[NodeKey] {
        self.succ.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, key: &NodeKey) -> &[NodeKey] {
        self.pred.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All nodes reachable from `start`, excluding `start` itself
    pub fn descendants(&self, start: &NodeKey) -> HashSet<NodeKey> {
        self.reach(start, |graph, key| graph.successors(key))
    }

    /// All nodes from which `start` is reachable, excluding `start` itself
    pub fn ancestors(&self, start: &NodeKey) -> HashSet<NodeKey> {
        self.reach(start, |graph, key| graph.predecessors(key))
    }

    fn reach<'a>(
        &'a self,
        start: &NodeKey,
        next: impl Fn(&'a Graph, &NodeKey) -> &'a [NodeKey],
    ) -> HashSet<NodeKey> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&NodeKey> = next(self, start).iter().collect();
        while let Some(key) = stack.pop() {
            if seen.insert(key.clone()) {
                stack.extend(next(self, key).iter());
            }
        }
        seen
    }

    /// Data nodes with no producing step, in creation order. These are the
    /// names a sub-network exposes as inputs when embedded in a parent.
    pub fn unproduced_data(&self) -> Vec<DataPort> {
        self.data_ports(|graph, key| {
            !graph
                .predecessors(key)
                .iter()
                .any(|p| matches!(p, NodeKey::Step(_)))
        })
    }

    /// Data nodes with at least one producing step, in creation order.
    pub fn produced_data(&self) -> Vec<DataPort> {
        self.data_ports(|graph, key| {
            graph
                .predecessors(key)
                .iter()
                .any(|p| matches!(p, NodeKey::Step(_)))
        })
    }

    fn data_ports(&self, keep: impl Fn(&Graph, &NodeKey) -> bool) -> Vec<DataPort> {
        self.nodes_in_order()
            .filter_map(|(key, node)| match node {
                GraphNode::Data(info) if keep(self, key) => {
                    let mut port = DataPort::new(key.name());
                    port.ty = info.ty;
                    Some(port)
                }
                _ => None,
            })
            .collect()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
