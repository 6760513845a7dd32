//! Composition: assembling operations and networks into a new network
//!
//! [`compose`] collects operations, control nodes, and pre-built networks
//! and produces a compiled [`Network`]. By default a network operand is
//! embedded as a single opaque sub-network node; with `.merge(true)` its
//! step nodes are dissolved into the parent graph, and when two steps
//! share a name the later operand wins.

use std::collections::HashMap;
use std::sync::Arc;

use weave_core::{EngineResult, Operation};

use crate::control::ControlNode;
use crate::graph::GraphNode;
use crate::network::Network;

/// Start composing a network with the given name.
pub fn compose(name: impl Into<String>) -> Composer {
    Composer {
        name: name.into(),
        merge: false,
        operands: Vec::new(),
    }
}

enum Operand {
    Op(Arc<Operation>),
    Control(Arc<ControlNode>),
    Net(Arc<Network>),
}

impl Operand {
    fn name(&self) -> &str {
        match self {
            Operand::Op(op) => op.name(),
            Operand::Control(ctrl) => ctrl.name(),
            Operand::Net(net) => net.name(),
        }
    }
}

/// Builder collecting the pieces of a composition.
pub struct Composer {
    name: String,
    merge: bool,
    operands: Vec<Operand>,
}

impl Composer {
    /// Deep-merge network operands instead of embedding them as nodes.
    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// Add an operation.
    pub fn op(mut self, op: Operation) -> Self {
        self.operands.push(Operand::Op(Arc::new(op)));
        self
    }

    /// Add a control node.
    pub fn control(mut self, ctrl: ControlNode) -> Self {
        self.operands.push(Operand::Control(Arc::new(ctrl)));
        self
    }

    /// Add a pre-built network.
    pub fn network(mut self, net: Network) -> Self {
        self.operands.push(Operand::Net(Arc::new(net)));
        self
    }

    /// Assemble and compile the composed network.
    pub fn build(self) -> EngineResult<Network> {
        let Composer { name, merge, operands } = self;

        // Deep merge dissolves network operands one level: their step nodes
        // join the parent in insertion order.
        let mut expanded: Vec<Operand> = Vec::new();
        for operand in operands {
            match operand {
                Operand::Net(net) if merge => {
                    for (_, node) in net.graph().nodes_in_order() {
                        match node {
                            GraphNode::Operation(op) => expanded.push(Operand::Op(op.clone())),
                            GraphNode::Control(ctrl) => {
                                expanded.push(Operand::Control(ctrl.clone()))
                            }
                            GraphNode::Subnet(inner) => expanded.push(Operand::Net(inner.clone())),
                            GraphNode::Data(_) => {}
                        }
                    }
                }
                other => expanded.push(other),
            }
        }

        // Later-wins name resolution: the earlier step is dropped before
        // the winner is installed.
        if merge {
            let mut kept: Vec<Option<Operand>> = Vec::with_capacity(expanded.len());
            let mut by_name: HashMap<String, usize> = HashMap::new();
            for operand in expanded {
                if let Some(&earlier) = by_name.get(operand.name()) {
                    kept[earlier] = None;
                }
                by_name.insert(operand.name().to_string(), kept.len());
                kept.push(Some(operand));
            }
            expanded = kept.into_iter().flatten().collect();
        }

        let mut net = Network::new(name);
        for operand in expanded {
            match operand {
                Operand::Op(op) => net.add_op_arc(op)?,
                Operand::Control(ctrl) => net.add_control_arc(ctrl)?,
                Operand::Net(inner) => net.add_subnet_arc(inner)?,
            }
        }
        net.compile()?;
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKey;
    use crate::network::Step;
    use weave_core::{Value, ValueMap};

    fn scale_op(name: &str, factor: i64) -> Operation {
        Operation::builder(name)
            .needs(["x"])
            .provides(["y"])
            .body(move |inputs: &ValueMap, _| {
                let x = inputs["x"].as_int().ok_or("expected int")?;
                Ok(ValueMap::from([("y".to_string(), Value::Int(x * factor))]))
            })
            .build()
            .unwrap()
    }

    fn inputs<const N: usize>(pairs: [(&str, i64); N]) -> ValueMap {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::Int(v)))
            .collect()
    }

    #[test]
    fn test_compose_compiles() {
        let net = compose("scaled").op(scale_op("double", 2)).build().unwrap();
        assert!(net.is_compiled());
        let results = net.run(inputs([("x", 4)])).unwrap();
        assert_eq!(results["y"], Value::Int(8));
    }

    #[test]
    fn test_shallow_merge_embeds_subnet_node() {
        let inner = compose("inner").op(scale_op("double", 2)).build().unwrap();
        let outer = compose("outer").network(inner).build().unwrap();

        assert!(matches!(
            outer.graph().node(&NodeKey::Step("inner".to_string())),
            Some(GraphNode::Subnet(_))
        ));
        let results = outer.run(inputs([("x", 4)])).unwrap();
        assert_eq!(results["y"], Value::Int(8));
    }

    #[test]
    fn test_deep_merge_dissolves_subnets() {
        let inner = compose("inner").op(scale_op("double", 2)).build().unwrap();
        let merged = compose("merged").merge(true).network(inner).build().unwrap();

        assert!(matches!(
            merged.graph().node(&NodeKey::Step("double".to_string())),
            Some(GraphNode::Operation(_))
        ));
        assert!(merged.graph().node(&NodeKey::Step("inner".to_string())).is_none());
    }

    #[test]
    fn test_deep_merge_later_operation_wins() {
        let first = compose("first").op(scale_op("double", 2)).build().unwrap();
        let second = compose("second").op(scale_op("double", 3)).build().unwrap();
        let merged = compose("merged")
            .merge(true)
            .network(first)
            .network(second)
            .build()
            .unwrap();

        // The plan references the name exactly once, and the later body runs.
        let doubles = merged
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Operation(_)) && s.name() == "double")
            .count();
        assert_eq!(doubles, 1);

        let results = merged.run(inputs([("x", 2)])).unwrap();
        assert_eq!(results["y"], Value::Int(6));
    }

    #[test]
    fn test_duplicate_names_rejected_without_merge() {
        let result = compose("clash")
            .op(scale_op("double", 2))
            .op(scale_op("double", 3))
            .build();
        assert!(result.is_err());
    }
}
