//! Plan pruning: select the minimal subplan for a call signature
//!
//! Given the provided inputs, the requested outputs, and an optional
//! colour filter, pruning projects the compiled plan down to the steps
//! that are actually needed. Results are memoised per call signature;
//! the memo also keeps concurrent `compute` calls from traversing the
//! graph structure at the same time.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use weave_core::{EngineError, EngineResult, ValueMap};

use crate::graph::{GraphNode, NodeKey};
use crate::network::{Network, Outputs, Step};

/// Memo key: sorted input names, canonical outputs, colour.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PruneKey {
    inputs: Vec<String>,
    /// `None` means all outputs were requested
    outputs: Option<Vec<String>>,
    color: Option<String>,
}

impl PruneKey {
    fn new(outputs: &Outputs, inputs: &ValueMap, color: Option<&str>) -> Self {
        let mut input_names: Vec<String> = inputs.keys().cloned().collect();
        input_names.sort();
        let outputs = match outputs {
            Outputs::All => None,
            Outputs::Named(names) => {
                let mut canonical = names.clone();
                canonical.sort();
                Some(canonical)
            }
        };
        Self {
            inputs: input_names,
            outputs,
            color: color.map(str::to_string),
        }
    }
}

impl Network {
    /// The subset of the compiled plan needed for this call signature.
    pub(crate) fn find_necessary_steps(
        &self,
        outputs: &Outputs,
        inputs: &ValueMap,
        color: Option<&str>,
    ) -> EngineResult<Arc<Vec<Step>>> {
        let key = PruneKey::new(outputs, inputs, color);
        if let Some(plan) = self.lock_prune_cache().get(&key) {
            debug!(network = self.name(), "prune cache hit");
            return Ok(plan.clone());
        }

        let necessary = self.necessary_nodes(outputs, inputs)?;
        let plan: Vec<Step> = self
            .steps
            .iter()
            .filter(|step| retained(step, &necessary, color))
            .cloned()
            .collect();
        debug!(
            network = self.name(),
            retained = plan.len(),
            total = self.steps.len(),
            "pruned plan"
        );

        let plan = Arc::new(plan);
        self.lock_prune_cache().insert(key, plan.clone());
        Ok(plan)
    }

    /// Reachability-based selection of graph nodes.
    fn necessary_nodes(&self, outputs: &Outputs, inputs: &ValueMap) -> EngineResult<HashSet<NodeKey>> {
        let graph = self.graph();
        match outputs {
            // All outputs requested: everything reachable from a provided
            // input, plus any wrapper whose inner graph contains one (so an
            // embedded graph can be re-entered with an externally supplied
            // value).
            Outputs::All => {
                let mut necessary = HashSet::new();
                for name in inputs.keys() {
                    if graph.has_data(name) {
                        necessary.extend(graph.descendants(&NodeKey::Data(name.clone())));
                    }
                    for (key, node) in graph.nodes_in_order() {
                        let inner = match node {
                            GraphNode::Control(ctrl) => Some(ctrl.net().graph()),
                            GraphNode::Subnet(net) => Some(net.graph()),
                            _ => None,
                        };
                        if inner.is_some_and(|g| g.has_data(name)) {
                            necessary.insert(key.clone());
                        }
                    }
                }
                Ok(necessary)
            }

            // Specific outputs: ancestors of the requested outputs, minus
            // anything already satisfied by an input deeper in the graph.
            Outputs::Named(names) => {
                let mut unnecessary = HashSet::new();
                for name in inputs.keys() {
                    if graph.has_data(name) {
                        unnecessary.extend(graph.ancestors(&NodeKey::Data(name.clone())));
                    }
                }

                let mut necessary = HashSet::new();
                for name in names {
                    if !graph.has_data(name) {
                        return Err(EngineError::UnknownOutput(name.clone()));
                    }
                    necessary.extend(graph.ancestors(&NodeKey::Data(name.clone())));
                }

                necessary.retain(|key| !unnecessary.contains(key));
                Ok(necessary)
            }
        }
    }
}

/// Plan projection: does this step survive for the given selection?
fn retained(step: &Step, necessary: &HashSet<NodeKey>, color: Option<&str>) -> bool {
    match step {
        Step::Operation(op) => {
            necessary.contains(&NodeKey::Step(op.name().to_string()))
                && color_matches(op.color(), color)
        }
        // Colour never applies to control nodes or embedded networks.
        Step::Control(ctrl) => necessary.contains(&NodeKey::Step(ctrl.name().to_string())),
        Step::Subnet(net) => necessary.contains(&NodeKey::Step(net.name().to_string())),
        Step::Delete(name) => necessary.contains(&NodeKey::Data(name.clone())),
    }
}

/// An uncoloured operation is always included; a coloured one runs only
/// under an equal filter.
fn color_matches(op_color: Option<&str>, filter: Option<&str>) -> bool {
    match (filter, op_color) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(wanted), Some(tagged)) => wanted == tagged,
    }
}
