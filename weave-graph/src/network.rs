//! Networks: composed graphs with a compiled plan and an evaluator
//!
//! A [`Network`] owns a [`Graph`], the linear plan the compiler produced
//! from it, a memo cache for pruned plans, and the timings of the last
//! run. Evaluation walks the pruned plan against a per-call value cache,
//! invoking operation bodies, interpreting control chains, and releasing
//! intermediate values as soon as their last consumer has run.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

use weave_core::{DataPort, EngineError, EngineResult, Id, Operation, Value, ValueMap};

use crate::control::{ControlKind, ControlNode};
use crate::graph::Graph;
use crate::prune::PruneKey;

/// One entry of a compiled plan.
#[derive(Clone)]
pub enum Step {
    /// Invoke an operation body
    Operation(Arc<Operation>),
    /// Interpret a guard node
    Control(Arc<ControlNode>),
    /// Run an embedded sub-network against the cache
    Subnet(Arc<Network>),
    /// Evict a named value from the cache
    Delete(String),
}

impl Step {
    /// The step's display name (for deletes, the data name being evicted)
    pub fn name(&self) -> &str {
        match self {
            Step::Operation(op) => op.name(),
            Step::Control(ctrl) => ctrl.name(),
            Step::Subnet(net) => net.name(),
            Step::Delete(name) => name,
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Operation(op) => write!(f, "Operation({})", op.name()),
            Step::Control(ctrl) => write!(f, "Control({})", ctrl.name()),
            Step::Subnet(net) => write!(f, "Subnet({})", net.name()),
            Step::Delete(name) => write!(f, "Delete({name})"),
        }
    }
}

/// Which outputs a `compute` call should return.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Outputs {
    /// Every data node the run produced, minus the provided inputs
    #[default]
    All,
    /// Only the named data nodes, in no particular order
    Named(Vec<String>),
}

impl Outputs {
    /// Request a specific set of output names
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Outputs::Named(names.into_iter().map(Into::into).collect())
    }

    fn is_requested(&self, name: &str) -> bool {
        match self {
            Outputs::All => true,
            Outputs::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// A composed computation graph, ready to compile and compute.
pub struct Network {
    id: Id,
    name: String,
    graph: Graph,
    /// Compiled plan; rebuilt by [`Network::compile`]
    pub(crate) steps: Vec<Step>,
    /// Set by any mutation, cleared by compilation
    pub(crate) dirty: bool,
    /// Memoised prune results, keyed by call signature. Kept behind a
    /// mutex so concurrent `compute` calls on a compiled network stay
    /// safe; cleared on every recompilation.
    pub(crate) prune_cache: Mutex<HashMap<PruneKey, Arc<Vec<Step>>>>,
    /// Wall-clock timings of the last run, per step name
    times: Mutex<HashMap<String, Duration>>,
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            graph: Graph::new(),
            steps: Vec::new(),
            dirty: true,
            prune_cache: Mutex::new(HashMap::new()),
            times: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// True once `compile` has run against the current graph
    pub fn is_compiled(&self) -> bool {
        !self.dirty
    }

    // =========================================================================
    // Builder surface
    // =========================================================================

    /// Add an operation to the graph. Invalidates the compiled plan.
    pub fn add_op(&mut self, op: Operation) -> EngineResult<()> {
        self.add_op_arc(Arc::new(op))
    }

    pub(crate) fn add_op_arc(&mut self, op: Arc<Operation>) -> EngineResult<()> {
        self.graph.insert_operation(op)?;
        self.mark_dirty();
        Ok(())
    }

    /// Add a control node to the graph. Invalidates the compiled plan.
    pub fn add_control(&mut self, ctrl: ControlNode) -> EngineResult<()> {
        self.add_control_arc(Arc::new(ctrl))
    }

    pub(crate) fn add_control_arc(&mut self, ctrl: Arc<ControlNode>) -> EngineResult<()> {
        self.graph.insert_control(ctrl)?;
        self.mark_dirty();
        Ok(())
    }

    /// Embed another network as a single sub-network node. Invalidates the
    /// compiled plan.
    pub fn add_subnet(&mut self, net: Network) -> EngineResult<()> {
        self.add_subnet_arc(Arc::new(net))
    }

    pub(crate) fn add_subnet_arc(&mut self, net: Arc<Network>) -> EngineResult<()> {
        self.graph.insert_subnet(net)?;
        self.mark_dirty();
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.steps.clear();
        self.dirty = true;
        self.lock_prune_cache().clear();
    }

    pub(crate) fn lock_prune_cache(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<PruneKey, Arc<Vec<Step>>>> {
        self.prune_cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // External port surface
    // =========================================================================

    /// Data names this network consumes but does not produce. When the
    /// network is embedded as a sub-network node these become its inbound
    /// wiring.
    pub fn needs(&self) -> Vec<DataPort> {
        self.graph.unproduced_data()
    }

    /// Data names this network produces; the outbound wiring when embedded.
    pub fn provides(&self) -> Vec<DataPort> {
        self.graph.produced_data()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Operation and sub-network steps of the compiled plan, in plan order.
    pub fn list_layers(&self) -> EngineResult<Vec<(String, Step)>> {
        if self.dirty {
            return Err(EngineError::NotCompiled(self.name.clone()));
        }
        Ok(self
            .steps
            .iter()
            .filter(|step| matches!(step, Step::Operation(_) | Step::Subnet(_)))
            .map(|step| (step.name().to_string(), step.clone()))
            .collect())
    }

    /// Wall-clock durations recorded by the most recent `compute`, keyed by
    /// step name. Steps completed before a mid-plan failure are retained.
    pub fn last_run_times(&self) -> HashMap<String, Duration> {
        self.times.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Compute the requested outputs from the provided inputs.
    ///
    /// Runs the pruned plan for `(outputs, named_inputs, color)` against a
    /// fresh value cache. With a colour filter, only operations tagged
    /// with that colour run; untagged operations always run.
    pub fn compute(
        &self,
        outputs: Outputs,
        named_inputs: ValueMap,
        color: Option<&str>,
    ) -> EngineResult<ValueMap> {
        if self.dirty {
            return Err(EngineError::NotCompiled(self.name.clone()));
        }

        let plan = self.find_necessary_steps(&outputs, &named_inputs, color)?;

        let input_names: HashSet<String> = named_inputs.keys().cloned().collect();
        let mut cache = named_inputs;
        let mut times = HashMap::new();

        let run = self.run_plan(&plan, &outputs, &mut cache, color, &mut times);
        *self.times.lock().unwrap_or_else(PoisonError::into_inner) = times;
        run?;

        Ok(match outputs {
            Outputs::All => cache
                .into_iter()
                .filter(|(name, _)| !input_names.contains(name))
                .collect(),
            Outputs::Named(names) => cache
                .into_iter()
                .filter(|(name, _)| names.iter().any(|n| n == name))
                .collect(),
        })
    }

    /// Convenience wrapper: all outputs, no colour filter.
    pub fn run(&self, named_inputs: ValueMap) -> EngineResult<ValueMap> {
        self.compute(Outputs::All, named_inputs, None)
    }

    fn run_plan(
        &self,
        plan: &[Step],
        outputs: &Outputs,
        cache: &mut ValueMap,
        color: Option<&str>,
        times: &mut HashMap<String, Duration>,
    ) -> EngineResult<()> {
        let mut branch_taken = false;

        for step in plan {
            match step {
                Step::Operation(op) => {
                    trace!(operation = op.name(), "executing step");
                    let started = Instant::now();
                    let inputs = restrict_inputs(op, cache)?;
                    let produced = op
                        .invoke(&inputs)
                        .map_err(|source| EngineError::operation_failed(op.name(), source))?;
                    check_output_types(op, &produced)?;
                    cache.extend(produced);
                    times.insert(op.name().to_string(), started.elapsed());
                }

                Step::Subnet(net) => {
                    trace!(subnet = net.name(), "entering sub-network");
                    let started = Instant::now();
                    let produced = net.compute(Outputs::All, cache.clone(), None)?;
                    cache.extend(produced);
                    times.insert(net.name().to_string(), started.elapsed());
                }

                Step::Control(ctrl) => {
                    self.run_control(ctrl, cache, color, &mut branch_taken)?;
                }

                Step::Delete(name) => {
                    // All-outputs runs keep every value; a requested output
                    // survives its delete instruction.
                    if let Outputs::Named(_) = outputs {
                        if !outputs.is_requested(name) && cache.remove(name).is_some() {
                            trace!(data = name.as_str(), "evicted from cache");
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Interpret one guard node against the cache.
    ///
    /// A false guard leaves the branch-taken flag unchanged; a guard whose
    /// condition needs were pruned away short-circuits into its branch; an
    /// `Else` clears the flag whether or not it fires.
    fn run_control(
        &self,
        ctrl: &ControlNode,
        cache: &mut ValueMap,
        color: Option<&str>,
        branch_taken: &mut bool,
    ) -> EngineResult<()> {
        match ctrl.kind() {
            ControlKind::If(guard) | ControlKind::ElseIf(guard) => {
                if guard.satisfied_by(cache) {
                    if guard.evaluate(cache) {
                        trace!(control = ctrl.name(), "guard true, taking branch");
                        let produced = ctrl.net().compute(Outputs::All, cache.clone(), color)?;
                        cache.extend(produced);
                        *branch_taken = true;
                    }
                } else {
                    // Condition inputs were pruned away upstream; treat the
                    // branch as taken.
                    trace!(control = ctrl.name(), "guard inputs absent, short-circuiting");
                    let produced = ctrl.net().compute(Outputs::All, cache.clone(), color)?;
                    cache.extend(produced);
                    *branch_taken = true;
                }
            }
            ControlKind::Else => {
                if !*branch_taken {
                    trace!(control = ctrl.name(), "no branch taken, running else");
                    let produced = ctrl.net().compute(Outputs::All, cache.clone(), color)?;
                    cache.extend(produced);
                }
                *branch_taken = false;
            }
        }
        Ok(())
    }
}

/// The value cache restricted to an operation's needs. A missing optional
/// need is omitted; a missing required need aborts the call.
fn restrict_inputs(op: &Operation, cache: &ValueMap) -> EngineResult<ValueMap> {
    let mut inputs = ValueMap::with_capacity(op.needs().len());
    for port in op.needs() {
        match cache.get(&port.name) {
            Some(value) => {
                inputs.insert(port.name.clone(), value.clone());
            }
            None if port.optional => {}
            None => return Err(EngineError::missing_input(op.name(), &port.name)),
        }
    }
    Ok(inputs)
}

/// Check each returned value against the type its port declared.
fn check_output_types(op: &Operation, produced: &HashMap<String, Value>) -> EngineResult<()> {
    for port in op.provides() {
        if let (Some(expected), Some(value)) = (port.ty, produced.get(&port.name)) {
            let got = value.value_type();
            if got != expected {
                return Err(EngineError::OutputType {
                    operation: op.name().to_string(),
                    port: port.name.clone(),
                    expected,
                    got,
                });
            }
        }
    }
    Ok(())
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "network '{}':", self.name)?;
        for (key, node) in self.graph.nodes_in_order() {
            match node {
                crate::graph::GraphNode::Operation(op) => {
                    let needs: Vec<&str> = op.needs().iter().map(|p| p.name.as_str()).collect();
                    let provides: Vec<&str> =
                        op.provides().iter().map(|p| p.name.as_str()).collect();
                    writeln!(f, "  {}: {:?} -> {:?}", key.name(), needs, provides)?;
                }
                crate::graph::GraphNode::Control(ctrl) => {
                    writeln!(f, "  {} (control, order {})", key.name(), ctrl.order())?;
                }
                crate::graph::GraphNode::Subnet(net) => {
                    writeln!(f, "  {} (sub-network)", net.name())?;
                }
                crate::graph::GraphNode::Data(_) => {}
            }
        }
        Ok(())
    }
}
