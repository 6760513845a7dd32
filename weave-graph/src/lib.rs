//! Weave Graph - Assembly, compilation, and execution of dataflow networks
//!
//! This crate turns operation descriptors from `weave-core` into runnable
//! networks. Operations declare the data names they need and provide; the
//! graph wires them together by name, the compiler linearises the graph
//! into a plan interleaved with memory-release steps, the pruner narrows
//! the plan to what a call actually requires, and the evaluator drives the
//! pruned plan against a per-call value cache.
//!
//! # Modules
//!
//! - [`graph`] - The directed graph of data names and steps
//! - [`network`] - Networks: compiled plans, evaluation, timings
//! - [`compose`] - Composition of operations and networks (shallow/deep)
//! - [`compiler`] - Topological ordering and release analysis
//! - [`prune`] - Call-signature pruning with memoisation
//! - [`control`] - If / ElseIf / Else guard nodes over sub-networks
//! - [`serialization`] - JSON description of the in-memory graph
//!
//! # Example
//!
//! ```
//! use weave_core::{Operation, Value, ValueMap};
//! use weave_graph::{compose, Outputs};
//!
//! let sum = Operation::builder("sum")
//!     .needs(["a", "b"])
//!     .provides(["ab"])
//!     .body(|inputs: &ValueMap, _| {
//!         let a = inputs["a"].as_int().ok_or("expected int")?;
//!         let b = inputs["b"].as_int().ok_or("expected int")?;
//!         Ok(ValueMap::from([("ab".to_string(), Value::Int(a + b))]))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let net = compose("sums").op(sum).build().unwrap();
//! let inputs = ValueMap::from([
//!     ("a".to_string(), Value::Int(1)),
//!     ("b".to_string(), Value::Int(2)),
//! ]);
//! let results = net.compute(Outputs::All, inputs, None).unwrap();
//! assert_eq!(results["ab"], Value::Int(3));
//! ```

pub mod compiler;
pub mod compose;
pub mod control;
pub mod graph;
pub mod network;
pub mod prune;
pub mod serialization;

// Re-export main types
pub use compose::{compose, Composer};
pub use control::{Condition, ControlKind, ControlNode, Guard};
pub use graph::{DataInfo, Graph, GraphNode, NodeKey};
pub use network::{Network, Outputs, Step};
pub use serialization::{DataDoc, LayerDoc, LayerKind, NetworkDoc};
