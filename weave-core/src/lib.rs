//! Weave Core - Foundation types for the Weave computation-graph system
//!
//! This crate provides the value objects that the graph engine in
//! `weave-graph` assembles and executes:
//!
//! - [`Id`] - Unique identifiers for descriptors and networks
//! - [`Value`] / [`ValueType`] - Values that flow between operations, with
//!   runtime type tags for post-compute checks
//! - [`DataPort`] - A named, optionally typed value channel
//! - [`Operation`] - A pure computation descriptor built with
//!   [`OperationBuilder`]
//! - [`EngineError`] - The single error type shared across the workspace
//!
//! # Example
//!
//! ```
//! use weave_core::{DataPort, Operation, Value, ValueMap};
//!
//! let sum = Operation::builder("sum")
//!     .needs([DataPort::new("a"), DataPort::new("b")])
//!     .provides([DataPort::new("ab")])
//!     .body(|inputs: &ValueMap, _params| {
//!         let a = inputs["a"].as_int().unwrap_or(0);
//!         let b = inputs["b"].as_int().unwrap_or(0);
//!         Ok(ValueMap::from([("ab".to_string(), Value::Int(a + b))]))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(sum.name(), "sum");
//! ```

pub mod error;
pub mod id;
pub mod operation;
pub mod port;
pub mod value;

// Re-export commonly used types at crate root
pub use error::{BodyError, EngineError, EngineResult};
pub use id::Id;
pub use operation::{OpBody, Operation, OperationBuilder, ParamMap, ValueMap};
pub use port::DataPort;
pub use value::{Value, ValueType};
