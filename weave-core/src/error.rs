//! Error types for the Weave computation-graph system
//!
//! A single [`EngineError`] covers construction, compilation, pruning, and
//! evaluation failures. Errors raised inside user operation bodies are
//! preserved verbatim as the source of [`EngineError::OperationFailed`].

use thiserror::Error;

use crate::value::ValueType;

/// Errors produced by user operation bodies
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for graph construction and execution
#[derive(Error, Debug)]
pub enum EngineError {
    // === Construction Errors ===
    /// Malformed or duplicate operation descriptor
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A data name was re-declared with a conflicting type
    #[error("conflicting types for data '{name}': expected {expected}, got {got}")]
    TypeConflict {
        name: String,
        expected: ValueType,
        got: ValueType,
    },

    /// The graph contains a cycle
    #[error("graph is not a DAG; unresolved nodes: {nodes:?}")]
    GraphCycle { nodes: Vec<String> },

    // === Compute Errors ===
    /// A requested output has no node in the graph
    #[error("graph does not have an output node named '{0}'")]
    UnknownOutput(String),

    /// `compute` was called before `compile`
    #[error("network '{0}' must be compiled before use")]
    NotCompiled(String),

    /// A required input was absent from the value cache
    #[error("operation '{operation}' is missing required input '{name}'")]
    MissingInput { operation: String, name: String },

    /// An operation produced a value whose type disagrees with its port
    #[error(
        "type mismatch on output '{port}' of operation '{operation}': expected {expected}, got {got}"
    )]
    OutputType {
        operation: String,
        port: String,
        expected: ValueType,
        got: ValueType,
    },

    /// A user operation body returned an error
    #[error("operation '{operation}' failed")]
    OperationFailed {
        operation: String,
        #[source]
        source: BodyError,
    },

    // === Generic Errors ===
    /// Engine invariant violation (indicates a compiler bug)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for engine results
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Create an invalid-operation error
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation(reason.into())
    }

    /// Create a type-conflict error
    pub fn type_conflict(name: impl Into<String>, expected: ValueType, got: ValueType) -> Self {
        Self::TypeConflict {
            name: name.into(),
            expected,
            got,
        }
    }

    /// Create a missing-input error
    pub fn missing_input(operation: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingInput {
            operation: operation.into(),
            name: name.into(),
        }
    }

    /// Create an operation-failed error wrapping a user body error
    pub fn operation_failed(operation: impl Into<String>, source: BodyError) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
