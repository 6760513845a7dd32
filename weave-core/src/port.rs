//! Data ports: named, optionally typed value channels
//!
//! A [`DataPort`] identifies one value flowing through a graph. Ports with
//! the same name refer to the same data node; the first port that declares
//! a concrete type fixes the type of that node for the whole graph.

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// Identifier of a value flowing through the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPort {
    /// Data name, unique within a graph
    pub name: String,
    /// Declared type, checked against produced values at run time.
    /// `None` leaves the data node unconstrained.
    pub ty: Option<ValueType>,
    /// If true, absence of this value does not veto the operation
    pub optional: bool,
}

impl DataPort {
    /// An untyped, required port
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            optional: false,
        }
    }

    /// A typed, required port
    pub fn typed(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            optional: false,
        }
    }

    /// An untyped port whose absence does not veto the operation
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            optional: true,
        }
    }

    /// Builder: set the declared type
    pub fn with_type(mut self, ty: ValueType) -> Self {
        self.ty = Some(ty);
        self
    }
}

impl From<&str> for DataPort {
    fn from(name: &str) -> Self {
        DataPort::new(name)
    }
}

impl From<String> for DataPort {
    fn from(name: String) -> Self {
        DataPort::new(name)
    }
}
