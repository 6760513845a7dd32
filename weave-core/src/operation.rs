//! Operation descriptors
//!
//! An [`Operation`] is a pure computation node: it consumes the data named
//! by its `needs`, produces the data named by its `provides`, and carries a
//! `params` mapping that is presented to the body on every invocation. The
//! descriptor is immutable once built; the engine in `weave-graph` wires it
//! into a graph by name.

use std::collections::HashMap;

use crate::error::{BodyError, EngineError, EngineResult};
use crate::id::Id;
use crate::port::DataPort;
use crate::value::Value;

/// Named values entering or leaving an operation body
pub type ValueMap = HashMap<String, Value>;

/// Opaque configuration presented to an operation body
pub type ParamMap = HashMap<String, Value>;

/// Function type for operation bodies.
///
/// The first argument is the value cache restricted to the operation's
/// `needs`; the second is the descriptor's `params`. The returned mapping
/// must cover each `provides` port the body owns.
pub type OpBody = Box<dyn Fn(&ValueMap, &ParamMap) -> Result<ValueMap, BodyError> + Send + Sync>;

/// A pure computation node in a network.
pub struct Operation {
    id: Id,
    name: String,
    needs: Vec<DataPort>,
    provides: Vec<DataPort>,
    params: ParamMap,
    color: Option<String>,
    body: OpBody,
}

impl Operation {
    /// Start building an operation descriptor
    pub fn builder(name: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(name)
    }

    /// Instance id, independent of the display name
    pub fn id(&self) -> Id {
        self.id
    }

    /// Operation name, unique within a graph
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input ports, in declaration order
    pub fn needs(&self) -> &[DataPort] {
        &self.needs
    }

    /// Output ports, in declaration order
    pub fn provides(&self) -> &[DataPort] {
        &self.provides
    }

    /// Configuration mapping presented to the body
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Optional colour label for subgraph-scoped execution
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Invoke the body with the given inputs and this descriptor's params
    pub fn invoke(&self, inputs: &ValueMap) -> Result<ValueMap, BodyError> {
        (self.body)(inputs, &self.params)
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("needs", &self.needs)
            .field("provides", &self.provides)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Operation`] descriptors.
///
/// `build` fails with [`EngineError::InvalidOperation`] when the name is
/// empty or when needs, provides, or the body were never supplied. An
/// explicitly empty needs or provides list is legal (source and sink
/// operations).
pub struct OperationBuilder {
    name: String,
    needs: Option<Vec<DataPort>>,
    provides: Option<Vec<DataPort>>,
    params: ParamMap,
    color: Option<String>,
    body: Option<OpBody>,
}

impl OperationBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            needs: None,
            provides: None,
            params: ParamMap::new(),
            color: None,
            body: None,
        }
    }

    /// Declare the input ports
    pub fn needs<I, P>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<DataPort>,
    {
        self.needs = Some(ports.into_iter().map(Into::into).collect());
        self
    }

    /// Declare the output ports
    pub fn provides<I, P>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<DataPort>,
    {
        self.provides = Some(ports.into_iter().map(Into::into).collect());
        self
    }

    /// Add one configuration entry
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Tag the operation with a colour label
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Supply the computation body
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&ValueMap, &ParamMap) -> Result<ValueMap, BodyError> + Send + Sync + 'static,
    {
        self.body = Some(Box::new(body));
        self
    }

    /// Validate and produce the descriptor
    pub fn build(self) -> EngineResult<Operation> {
        if self.name.is_empty() {
            return Err(EngineError::invalid_operation("operation must be named"));
        }
        let needs = self.needs.ok_or_else(|| {
            EngineError::invalid_operation(format!("operation '{}': needs must be named", self.name))
        })?;
        let provides = self.provides.ok_or_else(|| {
            EngineError::invalid_operation(format!(
                "operation '{}': provides must be named",
                self.name
            ))
        })?;
        let body = self.body.ok_or_else(|| {
            EngineError::invalid_operation(format!("operation '{}': body is required", self.name))
        })?;

        Ok(Operation {
            id: Id::new(),
            name: self.name,
            needs,
            provides,
            params: self.params,
            color: self.color,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_body(inputs: &ValueMap, _params: &ParamMap) -> Result<ValueMap, BodyError> {
        let a = inputs["a"].as_int().ok_or("a must be an int")?;
        let b = inputs["b"].as_int().ok_or("b must be an int")?;
        Ok(ValueMap::from([("ab".to_string(), Value::Int(a + b))]))
    }

    #[test]
    fn test_builder_produces_descriptor() {
        let op = Operation::builder("sum")
            .needs(["a", "b"])
            .provides(["ab"])
            .color("math")
            .body(sum_body)
            .build()
            .unwrap();

        assert_eq!(op.name(), "sum");
        assert_eq!(op.needs().len(), 2);
        assert_eq!(op.provides()[0].name, "ab");
        assert_eq!(op.color(), Some("math"));
    }

    #[test]
    fn test_invoke_runs_body() {
        let op = Operation::builder("sum")
            .needs(["a", "b"])
            .provides(["ab"])
            .body(sum_body)
            .build()
            .unwrap();

        let inputs = ValueMap::from([
            ("a".to_string(), Value::Int(1)),
            ("b".to_string(), Value::Int(2)),
        ]);
        let outputs = op.invoke(&inputs).unwrap();
        assert_eq!(outputs["ab"], Value::Int(3));
    }

    #[test]
    fn test_params_reach_body() {
        let op = Operation::builder("pow")
            .needs(["base"])
            .provides(["powers"])
            .param("exponent", 3i64)
            .body(|inputs, params| {
                let base = inputs["base"].as_int().ok_or("base must be an int")?;
                let exponent = params["exponent"].as_int().ok_or("exponent")?;
                let powers: Vec<Value> = (1..=exponent).map(|y| Value::Int(base.pow(y as u32))).collect();
                Ok(ValueMap::from([("powers".to_string(), Value::List(powers))]))
            })
            .build()
            .unwrap();

        let inputs = ValueMap::from([("base".to_string(), Value::Int(2))]);
        let outputs = op.invoke(&inputs).unwrap();
        assert_eq!(
            outputs["powers"],
            Value::List(vec![Value::Int(2), Value::Int(4), Value::Int(8)])
        );
    }

    #[test]
    fn test_build_rejects_missing_pieces() {
        assert!(matches!(
            Operation::builder("").needs(["a"]).provides(["b"]).build(),
            Err(EngineError::InvalidOperation(_))
        ));
        assert!(matches!(
            Operation::builder("op").provides(["b"]).body(sum_body).build(),
            Err(EngineError::InvalidOperation(_))
        ));
        assert!(matches!(
            Operation::builder("op").needs(["a"]).body(sum_body).build(),
            Err(EngineError::InvalidOperation(_))
        ));
        assert!(matches!(
            Operation::builder("op").needs(["a"]).provides(["b"]).build(),
            Err(EngineError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_empty_port_lists_are_legal() {
        let op = Operation::builder("source")
            .needs(Vec::<DataPort>::new())
            .provides(["x"])
            .body(|_, _| Ok(ValueMap::from([("x".to_string(), Value::Int(7))])))
            .build()
            .unwrap();
        assert!(op.needs().is_empty());
    }
}
