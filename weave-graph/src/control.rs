//! Conditional evaluation: If / ElseIf / Else guard nodes
//!
//! A control node wraps a sub-network and decides at run time whether that
//! sub-network contributes to the value cache. Guards are ordered by a
//! plain data key (If=1, ElseIf=2, Else=3) which the compiler uses to break
//! topological ties, so chains evaluate in source order.

use std::sync::Arc;

use weave_core::ValueMap;

use crate::network::Network;

/// Predicate deciding whether a guarded branch runs
pub type Condition = Box<dyn Fn(&ValueMap) -> bool + Send + Sync>;

/// The data names and predicate guarding an `If` or `ElseIf` branch
pub struct Guard {
    needs: Vec<String>,
    predicate: Condition,
}

impl Guard {
    pub fn new<I, S>(needs: I, predicate: impl Fn(&ValueMap) -> bool + Send + Sync + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needs: needs.into_iter().map(Into::into).collect(),
            predicate: Box::new(predicate),
        }
    }

    /// Data names the predicate reads
    pub fn needs(&self) -> &[String] {
        &self.needs
    }

    /// True when every condition need is present in the cache
    pub fn satisfied_by(&self, cache: &ValueMap) -> bool {
        self.needs.iter().all(|name| cache.contains_key(name))
    }

    /// Run the predicate against the cache
    pub fn evaluate(&self, cache: &ValueMap) -> bool {
        (self.predicate)(cache)
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard").field("needs", &self.needs).finish_non_exhaustive()
    }
}

/// Variant of a control node.
pub enum ControlKind {
    /// Opens a chain; runs its branch when the guard holds
    If(Guard),
    /// Follows an `If`; runs when the guard holds
    ElseIf(Guard),
    /// Closes a chain; runs when no earlier branch fired. The compiler
    /// contract is at most one `Else` per chain: the evaluator clears the
    /// branch-taken flag when it passes an `Else`, so a second `Else` in
    /// the same chain would fire again.
    Else,
}

/// A guard node wrapping a sub-network.
pub struct ControlNode {
    name: String,
    kind: ControlKind,
    net: Arc<Network>,
}

impl ControlNode {
    /// An `If` branch
    pub fn if_branch<I, S>(
        name: impl Into<String>,
        condition_needs: I,
        condition: impl Fn(&ValueMap) -> bool + Send + Sync + 'static,
        net: Network,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: ControlKind::If(Guard::new(condition_needs, condition)),
            net: Arc::new(net),
        }
    }

    /// An `ElseIf` branch
    pub fn else_if_branch<I, S>(
        name: impl Into<String>,
        condition_needs: I,
        condition: impl Fn(&ValueMap) -> bool + Send + Sync + 'static,
        net: Network,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: ControlKind::ElseIf(Guard::new(condition_needs, condition)),
            net: Arc::new(net),
        }
    }

    /// An `Else` branch
    pub fn else_branch(name: impl Into<String>, net: Network) -> Self {
        Self {
            name: name.into(),
            kind: ControlKind::Else,
            net: Arc::new(net),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    /// Chain position used as the compiler's tie-breaking key
    pub fn order(&self) -> u8 {
        match self.kind {
            ControlKind::If(_) => 1,
            ControlKind::ElseIf(_) => 2,
            ControlKind::Else => 3,
        }
    }

    /// The guard, for `If` and `ElseIf` nodes
    pub fn guard(&self) -> Option<&Guard> {
        match &self.kind {
            ControlKind::If(guard) | ControlKind::ElseIf(guard) => Some(guard),
            ControlKind::Else => None,
        }
    }

    /// The wrapped sub-network
    pub fn net(&self) -> &Arc<Network> {
        &self.net
    }
}

impl std::fmt::Debug for ControlNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ControlKind::If(_) => "If",
            ControlKind::ElseIf(_) => "ElseIf",
            ControlKind::Else => "Else",
        };
        f.debug_struct("ControlNode")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("net", &self.net.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::Value;

    #[test]
    fn test_order_keys() {
        let inner = || Network::new("inner");
        let if_node = ControlNode::if_branch("a", ["x"], |_| true, inner());
        let else_if = ControlNode::else_if_branch("b", ["x"], |_| true, inner());
        let else_node = ControlNode::else_branch("c", inner());
        assert_eq!(if_node.order(), 1);
        assert_eq!(else_if.order(), 2);
        assert_eq!(else_node.order(), 3);
        assert!(else_node.guard().is_none());
    }

    #[test]
    fn test_guard_satisfaction_and_evaluation() {
        let guard = Guard::new(["x"], |cache: &ValueMap| {
            cache["x"].as_int().unwrap_or(0) > 0
        });

        let mut cache = ValueMap::new();
        assert!(!guard.satisfied_by(&cache));

        cache.insert("x".to_string(), Value::Int(3));
        assert!(guard.satisfied_by(&cache));
        assert!(guard.evaluate(&cache));

        cache.insert("x".to_string(), Value::Int(-1));
        assert!(!guard.evaluate(&cache));
    }
}
