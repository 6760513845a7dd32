//! JSON description of the in-memory graph
//!
//! Bodies and conditions are closures, so networks cannot round-trip
//! through serialization; what can be exported is the structure — layers
//! with their needs, provides, colours, and condition needs, plus the data
//! nodes and their declared types. Control nodes and sub-networks embed
//! the description of their inner network.

use serde::Serialize;

use weave_core::ValueType;

use crate::control::ControlKind;
use crate::graph::GraphNode;
use crate::network::Network;

/// Serializable summary of a network's graph.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkDoc {
    pub name: String,
    pub data: Vec<DataDoc>,
    pub layers: Vec<LayerDoc>,
}

impl NetworkDoc {
    /// Pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A data node and its declared type, if any.
#[derive(Debug, Clone, Serialize)]
pub struct DataDoc {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ty: Option<ValueType>,
}

/// What kind of layer a [`LayerDoc`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Operation,
    If,
    ElseIf,
    Else,
    Subnet,
}

/// One step node of the graph.
#[derive(Debug, Clone, Serialize)]
pub struct LayerDoc {
    pub name: String,
    pub kind: LayerKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub condition_needs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<Box<NetworkDoc>>,
}

impl Network {
    /// Describe the in-memory graph. Works whether or not the network has
    /// been compiled.
    pub fn describe(&self) -> NetworkDoc {
        let mut data = Vec::new();
        let mut layers = Vec::new();

        for (key, node) in self.graph().nodes_in_order() {
            match node {
                GraphNode::Data(info) => data.push(DataDoc {
                    name: key.name().to_string(),
                    ty: info.ty,
                }),
                GraphNode::Operation(op) => layers.push(LayerDoc {
                    name: op.name().to_string(),
                    kind: LayerKind::Operation,
                    needs: op.needs().iter().map(|p| p.name.clone()).collect(),
                    provides: op.provides().iter().map(|p| p.name.clone()).collect(),
                    color: op.color().map(str::to_string),
                    condition_needs: Vec::new(),
                    subnet: None,
                }),
                GraphNode::Control(ctrl) => layers.push(LayerDoc {
                    name: ctrl.name().to_string(),
                    kind: match ctrl.kind() {
                        ControlKind::If(_) => LayerKind::If,
                        ControlKind::ElseIf(_) => LayerKind::ElseIf,
                        ControlKind::Else => LayerKind::Else,
                    },
                    needs: Vec::new(),
                    provides: Vec::new(),
                    color: None,
                    condition_needs: ctrl
                        .guard()
                        .map(|g| g.needs().to_vec())
                        .unwrap_or_default(),
                    subnet: Some(Box::new(ctrl.net().describe())),
                }),
                GraphNode::Subnet(net) => layers.push(LayerDoc {
                    name: net.name().to_string(),
                    kind: LayerKind::Subnet,
                    needs: net.needs().into_iter().map(|p| p.name).collect(),
                    provides: net.provides().into_iter().map(|p| p.name).collect(),
                    color: None,
                    condition_needs: Vec::new(),
                    subnet: Some(Box::new(net.describe())),
                }),
            }
        }

        NetworkDoc {
            name: self.name().to_string(),
            data,
            layers,
        }
    }
}
