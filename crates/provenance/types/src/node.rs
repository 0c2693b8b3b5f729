use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable, opaque node identifier.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// The closed set of node kinds in the provenance graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Data,
    Calculation,
    Workflow,
}

impl NodeKind {
    /// Calculations and workflows are process nodes.
    pub fn is_process(&self) -> bool {
        matches!(self, NodeKind::Calculation | NodeKind::Workflow)
    }

    /// Short tag used in listings and rule names.
    pub fn short_name(&self) -> &'static str {
        match self {
            NodeKind::Data => "data",
            NodeKind::Calculation => "calc",
            NodeKind::Workflow => "work",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Data => "Data",
            NodeKind::Calculation => "Calculation",
            NodeKind::Workflow => "Workflow",
        };
        f.write_str(name)
    }
}

/// A node in the provenance graph.
///
/// Only identity and classification are modelled here; payload content lives
/// in the backing store and the artifact repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub uuid: Uuid,
    pub kind: NodeKind,
    #[serde(default)]
    pub label: String,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: Uuid::new_v4(),
            kind,
            label: label.into(),
        }
    }

    pub fn data(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Data, "")
    }

    pub fn calculation(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Calculation, "")
    }

    pub fn workflow(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Workflow, "")
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_kinds() {
        assert!(!NodeKind::Data.is_process());
        assert!(NodeKind::Calculation.is_process());
        assert!(NodeKind::Workflow.is_process());
    }

    #[test]
    fn node_id_conversions() {
        assert_eq!(NodeId::from(42u64), NodeId::new("42"));
        assert_eq!(NodeId::from("D1").to_string(), "D1");
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&NodeId::from("C1")).unwrap();
        assert_eq!(json, "\"C1\"");
    }

    #[test]
    fn constructors_set_kind_and_label() {
        let node = Node::calculation("C1").with_label("relax");
        assert_eq!(node.kind, NodeKind::Calculation);
        assert_eq!(node.label, "relax");
        assert_ne!(Node::data("D1").uuid, Node::data("D1").uuid);
    }
}
