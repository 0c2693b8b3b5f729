use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::{NodeId, NodeKind};

/// Kind of a provenance link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkKind {
    /// Data → Process: the data was consumed by the process.
    Input,
    /// Process → Data: the data was produced by the process.
    Create,
    /// Workflow → Data: the data was returned by the workflow.
    Return,
    /// Workflow → Process: the workflow invoked the process.
    Call,
}

impl LinkKind {
    pub const ALL: [LinkKind; 4] = [
        LinkKind::Input,
        LinkKind::Create,
        LinkKind::Return,
        LinkKind::Call,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Input => "INPUT",
            LinkKind::Create => "CREATE",
            LinkKind::Return => "RETURN",
            LinkKind::Call => "CALL",
        }
    }

    /// Whether a link of this kind may connect `source` to `target`.
    pub fn admits(&self, source: NodeKind, target: NodeKind) -> bool {
        match self {
            LinkKind::Input => source == NodeKind::Data && target.is_process(),
            LinkKind::Create => source == NodeKind::Calculation && target == NodeKind::Data,
            LinkKind::Return => source == NodeKind::Workflow && target == NodeKind::Data,
            LinkKind::Call => source == NodeKind::Workflow && target.is_process(),
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a link relative to the node it is fetched for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirection {
    /// The node is the link's target.
    Incoming,
    /// The node is the link's source.
    Outgoing,
}

/// A directed, labelled provenance edge.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: LinkKind,
    #[serde(default)]
    pub label: String,
}

impl Link {
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        kind: LinkKind,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            label: label.into(),
        }
    }

    /// Direction of this link as seen from `id`, or `None` if `id` is not an endpoint.
    pub fn direction_from(&self, id: &NodeId) -> Option<LinkDirection> {
        if &self.source == id {
            Some(LinkDirection::Outgoing)
        } else if &self.target == id {
            Some(LinkDirection::Incoming)
        } else {
            None
        }
    }

    /// The endpoint on the far side when viewed in `direction`.
    pub fn neighbour(&self, direction: LinkDirection) -> &NodeId {
        match direction {
            LinkDirection::Outgoing => &self.target,
            LinkDirection::Incoming => &self.source,
        }
    }

    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }
}
