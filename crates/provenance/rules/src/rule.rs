use provenance_types::{LinkDirection, LinkKind, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RuleError;

/// One toggle of the deletion traversal.
///
/// `Forward` rules apply when the node being expanded is the link's source,
/// `Backward` rules when it is the target. `INPUT` and `CALL` links are split
/// by the kind of the process at their target end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalRule {
    InputCalcForward,
    InputCalcBackward,
    CreateForward,
    CreateBackward,
    ReturnForward,
    ReturnBackward,
    InputWorkForward,
    InputWorkBackward,
    CallCalcForward,
    CallCalcBackward,
    CallWorkForward,
    CallWorkBackward,
}

impl TraversalRule {
    pub const ALL: [TraversalRule; 12] = [
        TraversalRule::InputCalcForward,
        TraversalRule::InputCalcBackward,
        TraversalRule::CreateForward,
        TraversalRule::CreateBackward,
        TraversalRule::ReturnForward,
        TraversalRule::ReturnBackward,
        TraversalRule::InputWorkForward,
        TraversalRule::InputWorkBackward,
        TraversalRule::CallCalcForward,
        TraversalRule::CallCalcBackward,
        TraversalRule::CallWorkForward,
        TraversalRule::CallWorkBackward,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TraversalRule::InputCalcForward => "input_calc_forward",
            TraversalRule::InputCalcBackward => "input_calc_backward",
            TraversalRule::CreateForward => "create_forward",
            TraversalRule::CreateBackward => "create_backward",
            TraversalRule::ReturnForward => "return_forward",
            TraversalRule::ReturnBackward => "return_backward",
            TraversalRule::InputWorkForward => "input_work_forward",
            TraversalRule::InputWorkBackward => "input_work_backward",
            TraversalRule::CallCalcForward => "call_calc_forward",
            TraversalRule::CallCalcBackward => "call_calc_backward",
            TraversalRule::CallWorkForward => "call_work_forward",
            TraversalRule::CallWorkBackward => "call_work_backward",
        }
    }

    /// Look a rule up by name. Dashes are accepted in place of underscores.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|rule| rule.name() == normalized)
    }

    /// Default value under the deletion policy.
    pub fn default_enabled(&self) -> bool {
        match self {
            TraversalRule::InputCalcForward
            | TraversalRule::CreateForward
            | TraversalRule::CreateBackward
            | TraversalRule::ReturnBackward
            | TraversalRule::InputWorkForward
            | TraversalRule::CallCalcBackward
            | TraversalRule::CallWorkBackward => true,
            TraversalRule::InputCalcBackward
            | TraversalRule::ReturnForward
            | TraversalRule::InputWorkBackward
            | TraversalRule::CallCalcForward
            | TraversalRule::CallWorkForward => false,
        }
    }

    /// Whether changing this rule away from its default keeps the remaining
    /// graph consistent. Only these are offered as user switches.
    pub fn toggleable(&self) -> bool {
        matches!(
            self,
            TraversalRule::CreateForward
                | TraversalRule::CallCalcForward
                | TraversalRule::CallWorkForward
        )
    }

    pub fn link_kind(&self) -> LinkKind {
        match self {
            TraversalRule::InputCalcForward
            | TraversalRule::InputCalcBackward
            | TraversalRule::InputWorkForward
            | TraversalRule::InputWorkBackward => LinkKind::Input,
            TraversalRule::CreateForward | TraversalRule::CreateBackward => LinkKind::Create,
            TraversalRule::ReturnForward | TraversalRule::ReturnBackward => LinkKind::Return,
            TraversalRule::CallCalcForward
            | TraversalRule::CallCalcBackward
            | TraversalRule::CallWorkForward
            | TraversalRule::CallWorkBackward => LinkKind::Call,
        }
    }

    /// Direction of the link as seen from the node being expanded.
    pub fn direction(&self) -> LinkDirection {
        match self {
            TraversalRule::InputCalcForward
            | TraversalRule::CreateForward
            | TraversalRule::ReturnForward
            | TraversalRule::InputWorkForward
            | TraversalRule::CallCalcForward
            | TraversalRule::CallWorkForward => LinkDirection::Outgoing,
            TraversalRule::InputCalcBackward
            | TraversalRule::CreateBackward
            | TraversalRule::ReturnBackward
            | TraversalRule::InputWorkBackward
            | TraversalRule::CallCalcBackward
            | TraversalRule::CallWorkBackward => LinkDirection::Incoming,
        }
    }

    /// The rule governing a link of `kind` between nodes of the given kinds,
    /// seen in `direction` from the node being expanded.
    ///
    /// Returns `None` when the endpoint kinds are not valid for the link kind.
    pub fn for_edge(
        kind: LinkKind,
        source: NodeKind,
        target: NodeKind,
        direction: LinkDirection,
    ) -> Option<Self> {
        if !kind.admits(source, target) {
            return None;
        }
        let forward = direction == LinkDirection::Outgoing;
        let rule = match (kind, target, forward) {
            (LinkKind::Input, NodeKind::Calculation, true) => TraversalRule::InputCalcForward,
            (LinkKind::Input, NodeKind::Calculation, false) => TraversalRule::InputCalcBackward,
            (LinkKind::Input, NodeKind::Workflow, true) => TraversalRule::InputWorkForward,
            (LinkKind::Input, NodeKind::Workflow, false) => TraversalRule::InputWorkBackward,
            (LinkKind::Create, _, true) => TraversalRule::CreateForward,
            (LinkKind::Create, _, false) => TraversalRule::CreateBackward,
            (LinkKind::Return, _, true) => TraversalRule::ReturnForward,
            (LinkKind::Return, _, false) => TraversalRule::ReturnBackward,
            (LinkKind::Call, NodeKind::Calculation, true) => TraversalRule::CallCalcForward,
            (LinkKind::Call, NodeKind::Calculation, false) => TraversalRule::CallCalcBackward,
            (LinkKind::Call, NodeKind::Workflow, true) => TraversalRule::CallWorkForward,
            (LinkKind::Call, NodeKind::Workflow, false) => TraversalRule::CallWorkBackward,
            (LinkKind::Input | LinkKind::Call, NodeKind::Data, _) => return None,
        };
        Some(rule)
    }
}

impl fmt::Display for TraversalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TraversalRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| RuleError::UnknownRule {
            names: vec![s.to_string()],
        })
    }
}
