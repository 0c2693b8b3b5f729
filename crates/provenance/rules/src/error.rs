use crate::rule::TraversalRule;

/// Errors from rule validation and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("unknown traversal rule(s): {}; valid rules are: {}", .names.join(", "), valid_rule_names())]
    UnknownRule { names: Vec<String> },

    #[error("traversal rule `{rule}` is not toggleable (fixed to {default})")]
    NotToggleable { rule: TraversalRule, default: bool },
}

fn valid_rule_names() -> String {
    TraversalRule::ALL
        .iter()
        .map(|rule| rule.name())
        .collect::<Vec<_>>()
        .join(", ")
}
