use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RuleError;
use crate::rule::TraversalRule;

/// A complete rule table: every [`TraversalRule`] mapped to a boolean.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<TraversalRule, bool>", from = "BTreeMap<TraversalRule, bool>")]
pub struct RuleSet {
    enabled: BTreeMap<TraversalRule, bool>,
}

impl RuleSet {
    /// Fail with [`RuleError::UnknownRule`] if any name is outside the rule enumeration.
    pub fn validate<I, S>(names: I) -> Result<(), RuleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unknown: Vec<String> = names
            .into_iter()
            .filter(|name| TraversalRule::from_name(name.as_ref()).is_none())
            .map(|name| name.as_ref().to_string())
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(RuleError::UnknownRule { names: unknown })
        }
    }

    /// Build a complete table from the defaults and the given overrides.
    ///
    /// All names are validated before any override is applied.
    pub fn resolve<I, S>(overrides: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let overrides: Vec<(S, bool)> = overrides.into_iter().collect();
        Self::validate(overrides.iter().map(|(name, _)| name.as_ref()))?;

        let mut set = Self::default();
        for (name, value) in &overrides {
            if let Some(rule) = TraversalRule::from_name(name.as_ref()) {
                set.set(rule, *value);
            }
        }
        Ok(set)
    }

    /// Like [`RuleSet::resolve`], but also rejects overrides that move a
    /// non-toggleable rule away from its default.
    pub fn resolve_strict<I, S>(overrides: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let set = Self::resolve(overrides)?;
        for rule in TraversalRule::ALL {
            if !rule.toggleable() && set.is_enabled(rule) != rule.default_enabled() {
                return Err(RuleError::NotToggleable {
                    rule,
                    default: rule.default_enabled(),
                });
            }
        }
        Ok(set)
    }

    /// Every rule disabled. Closures computed with it are the seeds alone.
    pub fn none() -> Self {
        Self {
            enabled: TraversalRule::ALL.iter().map(|r| (*r, false)).collect(),
        }
    }

    pub fn is_enabled(&self, rule: TraversalRule) -> bool {
        self.enabled
            .get(&rule)
            .copied()
            .unwrap_or_else(|| rule.default_enabled())
    }

    pub fn set(&mut self, rule: TraversalRule, enabled: bool) {
        self.enabled.insert(rule, enabled);
    }

    pub fn with(mut self, rule: TraversalRule, enabled: bool) -> Self {
        self.set(rule, enabled);
        self
    }

    /// Rules currently switched on, in enumeration order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = TraversalRule> + '_ {
        TraversalRule::ALL
            .into_iter()
            .filter(move |rule| self.is_enabled(*rule))
    }

    /// True if every rule enabled here is also enabled in `other`.
    pub fn is_subset_of(&self, other: &RuleSet) -> bool {
        self.enabled_rules().all(|rule| other.is_enabled(rule))
    }

    /// Iterate `(rule, enabled)` pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (TraversalRule, bool)> + '_ {
        TraversalRule::ALL
            .into_iter()
            .map(move |rule| (rule, self.is_enabled(rule)))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            enabled: TraversalRule::ALL
                .iter()
                .map(|r| (*r, r.default_enabled()))
                .collect(),
        }
    }
}

impl From<RuleSet> for BTreeMap<TraversalRule, bool> {
    fn from(set: RuleSet) -> Self {
        set.iter().collect()
    }
}

impl From<BTreeMap<TraversalRule, bool>> for RuleSet {
    fn from(map: BTreeMap<TraversalRule, bool>) -> Self {
        let mut set = RuleSet::default();
        for (rule, enabled) in map {
            set.set(rule, enabled);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_deletion_policy() {
        let set = RuleSet::default();
        assert!(set.is_enabled(TraversalRule::CallCalcBackward));
        assert!(set.is_enabled(TraversalRule::InputCalcForward));
        assert!(set.is_enabled(TraversalRule::CreateBackward));
        assert!(set.is_enabled(TraversalRule::ReturnBackward));
        assert!(set.is_enabled(TraversalRule::CreateForward));
        assert!(!set.is_enabled(TraversalRule::CallCalcForward));
        assert!(!set.is_enabled(TraversalRule::CallWorkForward));
        assert!(!set.is_enabled(TraversalRule::InputWorkBackward));
        assert!(!set.is_enabled(TraversalRule::ReturnForward));
        assert!(!set.is_enabled(TraversalRule::InputCalcBackward));
    }

    #[test]
    fn validate_accepts_known_names() {
        assert!(RuleSet::validate(["create_forward", "call-work-forward"]).is_ok());
        assert!(RuleSet::validate(Vec::<String>::new()).is_ok());
    }

    #[test]
    fn validate_collects_every_unknown_name() {
        let err = RuleSet::validate(["create_forward", "foo", "bar"]).unwrap_err();
        assert_eq!(
            err,
            RuleError::UnknownRule {
                names: vec!["foo".into(), "bar".into()]
            }
        );
    }

    #[test]
    fn resolve_applies_overrides_over_defaults() {
        let set = RuleSet::resolve([("create_forward", false), ("call_calc_forward", true)]).unwrap();
        assert!(!set.is_enabled(TraversalRule::CreateForward));
        assert!(set.is_enabled(TraversalRule::CallCalcForward));
        assert!(set.is_enabled(TraversalRule::InputCalcForward));
    }

    #[test]
    fn resolve_rejects_unknown_before_applying() {
        let result = RuleSet::resolve([("create_forward", false), ("nope", true)]);
        assert!(matches!(result, Err(RuleError::UnknownRule { .. })));
    }

    #[test]
    fn resolve_allows_non_toggleable_overrides() {
        let set = RuleSet::resolve([("input_calc_forward", false)]).unwrap();
        assert!(!set.is_enabled(TraversalRule::InputCalcForward));
    }

    #[test]
    fn resolve_strict_rejects_non_toggleable_changes() {
        let err = RuleSet::resolve_strict([("input_calc_forward", false)]).unwrap_err();
        assert_eq!(
            err,
            RuleError::NotToggleable {
                rule: TraversalRule::InputCalcForward,
                default: true
            }
        );
        // Restating the default is fine.
        assert!(RuleSet::resolve_strict([("input_calc_forward", true)]).is_ok());
        assert!(RuleSet::resolve_strict([("call_work_forward", true)]).is_ok());
    }

    #[test]
    fn subset_ordering() {
        let none = RuleSet::none();
        let defaults = RuleSet::default();
        let wider = RuleSet::default().with(TraversalRule::CallCalcForward, true);
        assert!(none.is_subset_of(&defaults));
        assert!(defaults.is_subset_of(&wider));
        assert!(!wider.is_subset_of(&defaults));
    }

    #[test]
    fn serializes_as_name_map() {
        let json = serde_json::to_value(RuleSet::default()).unwrap();
        assert_eq!(json["create_forward"], serde_json::json!(true));
        assert_eq!(json["call_work_forward"], serde_json::json!(false));

        let parsed: RuleSet =
            serde_json::from_value(serde_json::json!({ "create_forward": false })).unwrap();
        assert!(!parsed.is_enabled(TraversalRule::CreateForward));
        assert!(parsed.is_enabled(TraversalRule::CreateBackward));
    }
}
