//! Deletion configuration
//!
//! ```toml
//! verbosity = 1
//! strict_rules = false
//!
//! [rules]
//! create_forward = true
//! call_calc_forward = false
//! ```

use provenance_rules::{RuleError, RuleSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::console::Verbosity;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [rules] table: {0}")]
    Rules(#[from] RuleError),
}

/// Defaults for the deletion command, usually read from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteConfig {
    /// 0 silent, 1 summary, 2 itemized.
    pub verbosity: Verbosity,

    /// Refuse overrides of rules that are not user-toggleable.
    pub strict_rules: bool,

    /// Rule overrides by name.
    pub rules: BTreeMap<String, bool>,
}

impl DeleteConfig {
    /// Load configuration from file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate rule names.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: DeleteConfig = toml::from_str(contents)?;
        config.rule_set()?;
        Ok(config)
    }

    /// The complete rule table these settings describe.
    pub fn rule_set(&self) -> Result<RuleSet, RuleError> {
        let overrides = self.rules.iter().map(|(name, value)| (name.as_str(), *value));
        if self.strict_rules {
            RuleSet::resolve_strict(overrides)
        } else {
            RuleSet::resolve(overrides)
        }
    }
}
