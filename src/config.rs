//! Configuration documents.
//!
//! Two documents are understood:
//!
//! - [`RulesConfig`]: the runtime checks evaluated against live port values
//! - [`SimulationParams`]: how long to run and what to report
//!
//! # Rule Document Structure
//!
//! ```yaml
//! vars:
//!   total: "sum(top.proc.out[0:3])"
//!
//! rules:
//!   overflow:
//!     expr: "total > 100"
//!     level: error
//!   busy:
//!     expr: "top.proc.out[0:3] == {1,2,3}"
//!     level: info
//! ```
//!
//! Variables and rules are kept in document order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::types::SimTime;

/// Errors that can occur while loading a configuration document.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// What happens when a rule evaluates to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Log a notice and keep going.
    Info,
    /// Abort the run.
    Error,
}

impl Severity {
    pub fn parse(level: &str) -> Option<Self> {
        match level {
            "info" => Some(Severity::Info),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Error => "error",
        }
    }
}

/// One entry of the `rules` map.
///
/// Both fields are optional at the serde level so that a missing field is
/// reported by [`RulesConfig::validate`] with the rule's name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl RuleSpec {
    pub fn new(expr: impl Into<String>, severity: Severity) -> Self {
        Self {
            expr: Some(expr.into()),
            level: Some(severity.as_str().to_string()),
        }
    }

    /// The parsed level, if present and valid.
    pub fn severity(&self) -> Option<Severity> {
        self.level.as_deref().and_then(Severity::parse)
    }
}

/// The rule document: named variables and named rules.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Variable name to expression
    #[serde(default)]
    pub vars: IndexMap<String, String>,

    /// Rule name to expression and level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<IndexMap<String, RuleSpec>>,
}

impl RulesConfig {
    /// Creates an empty document with an empty `rules` map.
    pub fn new() -> Self {
        Self {
            vars: IndexMap::new(),
            rules: Some(IndexMap::new()),
        }
    }

    /// Adds a variable.
    pub fn with_var(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.vars.insert(name.into(), expr.into());
        self
    }

    /// Adds a rule.
    pub fn with_rule(
        mut self,
        name: impl Into<String>,
        expr: impl Into<String>,
        severity: Severity,
    ) -> Self {
        self.rules
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), RuleSpec::new(expr, severity));
        self
    }

    /// Loads a rule document from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: RulesConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a rule document from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: RulesConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a rule document from an already-parsed tree.
    pub fn from_value(value: serde_json::Value) -> ConfigResult<Self> {
        let config: RulesConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a rule document from a file, detecting the format from its
    /// extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(&std::fs::read_to_string(path)?),
            "json" => Self::from_json(&std::fs::read_to_string(path)?),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Checks the document shape. Every message names the offending item.
    pub fn validate(&self) -> ConfigResult<()> {
        let rules = self
            .rules
            .as_ref()
            .ok_or_else(|| ConfigError::Validation("'rules' element not found".into()))?;

        for name in self.vars.keys() {
            if !is_valid_name(name) {
                return Err(ConfigError::Validation(format!(
                    "invalid variable name '{}'",
                    name
                )));
            }
            if is_reserved_name(name) {
                return Err(ConfigError::Validation(format!(
                    "variable name '{}' is reserved",
                    name
                )));
            }
        }

        for (name, spec) in rules {
            if !is_valid_name(name) {
                return Err(ConfigError::Validation(format!("invalid rule name '{}'", name)));
            }
            if self.vars.contains_key(name) {
                return Err(ConfigError::Validation(format!(
                    "rule '{}' has the same name as a variable",
                    name
                )));
            }
            if spec.expr.is_none() {
                return Err(ConfigError::Validation(format!(
                    "'expr' element not found ({} rule)",
                    name
                )));
            }
            match spec.level.as_deref() {
                None => {
                    return Err(ConfigError::Validation(format!(
                        "'level' element not found ({} rule)",
                        name
                    )));
                }
                Some(level) if Severity::parse(level).is_none() => {
                    return Err(ConfigError::Validation(format!(
                        "'level' must be 'info' or 'error' ({} rule)",
                        name
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Number of declared rules.
    pub fn rule_count(&self) -> usize {
        self.rules.as_ref().map_or(0, IndexMap::len)
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Variable and rule names: ASCII letters, digits and underscores.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Aggregate functions and boolean literals; a variable with one of these
/// names could never be referenced.
pub const RESERVED_NAMES: &[&str] = &["sum", "max", "min", "true", "false"];

pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Parameters of one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Maximum number of cycles; unbounded when absent
    #[serde(default)]
    pub iterations: Option<u64>,

    /// Logical time to simulate. Combined with `iterations`, the run stops
    /// at whichever limit is reached first.
    #[serde(default)]
    pub time_budget: Option<SimTime>,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect detailed statistics
    #[serde(default)]
    pub collect_stats: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            iterations: None,
            time_budget: None,
            log_level: default_log_level(),
            collect_stats: false,
        }
    }
}

impl SimulationParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the iteration budget.
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Sets the time budget.
    pub fn time_budget(mut self, duration: SimTime) -> Self {
        self.time_budget = Some(duration);
        self
    }

    /// Enables statistics collection.
    pub fn collect_stats(mut self, enable: bool) -> Self {
        self.collect_stats = enable;
        self
    }

    /// Loads parameters from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let params: SimulationParams = serde_yaml::from_str(yaml)?;
        params.validate()?;
        Ok(params)
    }

    /// Loads parameters from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let params: SimulationParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(budget) = self.time_budget {
            if budget.is_nan() || budget < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "time_budget must be a non-negative number, got {}",
                    budget
                )));
            }
        }
        Ok(())
    }
}
