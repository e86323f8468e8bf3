//! Configuration for the cost analyzer and the request-level middleware.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Request handling settings
    pub settings: SettingsConfig,
    /// Cost analysis settings
    pub cost: CostConfig,
}

impl Config {
    /// Load a configuration file. `.json` files are read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.max_body_size == 0 {
            return Err(ConfigError::Invalid(
                "settings.max_body_size must be greater than zero".to_string(),
            ));
        }
        self.cost.validate()
    }
}

/// What to do with a query that violates a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailAction {
    /// Reject the request
    #[default]
    Block,
    /// Report the violation but let the request through
    Allow,
}

/// Request handling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    pub fail_action: FailAction,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1_048_576,
            fail_action: FailAction::Block,
        }
    }
}

/// Cost analysis settings.
///
/// Every field is optional. Keys may be given in snake_case or camelCase and
/// unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Cost per qualified field name (`TypeName.fieldName`)
    #[serde(alias = "fieldCosts")]
    pub field_costs: HashMap<String, f64>,

    /// Cost of any field not listed in `field_costs`
    #[serde(alias = "defaultCost")]
    pub default_cost: f64,

    /// Multiplier applied as `factor^depth`
    #[serde(alias = "depthCostFactor")]
    pub depth_cost_factor: f64,

    /// Multiplier for fields that take a `first`, `last` or `limit` argument
    #[serde(alias = "listCostFactor")]
    pub list_cost_factor: f64,

    /// Ceiling on the total cost; unchecked when absent
    #[serde(alias = "maxCost", skip_serializing_if = "Option::is_none")]
    pub max_cost: Option<f64>,

    /// Ceiling on the nesting depth; unchecked when absent
    #[serde(alias = "maxDepth", skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            field_costs: HashMap::new(),
            default_cost: 1.0,
            depth_cost_factor: 1.0,
            list_cost_factor: 10.0,
            max_cost: None,
            max_depth: None,
        }
    }
}

impl CostConfig {
    /// Set the cost of a single qualified field.
    pub fn with_field_cost(mut self, field: impl Into<String>, cost: f64) -> Self {
        self.field_costs.insert(field.into(), cost);
        self
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Reject negative or non-finite numbers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("default_cost", self.default_cost)?;
        check_non_negative("depth_cost_factor", self.depth_cost_factor)?;
        check_non_negative("list_cost_factor", self.list_cost_factor)?;

        if let Some(max_cost) = self.max_cost {
            check_non_negative("max_cost", max_cost)?;
        }

        for (field, cost) in &self.field_costs {
            check_non_negative(&format!("field_costs[{}]", field), *cost)?;
        }

        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be a finite, non-negative number (got {})",
            name, value
        )))
    }
}
