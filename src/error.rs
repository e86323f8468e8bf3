//! Error types, limit faults, and GraphQL-compliant error responses.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Raised after traversal when the total cost is strictly above the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Query cost of {cost} exceeds maximum allowed cost of {max_cost}")]
pub struct CostLimitExceeded {
    /// Total cost of the query
    pub cost: f64,
    /// Configured ceiling
    pub max_cost: f64,
}

impl CostLimitExceeded {
    pub fn new(cost: f64, max_cost: f64) -> Self {
        Self { cost, max_cost }
    }
}

/// Raised as soon as the live nesting depth is strictly above the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Query depth of {depth} exceeds maximum allowed depth of {max_depth}")]
pub struct DepthLimitExceeded {
    /// Nesting depth at the point of violation
    pub depth: usize,
    /// Configured ceiling
    pub max_depth: usize,
}

impl DepthLimitExceeded {
    pub fn new(depth: usize, max_depth: usize) -> Self {
        Self { depth, max_depth }
    }
}

/// A single diagnostic reported by the GraphQL parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {index}")]
pub struct SyntaxError {
    /// Parser message
    pub message: String,
    /// Byte offset into the query text
    pub index: usize,
}

/// The query text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.errors))]
pub struct ParseError {
    pub errors: Vec<SyntaxError>,
}

fn summarize(errors: &[SyntaxError]) -> String {
    match errors {
        [] => "invalid GraphQL document".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// Failure of a single cost analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    CostLimit(#[from] CostLimitExceeded),

    #[error(transparent)]
    DepthLimit(#[from] DepthLimitExceeded),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl AnalysisError {
    /// Convert into a reportable violation.
    pub fn to_violation(&self) -> Violation {
        match self {
            Self::CostLimit(e) => Violation::cost_exceeded(e.cost, e.max_cost),
            Self::DepthLimit(e) => Violation::depth_exceeded(e.depth, e.max_depth),
            Self::Parse(e) => Violation::parse_error(&e.to_string()),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Violation codes surfaced to GraphQL clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    /// Query depth exceeds limit
    DepthExceeded,
    /// Query cost exceeds limit
    CostExceeded,
    /// GraphQL parse error
    ParseError,
    /// Invalid request format
    InvalidRequest,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepthExceeded => "DEPTH_EXCEEDED",
            Self::CostExceeded => "COST_EXCEEDED",
            Self::ParseError => "PARSE_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rejected query, ready to be rendered as a GraphQL error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub code: ViolationCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ViolationExtensions>,
}

/// Measured value and limit attached to a violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationExtensions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Violation {
    pub fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: ViolationExtensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn depth_exceeded(actual: usize, max: usize) -> Self {
        Self::new(
            ViolationCode::DepthExceeded,
            DepthLimitExceeded::new(actual, max).to_string(),
        )
        .with_extensions(ViolationExtensions {
            actual: Some(actual as f64),
            max: Some(max as f64),
        })
    }

    pub fn cost_exceeded(actual: f64, max: f64) -> Self {
        Self::new(
            ViolationCode::CostExceeded,
            CostLimitExceeded::new(actual, max).to_string(),
        )
        .with_extensions(ViolationExtensions {
            actual: Some(actual),
            max: Some(max),
        })
    }

    pub fn parse_error(message: &str) -> Self {
        Self::new(ViolationCode::ParseError, message)
    }

    pub fn invalid_request(message: &str) -> Self {
        Self::new(ViolationCode::InvalidRequest, message)
    }
}

impl From<&AnalysisError> for Violation {
    fn from(error: &AnalysisError) -> Self {
        error.to_violation()
    }
}

/// Build a GraphQL-compliant error response.
///
/// GraphQL errors are returned with HTTP 200 and an `errors` array in the body.
pub fn graphql_error_response(violations: &[Violation]) -> Value {
    json!({
        "errors": violations.iter().map(|v| {
            let mut error = json!({
                "message": v.message,
                "extensions": {
                    "code": v.code.as_str(),
                }
            });

            if let Some(ext) = &v.extensions {
                if let Some(actual) = ext.actual {
                    error["extensions"]["actual"] = json!(actual);
                }
                if let Some(max) = ext.max {
                    error["extensions"]["max"] = json!(max);
                }
            }

            error
        }).collect::<Vec<_>>()
    })
}
