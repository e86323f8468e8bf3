//! Static cost analysis for GraphQL queries.
//!
//! Estimates the cost of a query before it is executed so that deeply nested or
//! overly broad queries can be rejected up front.
//!
//! # Features
//!
//! - Per-field cost overrides keyed by `TypeName.fieldName`
//! - Depth-relative cost multiplier
//! - List multiplier for fields taking `first`, `last` or `limit`
//! - Optional ceilings on total cost and nesting depth
//! - Middleware binding for a fixed configuration
//!
//! # Example
//!
//! ```
//! use graphql_cost_analysis::{analyze, CostConfig};
//!
//! let config = CostConfig::default().with_field_cost("Query.users", 10.0);
//! let result = analyze("query { users { name } }", &config).unwrap();
//!
//! assert_eq!(result.cost, 11.0);
//! assert_eq!(result.depth, 2);
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod middleware;
pub mod parser;

pub use analyzer::{analyze, analyze_document, AnalysisResult, Query};
pub use config::{Config, CostConfig};
pub use error::{AnalysisError, CostLimitExceeded, DepthLimitExceeded, Violation, ViolationCode};
pub use middleware::{create_middleware, CostMiddleware};
