//! Middleware binding the analyzer to a fixed configuration.
//!
//! [`create_middleware`] returns a plain closure over a cost configuration.
//! [`CostMiddleware`] is the same binding with request-level handling on top:
//! body size limits, JSON request bodies (single or batched) and the configured
//! fail action.

use crate::analyzer::{analyze, AnalysisResult};
use crate::config::{Config, CostConfig, FailAction};
use crate::error::{graphql_error_response, AnalysisError, Violation};
use crate::parser::parse_request;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bind `config` into a reusable analysis function.
///
/// `create_middleware(config)(query)` is equivalent to `analyze(query, &config)`.
pub fn create_middleware(
    config: CostConfig,
) -> impl Fn(&str) -> Result<AnalysisResult, AnalysisError> + Clone + Send + Sync {
    CostMiddleware::new(Config {
        cost: config,
        ..Default::default()
    })
    .into_fn()
}

/// Analyzer with a captured, read-only configuration.
#[derive(Debug, Clone)]
pub struct CostMiddleware {
    config: Arc<Config>,
}

impl CostMiddleware {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze a single query with the captured configuration.
    pub fn analyze(&self, query: &str) -> Result<AnalysisResult, AnalysisError> {
        analyze(query, &self.config.cost)
    }

    pub fn into_fn(
        self,
    ) -> impl Fn(&str) -> Result<AnalysisResult, AnalysisError> + Clone + Send + Sync {
        move |query: &str| self.analyze(query)
    }

    /// Analyze a GraphQL-over-HTTP JSON body.
    ///
    /// Every query of a batch is analyzed; all violations are collected.
    pub fn check_request(&self, body: &[u8]) -> RequestOutcome {
        let settings = &self.config.settings;
        let mut outcome = RequestOutcome::default();

        if body.len() > settings.max_body_size {
            outcome.violations.push(Violation::invalid_request(&format!(
                "Request body too large: {} bytes (max: {})",
                body.len(),
                settings.max_body_size
            )));
            return self.finish(outcome);
        }

        let requests = match parse_request(body) {
            Ok(requests) => requests,
            Err(violation) => {
                outcome.violations.push(violation);
                return self.finish(outcome);
            }
        };

        for (idx, request) in requests.iter().enumerate() {
            match self.analyze(&request.query) {
                Ok(result) => {
                    debug!(
                        index = idx,
                        operation_name = ?request.operation_name,
                        cost = result.cost,
                        depth = result.depth,
                        "GraphQL query passed cost analysis"
                    );
                    outcome.results.push(result);
                }
                Err(error) => {
                    warn!(
                        index = idx,
                        operation_name = ?request.operation_name,
                        error = %error,
                        "GraphQL query rejected by cost analysis"
                    );
                    outcome.violations.push(error.to_violation());
                }
            }
        }

        self.finish(outcome)
    }

    fn finish(&self, mut outcome: RequestOutcome) -> RequestOutcome {
        if !outcome.has_violations() {
            return outcome;
        }

        match self.config.settings.fail_action {
            FailAction::Block => outcome.blocked = true,
            FailAction::Allow => {
                info!(
                    violation_count = outcome.violations.len(),
                    "Violations detected but allowing request (fail_action=allow)"
                );
            }
        }
        outcome
    }
}

/// Result of checking a request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOutcome {
    /// Results of the queries that passed, in request order
    pub results: Vec<AnalysisResult>,
    /// Violations of the queries that failed
    pub violations: Vec<Violation>,
    blocked: bool,
}

impl RequestOutcome {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether the request should be rejected under the configured fail action.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// GraphQL error body for the collected violations, if any.
    pub fn error_response(&self) -> Option<Value> {
        self.has_violations()
            .then(|| graphql_error_response(&self.violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsConfig;
    use crate::error::{CostLimitExceeded, ViolationCode};

    fn test_config() -> Config {
        Config {
            settings: SettingsConfig {
                max_body_size: 1_048_576,
                fail_action: FailAction::Block,
            },
            cost: CostConfig::default()
                .with_max_cost(10.0)
                .with_max_depth(3),
        }
    }

    #[test]
    fn test_create_middleware_matches_analyze() {
        let config = CostConfig::default()
            .with_field_cost("Query.users", 10.0)
            .with_max_cost(20.0)
            .with_max_depth(3);
        let middleware = create_middleware(config.clone());

        for query in [
            "query { version }",
            "query { users(first: 10) { name } }",
            "query { users { name } }",
            "{ a { b { c { d } } } }",
            "{ a b c d e f g h i j k l m n o p q r s t u v }",
            "query {",
        ] {
            assert_eq!(middleware(query), analyze(query, &config), "{}", query);
        }
    }

    #[test]
    fn test_middleware_is_reusable_across_threads() {
        let middleware = create_middleware(CostConfig::default().with_max_cost(3.0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let middleware = middleware.clone();
                std::thread::spawn(move || middleware("{ a b c d e }"))
            })
            .collect();

        for handle in handles {
            let err = handle.join().unwrap().unwrap_err();
            assert_eq!(err, AnalysisError::CostLimit(CostLimitExceeded::new(5.0, 3.0)));
        }
    }

    #[test]
    fn test_check_valid_request() {
        let middleware = CostMiddleware::new(test_config());
        let outcome = middleware.check_request(br#"{"query": "{ users { id name } }"}"#);

        assert!(!outcome.has_violations());
        assert!(!outcome.is_blocked());
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].cost, 3.0);
        assert!(outcome.error_response().is_none());
    }

    #[test]
    fn test_check_depth_exceeded() {
        let middleware = CostMiddleware::new(test_config());
        let outcome = middleware.check_request(br#"{"query": "{ a { b { c { d } } } }"}"#);

        assert!(outcome.is_blocked());
        assert_eq!(outcome.violations[0].code, ViolationCode::DepthExceeded);

        let response = outcome.error_response().unwrap();
        assert_eq!(response["errors"][0]["extensions"]["actual"], 4.0);
        assert_eq!(response["errors"][0]["extensions"]["max"], 3.0);
    }

    #[test]
    fn test_check_batch_collects_every_violation() {
        let middleware = CostMiddleware::new(test_config());
        let body = br#"[
            {"query": "{ a }"},
            {"query": "{ a b c d e f g h i j k }"},
            {"query": "{ a {"}
        ]"#;
        let outcome = middleware.check_request(body);

        assert!(outcome.is_blocked());
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.violations.len(), 2);
        assert_eq!(outcome.violations[0].code, ViolationCode::CostExceeded);
        assert_eq!(outcome.violations[1].code, ViolationCode::ParseError);
    }

    #[test]
    fn test_check_invalid_json() {
        let middleware = CostMiddleware::new(test_config());
        let outcome = middleware.check_request(b"not json");

        assert!(outcome.is_blocked());
        assert_eq!(outcome.violations[0].code, ViolationCode::InvalidRequest);
    }

    #[test]
    fn test_body_size_limit() {
        let mut config = test_config();
        config.settings.max_body_size = 10;
        let middleware = CostMiddleware::new(config);
        let outcome = middleware.check_request(br#"{"query": "{ users { id name email } }"}"#);

        assert!(outcome.is_blocked());
        assert_eq!(outcome.violations[0].code, ViolationCode::InvalidRequest);
        assert!(outcome.violations[0].message.contains("too large"));
    }

    #[test]
    fn test_fail_action_allow() {
        let mut config = test_config();
        config.settings.fail_action = FailAction::Allow;
        let middleware = CostMiddleware::new(config);
        let outcome = middleware.check_request(br#"{"query": "{ a { b { c { d } } } }"}"#);

        assert!(outcome.has_violations());
        assert!(!outcome.is_blocked());
    }
}
