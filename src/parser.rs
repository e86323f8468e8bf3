//! GraphQL query and request parsing.

use crate::error::{ParseError, SyntaxError, Violation};
use apollo_parser::{cst, Parser};
use serde::Deserialize;
use serde_json::Value;

/// A successfully parsed GraphQL document.
#[derive(Debug)]
pub struct ParsedDocument {
    pub document: cst::Document,
}

/// Parse GraphQL query text.
///
/// Any diagnostic reported by the parser fails the whole parse.
pub fn parse_query(query: &str) -> Result<ParsedDocument, ParseError> {
    let tree = Parser::new(query).parse();

    let errors: Vec<SyntaxError> = tree
        .errors()
        .map(|e| SyntaxError {
            message: e.message().to_string(),
            index: e.index(),
        })
        .collect();

    if !errors.is_empty() {
        return Err(ParseError { errors });
    }

    Ok(ParsedDocument {
        document: tree.document(),
    })
}

/// A single GraphQL-over-HTTP request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default, rename = "operationName")]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestBody {
    Single(GraphQLRequest),
    Batch(Vec<GraphQLRequest>),
}

/// Parse a JSON request body holding one request or a batch of them.
pub fn parse_request(body: &[u8]) -> Result<Vec<GraphQLRequest>, Violation> {
    let parsed: RequestBody = serde_json::from_slice(body).map_err(|e| {
        Violation::invalid_request(&format!("Invalid GraphQL request body: {}", e))
    })?;

    let requests = match parsed {
        RequestBody::Single(request) => vec![request],
        RequestBody::Batch(requests) => requests,
    };

    if requests.is_empty() {
        return Err(Violation::invalid_request("Empty batch request"));
    }

    Ok(requests)
}
