//! Query cost analysis.
//!
//! A single depth-first pass over the document computes the total cost, the
//! deepest selection-set nesting and a per-field cost breakdown. A depth ceiling
//! aborts the pass as soon as it is crossed; a cost ceiling is checked once the
//! total is known.

mod cost;

use crate::config::CostConfig;
use crate::error::{AnalysisError, CostLimitExceeded};
use crate::parser::{parse_query, ParsedDocument};
use apollo_parser::cst;
use cost::CostWalker;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Outcome of a successful analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Sum of every field's cost
    pub cost: f64,
    /// Deepest selection-set nesting; the operation's own selection set is 1
    pub depth: usize,
    /// Accumulated cost per qualified field name
    pub fields: HashMap<String, f64>,
}

/// Input accepted by [`analyze`]: raw query text or an already-parsed document.
#[derive(Clone, Copy)]
pub enum Query<'a> {
    Text(&'a str),
    Document(&'a cst::Document),
}

impl<'a> From<&'a str> for Query<'a> {
    fn from(text: &'a str) -> Self {
        Query::Text(text)
    }
}

impl<'a> From<&'a String> for Query<'a> {
    fn from(text: &'a String) -> Self {
        Query::Text(text)
    }
}

impl<'a> From<&'a cst::Document> for Query<'a> {
    fn from(document: &'a cst::Document) -> Self {
        Query::Document(document)
    }
}

impl<'a> From<&'a ParsedDocument> for Query<'a> {
    fn from(parsed: &'a ParsedDocument) -> Self {
        Query::Document(&parsed.document)
    }
}

/// Analyze a query against `config`.
///
/// Text is parsed first; parser diagnostics surface as [`AnalysisError::Parse`].
pub fn analyze<'a>(
    query: impl Into<Query<'a>>,
    config: &CostConfig,
) -> Result<AnalysisResult, AnalysisError> {
    match query.into() {
        Query::Text(text) => {
            let parsed = parse_query(text)?;
            analyze_document(&parsed.document, config)
        }
        Query::Document(document) => analyze_document(document, config),
    }
}

/// Analyze an already-parsed document against `config`.
pub fn analyze_document(
    document: &cst::Document,
    config: &CostConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let mut walker = CostWalker::new(config);
    walker.walk_document(document)?;

    debug!(
        cost = walker.cost,
        depth = walker.deepest,
        fields = walker.fields.len(),
        "Cost analysis complete"
    );

    if let Some(max_cost) = config.max_cost {
        if walker.cost > max_cost {
            return Err(CostLimitExceeded::new(walker.cost, max_cost).into());
        }
    }

    Ok(AnalysisResult {
        cost: walker.cost,
        depth: walker.deepest,
        fields: walker.fields,
    })
}
