//! Cost traversal.
//!
//! Walks every definition of a document depth-first, attributing a cost to each
//! field under a syntactic type context (`Query`, `Mutation`, `Subscription`, or
//! the capitalized name of the enclosing field).

use crate::config::CostConfig;
use crate::error::DepthLimitExceeded;
use apollo_parser::cst;
use std::collections::HashMap;

/// Arguments whose presence marks a field as returning a sized list.
const LIST_SIZE_ARGUMENTS: [&str; 3] = ["first", "last", "limit"];

/// Type context used when no operation is on the stack (fragment definitions).
const UNKNOWN_TYPE: &str = "Unknown";

/// Mutable state for a single analysis.
pub(crate) struct CostWalker<'c> {
    config: &'c CostConfig,
    type_context: Vec<String>,
    depth: usize,
    pub(crate) deepest: usize,
    pub(crate) cost: f64,
    pub(crate) fields: HashMap<String, f64>,
}

impl<'c> CostWalker<'c> {
    pub(crate) fn new(config: &'c CostConfig) -> Self {
        Self {
            config,
            type_context: Vec::new(),
            depth: 0,
            deepest: 0,
            cost: 0.0,
            fields: HashMap::new(),
        }
    }

    pub(crate) fn walk_document(
        &mut self,
        document: &cst::Document,
    ) -> Result<(), DepthLimitExceeded> {
        for definition in document.definitions() {
            match definition {
                cst::Definition::OperationDefinition(op) => {
                    self.type_context.push(root_type_name(&op).to_string());
                    if let Some(selection_set) = op.selection_set() {
                        self.walk_selection_set(&selection_set)?;
                    }
                    self.type_context.pop();
                }
                cst::Definition::FragmentDefinition(fragment) => {
                    if let Some(selection_set) = fragment.selection_set() {
                        self.walk_selection_set(&selection_set)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn walk_selection_set(
        &mut self,
        selection_set: &cst::SelectionSet,
    ) -> Result<(), DepthLimitExceeded> {
        self.depth += 1;
        self.deepest = self.deepest.max(self.depth);

        if let Some(max_depth) = self.config.max_depth {
            if self.depth > max_depth {
                return Err(DepthLimitExceeded::new(self.depth, max_depth));
            }
        }

        for selection in selection_set.selections() {
            match selection {
                cst::Selection::Field(field) => self.walk_field(&field)?,
                cst::Selection::InlineFragment(inline) => {
                    if let Some(nested) = inline.selection_set() {
                        self.walk_selection_set(&nested)?;
                    }
                }
                // Spreads are not resolved; the definition is walked on its own.
                cst::Selection::FragmentSpread(_) => {}
            }
        }

        self.depth -= 1;
        Ok(())
    }

    fn walk_field(&mut self, field: &cst::Field) -> Result<(), DepthLimitExceeded> {
        let field_name = field
            .name()
            .map(|n| n.text().to_string())
            .unwrap_or_default();

        let type_name = self
            .type_context
            .last()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TYPE);
        let qualified_name = format!("{}.{}", type_name, field_name);

        let field_cost = self.field_cost(&qualified_name, has_list_size_argument(field));
        self.cost += field_cost;
        *self.fields.entry(qualified_name).or_insert(0.0) += field_cost;

        self.type_context.push(capitalize(&field_name));
        if let Some(selection_set) = field.selection_set() {
            self.walk_selection_set(&selection_set)?;
        }
        self.type_context.pop();

        Ok(())
    }

    /// Cost of one field at the current depth.
    fn field_cost(&self, qualified_name: &str, is_list: bool) -> f64 {
        let base = self
            .config
            .field_costs
            .get(qualified_name)
            .copied()
            .unwrap_or(self.config.default_cost);

        let depth_multiplier = if self.config.depth_cost_factor == 1.0 {
            1.0
        } else {
            self.config.depth_cost_factor.powi(self.depth as i32)
        };

        let list_multiplier = if is_list {
            self.config.list_cost_factor
        } else {
            1.0
        };

        base * depth_multiplier * list_multiplier
    }
}

fn root_type_name(op: &cst::OperationDefinition) -> &'static str {
    match op.operation_type() {
        Some(ty) if ty.mutation_token().is_some() => "Mutation",
        Some(ty) if ty.subscription_token().is_some() => "Subscription",
        _ => "Query",
    }
}

fn has_list_size_argument(field: &cst::Field) -> bool {
    let Some(arguments) = field.arguments() else {
        return false;
    };

    arguments.arguments().any(|argument| {
        argument
            .name()
            .is_some_and(|name| LIST_SIZE_ARGUMENTS.contains(&name.text().to_string().as_str()))
    })
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
