//! Formula evaluation services.
//!
//! This module provides the entry point that turns a formula string and a cell
//! snapshot into the text a cell displays.

use tracing::{debug, trace};

use super::errors::DomainResult;
use super::functions::FunctionRegistry;
use super::models::{CellId, CellLookup, Value};
use super::parser::{ExpressionEvaluator, Expr, Parser};

/// Evaluates formulas against a read-only snapshot of cell contents.
///
/// The formula is given without its leading `=`. Evaluation is a pure function
/// of the formula and the snapshot: the lookup is only read.
///
/// Supported features:
/// - Arithmetic: `+ - * /` with `*` and `/` binding tighter
/// - Cell references `A1`..`J99` and ranges such as `A1:B3`
/// - The built-in functions of [`FunctionRegistry`]
/// - Parenthesised groups and comma-separated lists
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use sheetcalc::domain::FormulaEvaluator;
///
/// let mut cells: HashMap<String, String> = HashMap::new();
/// cells.insert("A1".to_string(), "1".to_string());
/// cells.insert("B1".to_string(), "2".to_string());
/// cells.insert("A2".to_string(), "3".to_string());
/// cells.insert("B2".to_string(), "4".to_string());
///
/// let evaluator = FormulaEvaluator::new(&cells);
/// assert_eq!(evaluator.evaluate("2+3*4").unwrap(), "14");
/// assert_eq!(evaluator.evaluate("sum(A1:B2)").unwrap(), "10");
/// assert_eq!(evaluator.evaluate("increment(1,2,3)").unwrap(), "2,3,4");
/// ```
pub struct FormulaEvaluator<'a, L: CellLookup + ?Sized> {
    lookup: &'a L,
    function_registry: &'a FunctionRegistry,
}

impl<'a, L: CellLookup + ?Sized> FormulaEvaluator<'a, L> {
    /// Creates an evaluator over `lookup` using the built-in functions.
    pub fn new(lookup: &'a L) -> Self {
        Self::with_registry(lookup, FunctionRegistry::builtin())
    }

    pub fn with_registry(lookup: &'a L, function_registry: &'a FunctionRegistry) -> Self {
        Self {
            lookup,
            function_registry,
        }
    }

    /// Evaluates a formula and returns the text of its result.
    ///
    /// Text that is already a plain literal, or that does not parse as a formula,
    /// comes back exactly as written. Unknown functions are left in place with
    /// their arguments evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::MissingCell`](super::errors::DomainError::MissingCell)
    /// when the formula refers to a cell the lookup does not have.
    pub fn evaluate(&self, formula: &str) -> DomainResult<String> {
        let expr = match parse(formula) {
            Ok(expr) => expr,
            Err(err) => {
                debug!(formula, error = %err, "formula left as written");
                return Ok(formula.to_string());
            }
        };

        if expr.is_literal() {
            return Ok(formula.to_string());
        }

        let value = self.evaluate_expr(&expr)?;
        trace!(formula, result = %value, "formula evaluated");
        Ok(value.to_string())
    }

    /// Evaluates a parsed formula to a typed value.
    pub fn evaluate_expr(&self, expr: &Expr) -> DomainResult<Value> {
        ExpressionEvaluator::new(self.lookup, self.function_registry).evaluate(expr)
    }
}

/// Checks whether a formula reads `cell`, directly or through a range.
///
/// Only the formula's own references are inspected; cycles through other
/// cells are not followed. A formula that does not parse reads nothing.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::{references_cell, CellId};
///
/// let a1: CellId = "A1".parse().unwrap();
/// assert!(references_cell("A1+1", a1));
/// assert!(references_cell("sum(A1:B2)", a1));
/// assert!(!references_cell("B1+1", a1));
/// ```
pub fn references_cell(formula: &str, cell: CellId) -> bool {
    parse(formula)
        .map(|expr| expr.cell_references().contains(&cell))
        .unwrap_or(false)
}

fn parse(formula: &str) -> DomainResult<Expr> {
    Parser::new(formula)?.parse()
}
