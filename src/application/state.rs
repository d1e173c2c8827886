//! Worksheet state and the cell update workflow.
//!
//! The worksheet owns the grid and decides what happens when a cell receives new
//! input: plain text is stored as typed, formulas are evaluated against the
//! current contents of the other cells.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{
    references_cell, CellData, CellId, CellLookup, DomainError, DomainResult, FormulaEvaluator,
};

/// What an accepted update did to the cell.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The input was stored as typed.
    Literal,
    /// The input was a formula and the cell now shows its result.
    Evaluated { value: String },
}

/// Outcome of one input applied through [`Worksheet::apply_inputs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Literal,
    Evaluated,
    Rejected,
}

/// Serializable record of one applied input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellReport {
    pub cell: CellId,
    pub input: String,
    /// Value the cell shows after the input was applied.
    pub value: String,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A grid of cells `A1` through `J99`.
///
/// Every cell of the grid exists and starts out empty, so formulas evaluated
/// against a worksheet never hit a missing reference. Changing a cell does not
/// recalculate the formulas that read it.
///
/// # Examples
///
/// ```
/// use sheetcalc::application::{UpdateOutcome, Worksheet};
///
/// let mut sheet = Worksheet::new();
/// sheet.update("A1".parse().unwrap(), "4").unwrap();
///
/// let outcome = sheet.update("B1".parse().unwrap(), "= A1 * 2 + 1").unwrap();
/// assert_eq!(outcome, UpdateOutcome::Evaluated { value: "9".to_string() });
/// assert_eq!(sheet.value("B1".parse().unwrap()), "9");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    cells: BTreeMap<CellId, CellData>,
}

impl Worksheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, id: CellId) -> CellData {
        self.cells.get(&id).cloned().unwrap_or_default()
    }

    /// Text the cell currently shows.
    pub fn value(&self, id: CellId) -> &str {
        self.cells.get(&id).map_or("", |cell| cell.value.as_str())
    }

    /// Non-empty cells in row-major order.
    pub fn filled_cells(&self) -> impl Iterator<Item = (CellId, &CellData)> {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.value.is_empty())
            .map(|(id, cell)| (*id, cell))
    }

    /// Applies new input to a cell.
    ///
    /// All whitespace is stripped before the input is examined. Input starting
    /// with `=` is a formula: it is evaluated without the `=` and the cell keeps
    /// both the result and the formula. Anything else is stored exactly as given.
    ///
    /// # Errors
    ///
    /// - [`DomainError::SelfReference`] if the formula reads the cell being written,
    ///   directly or through a range. Only the formula's own references are
    ///   checked; a cycle through other cells is not detected.
    /// - [`DomainError::MissingCell`] if evaluation needed a cell that does not exist.
    ///
    /// On error the cell is left unchanged.
    pub fn update(&mut self, id: CellId, input: &str) -> DomainResult<UpdateOutcome> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

        let Some(formula) = compact.strip_prefix('=') else {
            self.set_cell(id, CellData {
                value: input.to_string(),
                formula: None,
            });
            return Ok(UpdateOutcome::Literal);
        };

        if references_cell(formula, id) {
            warn!(cell = %id, formula, "formula refers to its own cell");
            return Err(DomainError::SelfReference(id.to_string()));
        }

        let value = FormulaEvaluator::new(&*self).evaluate(formula)?;
        debug!(cell = %id, formula, value = %value, "cell updated");

        self.set_cell(id, CellData {
            value: value.clone(),
            formula: Some(compact.clone()),
        });
        Ok(UpdateOutcome::Evaluated { value })
    }

    /// Applies inputs in order, as if typed one after another, and reports on each.
    ///
    /// Rejected inputs leave their cell unchanged and carry the error message.
    pub fn apply_inputs<I>(&mut self, inputs: I) -> Vec<CellReport>
    where
        I: IntoIterator<Item = (CellId, String)>,
    {
        inputs
            .into_iter()
            .map(|(cell, input)| {
                let (status, error) = match self.update(cell, &input) {
                    Ok(UpdateOutcome::Literal) => (ReportStatus::Literal, None),
                    Ok(UpdateOutcome::Evaluated { .. }) => (ReportStatus::Evaluated, None),
                    Err(err) => (ReportStatus::Rejected, Some(err.to_string())),
                };

                CellReport {
                    cell,
                    value: self.value(cell).to_string(),
                    input,
                    status,
                    error,
                }
            })
            .collect()
    }

    fn set_cell(&mut self, id: CellId, data: CellData) {
        if data.value.is_empty() && data.formula.is_none() {
            self.cells.remove(&id);
        } else {
            self.cells.insert(id, data);
        }
    }
}

impl CellLookup for Worksheet {
    fn cell_text(&self, id: CellId) -> Option<String> {
        Some(self.value(id).to_string())
    }
}
