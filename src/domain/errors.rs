use thiserror::Error;

/// Errors surfaced by formula evaluation and the worksheet workflow.
///
/// Most evaluation problems are not errors at all: division by zero yields
/// `Infinity`/`NaN` and unknown functions are left verbatim in the result.
/// Only conditions the caller must tell apart from a literal value end up here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Invalid cell reference: {0}")]
    InvalidCellReference(String),

    /// The formula refers to a cell the lookup does not know about.
    #[error("Reference to missing cell: {0}")]
    MissingCell(String),

    /// The formula written into a cell refers to that same cell.
    #[error("Formula in {0} refers to itself")]
    SelfReference(String),

    #[error("Invalid formula: {0}")]
    InvalidFormula(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
