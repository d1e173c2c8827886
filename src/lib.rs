//! sheetcalc - Spreadsheet Formula Library
//!
//! Evaluates spreadsheet-style formulas (arithmetic, cell references, ranges and
//! a small set of list functions) over a grid of cells `A1` through `J99`.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::*;
