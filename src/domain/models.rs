use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::sequence::{char_range, range};

pub const FIRST_COLUMN: char = 'A';
pub const LAST_COLUMN: char = 'J';
pub const FIRST_ROW: u8 = 1;
pub const LAST_ROW: u8 = 99;

/// Address of a single grid cell, `A1` through `J99`.
///
/// Ordering is row-major: every cell of row 1 sorts before any cell of row 2.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::CellId;
///
/// let id: CellId = "b12".parse().unwrap();
/// assert_eq!(id.column(), 'B');
/// assert_eq!(id.row(), 12);
/// assert_eq!(id.to_string(), "B12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CellId {
    row: u8,
    column: char,
}

impl CellId {
    /// Builds a cell id, or `None` when the coordinates fall outside the grid.
    pub fn new(column: char, row: u8) -> Option<Self> {
        let column = column.to_ascii_uppercase();
        let in_grid = (FIRST_COLUMN..=LAST_COLUMN).contains(&column)
            && (FIRST_ROW..=LAST_ROW).contains(&row);
        in_grid.then_some(Self { row, column })
    }

    /// Parses a reference made of one column letter and a row without leading zero.
    pub fn parse(reference: &str) -> Option<Self> {
        let mut chars = reference.chars();
        let column = chars.next()?;
        let digits = chars.as_str();

        if digits.is_empty()
            || digits.len() > 2
            || digits.starts_with('0')
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        Self::new(column, digits.parse().ok()?)
    }

    pub fn column(&self) -> char {
        self.column
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    /// Zero-based column index, `A` being 0.
    pub fn column_index(&self) -> usize {
        (self.column as u8 - FIRST_COLUMN as u8) as usize
    }

    /// Every cell of the grid, row by row.
    pub fn all() -> Vec<CellId> {
        let (first, last) = (Self::first(), Self::last());
        Self::span(first, last)
    }

    /// Cells of the rectangle spanned by two corners, row by row and left to right
    /// within a row. Corners given in reverse order span nothing.
    pub fn span(start: CellId, end: CellId) -> Vec<CellId> {
        let columns = char_range(start.column, end.column);
        range(start.row as i64, end.row as i64)
            .into_iter()
            .flat_map(|row| {
                columns
                    .iter()
                    .filter_map(move |&column| CellId::new(column, row as u8))
            })
            .collect()
    }

    fn first() -> Self {
        Self { row: FIRST_ROW, column: FIRST_COLUMN }
    }

    fn last() -> Self {
        Self { row: LAST_ROW, column: LAST_COLUMN }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for CellId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DomainError::InvalidCellReference(s.to_string()))
    }
}

impl From<CellId> for String {
    fn from(id: CellId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for CellId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Contents of a worksheet cell: the displayed value and, for formula cells,
/// the formula it was computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    pub value: String,
    pub formula: Option<String>,
}

/// Read access to a snapshot of cell contents.
///
/// `None` means the cell does not exist, which fails the evaluation that asked for it.
pub trait CellLookup {
    fn cell_text(&self, id: CellId) -> Option<String>;
}

impl<T: CellLookup + ?Sized> CellLookup for &T {
    fn cell_text(&self, id: CellId) -> Option<String> {
        (**self).cell_text(id)
    }
}

impl CellLookup for HashMap<CellId, String> {
    fn cell_text(&self, id: CellId) -> Option<String> {
        self.get(&id).cloned()
    }
}

impl CellLookup for HashMap<String, String> {
    fn cell_text(&self, id: CellId) -> Option<String> {
        self.get(&id.to_string()).cloned()
    }
}

/// Result of evaluating a formula or any part of one.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    List(Vec<f64>),
    /// Raw cell text, converted to numbers only when something consumes it.
    Text(String),
    /// Formula text that could not be resolved and is carried through verbatim.
    Unresolved(String),
}

impl Value {
    /// Numeric view of the value; `None` for unresolved text.
    ///
    /// Text is split on commas and every part parsed leniently, so `"1,2"` is two
    /// numbers and `"abc"` is a single NaN.
    pub fn to_numbers(&self) -> Option<Vec<f64>> {
        match self {
            Value::Number(n) => Some(vec![*n]),
            Value::List(items) => Some(items.clone()),
            Value::Text(text) => Some(text.split(',').map(parse_number).collect()),
            Value::Unresolved(_) => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Value::Unresolved(_))
    }
}

impl From<Vec<f64>> for Value {
    fn from(items: Vec<f64>) -> Self {
        Value::List(items)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Number(if flag { 1.0 } else { 0.0 })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(|n| format_number(*n)).collect();
                f.write_str(&rendered.join(","))
            }
            Value::Text(text) | Value::Unresolved(text) => f.write_str(text),
        }
    }
}

/// Renders a number the way a spreadsheet cell shows it.
///
/// Integral values have no decimal point, very large or very small magnitudes use
/// exponent notation with an explicit sign, and non-finite values are spelled out.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::format_number;
///
/// assert_eq!(format_number(14.0), "14");
/// assert_eq!(format_number(0.5), "0.5");
/// assert_eq!(format_number(1.0 / 0.0), "Infinity");
/// assert_eq!(format_number(1e21), "1e+21");
/// ```
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{:e}", n);
        match exp.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => exp,
        }
    } else {
        n.to_string()
    }
}

/// Parses the longest numeric prefix of `text`, or NaN when there is none.
///
/// # Examples
///
/// ```
/// use sheetcalc::domain::parse_number;
///
/// assert_eq!(parse_number(" 12.5 "), 12.5);
/// assert_eq!(parse_number("3px"), 3.0);
/// assert!(parse_number("abc").is_nan());
/// ```
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim();

    for (spelling, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if text.starts_with(spelling) {
            return value;
        }
    }

    let candidate_len = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .count();

    (1..=candidate_len)
        .rev()
        .find_map(|len| text[..len].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_id_parse() {
        let id = CellId::parse("A1").unwrap();
        assert_eq!((id.column(), id.row()), ('A', 1));

        let id = CellId::parse("j99").unwrap();
        assert_eq!((id.column(), id.row()), ('J', 99));
        assert_eq!(id.column_index(), 9);
    }

    #[test]
    fn test_cell_id_rejects_outside_grid() {
        assert!(CellId::parse("K1").is_none());
        assert!(CellId::parse("A0").is_none());
        assert!(CellId::parse("A100").is_none());
        assert!(CellId::parse("A01").is_none());
        assert!(CellId::parse("AA1").is_none());
        assert!(CellId::parse("A").is_none());
        assert!(CellId::parse("").is_none());
    }

    #[test]
    fn test_cell_id_from_str_error() {
        let err = "Z9".parse::<CellId>().unwrap_err();
        assert_eq!(err, DomainError::InvalidCellReference("Z9".to_string()));
    }

    #[test]
    fn test_cell_id_ordering_is_row_major() {
        let mut ids = vec![
            CellId::parse("A2").unwrap(),
            CellId::parse("B1").unwrap(),
            CellId::parse("A1").unwrap(),
        ];
        ids.sort();
        let labels: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(labels, vec!["A1", "B1", "A2"]);
    }

    #[test]
    fn test_span_rectangle() {
        let span = CellId::span(CellId::parse("A1").unwrap(), CellId::parse("B2").unwrap());
        let labels: Vec<String> = span.iter().map(|id| id.to_string()).collect();
        assert_eq!(labels, vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_span_reversed_is_empty() {
        let span = CellId::span(CellId::parse("B2").unwrap(), CellId::parse("A1").unwrap());
        assert!(span.is_empty());
    }

    #[test]
    fn test_all_cells() {
        let all = CellId::all();
        assert_eq!(all.len(), 10 * 99);
        assert_eq!(all.first().unwrap().to_string(), "A1");
        assert_eq!(all.last().unwrap().to_string(), "J99");
    }

    #[test]
    fn test_cell_id_serde_as_string() {
        let id = CellId::parse("C7").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"C7\"");
        let back: CellId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<CellId>("\"K7\"").is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-5.0), "-5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(1.5e21), "1.5e+21");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(2000000000000.0), "2000000000000");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), 42.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert_eq!(parse_number("1e+21"), 1e21);
        assert_eq!(parse_number("1.2.3"), 1.2);
        assert_eq!(parse_number("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_number("").is_nan());
        assert!(parse_number("x1").is_nan());
    }

    #[test]
    fn test_value_to_numbers() {
        assert_eq!(Value::Number(3.0).to_numbers(), Some(vec![3.0]));
        assert_eq!(Value::Text("1, 2,3".to_string()).to_numbers(), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(Value::Unresolved("foo(1)".to_string()).to_numbers(), None);

        let blank = Value::Text(String::new()).to_numbers().unwrap();
        assert_eq!(blank.len(), 1);
        assert!(blank[0].is_nan());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::List(vec![2.0, 3.0, 4.0]).to_string(), "2,3,4");
        assert_eq!(Value::List(vec![]).to_string(), "");
        assert_eq!(Value::from(true).to_string(), "1");
        assert_eq!(Value::Text("hello".to_string()).to_string(), "hello");
    }

    #[test]
    fn test_lookup_impls() {
        let id = CellId::parse("A1").unwrap();

        let mut by_id = HashMap::new();
        by_id.insert(id, "5".to_string());
        assert_eq!(by_id.cell_text(id), Some("5".to_string()));

        let mut by_label: HashMap<String, String> = HashMap::new();
        by_label.insert("A1".to_string(), "6".to_string());
        assert_eq!(by_label.cell_text(id), Some("6".to_string()));
        assert_eq!(by_label.cell_text(CellId::parse("B1").unwrap()), None);
    }
}
