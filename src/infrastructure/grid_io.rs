use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;

use crate::application::{CellReport, Worksheet};
use crate::domain::sequence::char_range;
use crate::domain::{CellId, FIRST_COLUMN, LAST_COLUMN};

#[derive(Debug, Error)]
pub enum GridIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A non-empty field lies outside `A1:J99`. Positions are one-based.
    #[error("Field at row {row}, column {column} is outside the grid")]
    OutOfBounds { row: usize, column: usize },
}

/// Reads grids from CSV and writes worksheet values and reports back out.
///
/// A CSV grid has no header row: record `i` is row `i + 1` and field `j` is
/// column `A + j`. Records may differ in length.
pub struct GridRepository;

impl GridRepository {
    /// Reads the non-empty fields of a CSV grid as `(cell, input)` pairs in
    /// row-major order.
    pub fn read_inputs<R: Read>(reader: R) -> Result<Vec<(CellId, String)>, GridIoError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let columns = char_range(FIRST_COLUMN, LAST_COLUMN);

        let mut inputs = Vec::new();
        for (row_index, record) in csv_reader.records().enumerate() {
            let record = record?;
            for (column_index, field) in record.iter().enumerate() {
                if field.trim().is_empty() {
                    continue;
                }

                let id = u8::try_from(row_index + 1)
                    .ok()
                    .zip(columns.get(column_index))
                    .and_then(|(row, &column)| CellId::new(column, row))
                    .ok_or(GridIoError::OutOfBounds {
                        row: row_index + 1,
                        column: column_index + 1,
                    })?;
                inputs.push((id, field.to_string()));
            }
        }

        Ok(inputs)
    }

    pub fn load_inputs(path: &Path) -> Result<Vec<(CellId, String)>, GridIoError> {
        Self::read_inputs(File::open(path)?)
    }

    /// Writes the displayed values from `A1` to the last non-empty row and column.
    /// An empty worksheet writes nothing.
    pub fn write_values<W: Write>(sheet: &Worksheet, writer: W) -> Result<(), GridIoError> {
        let extent = sheet.filled_cells().fold(None::<(u8, usize)>, |extent, (id, _)| {
            let (row, column) = extent.unwrap_or((0, 0));
            Some((row.max(id.row()), column.max(id.column_index())))
        });
        let Some((last_row, last_column)) = extent else {
            return Ok(());
        };

        let columns = char_range(FIRST_COLUMN, LAST_COLUMN);
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(false)
            .from_writer(writer);

        for row in 1..=last_row {
            let record: Vec<&str> = columns[..=last_column]
                .iter()
                .filter_map(|&column| CellId::new(column, row))
                .map(|id| sheet.value(id))
                .collect();
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn save_values(sheet: &Worksheet, path: &Path) -> Result<(), GridIoError> {
        Self::write_values(sheet, File::create(path)?)
    }

    pub fn write_report<W: Write>(reports: &[CellReport], mut writer: W) -> Result<(), GridIoError> {
        serde_json::to_writer_pretty(&mut writer, reports)?;
        writeln!(writer)?;
        Ok(())
    }

    pub fn save_report(reports: &[CellReport], path: &Path) -> Result<(), GridIoError> {
        Self::write_report(reports, File::create(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ReportStatus;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn cell(reference: &str) -> CellId {
        reference.parse().unwrap()
    }

    #[test]
    fn test_read_inputs() {
        let csv = "1,2\n,=A1+B1\n3\n";
        let inputs = GridRepository::read_inputs(csv.as_bytes()).unwrap();

        assert_eq!(
            inputs,
            vec![
                (cell("A1"), "1".to_string()),
                (cell("B1"), "2".to_string()),
                (cell("B2"), "=A1+B1".to_string()),
                (cell("A3"), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_read_inputs_keeps_quoted_commas() {
        let csv = "\"=sum(1,2)\",x\n";
        let inputs = GridRepository::read_inputs(csv.as_bytes()).unwrap();
        assert_eq!(inputs[0], (cell("A1"), "=sum(1,2)".to_string()));
        assert_eq!(inputs[1], (cell("B1"), "x".to_string()));
    }

    #[test]
    fn test_read_inputs_out_of_bounds() {
        let csv = "1,2,3,4,5,6,7,8,9,10,11\n";
        match GridRepository::read_inputs(csv.as_bytes()) {
            Err(GridIoError::OutOfBounds { row, column }) => assert_eq!((row, column), (1, 11)),
            other => panic!("Expected out of bounds error, got {:?}", other),
        }

        let csv = "1\n".repeat(100);
        assert!(matches!(
            GridRepository::read_inputs(csv.as_bytes()),
            Err(GridIoError::OutOfBounds { row: 100, column: 1 })
        ));
    }

    #[test]
    fn test_read_inputs_ignores_empty_fields_outside_grid() {
        let csv = "1,,,,,,,,,,,\n";
        let inputs = GridRepository::read_inputs(csv.as_bytes()).unwrap();
        assert_eq!(inputs, vec![(cell("A1"), "1".to_string())]);
    }

    #[test]
    fn test_write_values() {
        let mut sheet = Worksheet::new();
        sheet.update(cell("A1"), "1").unwrap();
        sheet.update(cell("C2"), "=A1+1").unwrap();

        let mut out = Vec::new();
        GridRepository::write_values(&sheet, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1,,\n,,2\n");
    }

    #[test]
    fn test_write_values_quotes_lists() {
        let mut sheet = Worksheet::new();
        sheet.update(cell("A1"), "=increment(1,2)").unwrap();

        let mut out = Vec::new();
        GridRepository::write_values(&sheet, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"2,3\"\n");
    }

    #[test]
    fn test_write_values_empty_sheet() {
        let mut out = Vec::new();
        GridRepository::write_values(&Worksheet::new(), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut sheet = Worksheet::new();
        sheet.apply_inputs(vec![
            (cell("A1"), "2".to_string()),
            (cell("B1"), "=A1*5".to_string()),
        ]);

        let file = NamedTempFile::new().unwrap();
        GridRepository::save_values(&sheet, file.path()).unwrap();

        let inputs = GridRepository::load_inputs(file.path()).unwrap();
        assert_eq!(
            inputs,
            vec![(cell("A1"), "2".to_string()), (cell("B1"), "10".to_string())]
        );
    }

    #[test]
    fn test_save_report() {
        let mut sheet = Worksheet::new();
        let reports = sheet.apply_inputs(vec![(cell("A1"), "=A1".to_string())]);

        let file = NamedTempFile::new().unwrap();
        GridRepository::save_report(&reports, file.path()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let parsed: Vec<CellReport> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, reports);
        assert_eq!(parsed[0].status, ReportStatus::Rejected);
    }

    #[test]
    fn test_load_missing_file() {
        let result = GridRepository::load_inputs(Path::new("/nonexistent/grid.csv"));
        assert!(matches!(result, Err(GridIoError::Io(_))));
    }
}
