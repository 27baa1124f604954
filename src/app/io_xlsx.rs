use calamine::{open_workbook, DataType, Reader, Xlsx};
use fieldplan_analysis::{CellValue, Row};
use log::{debug, warn};
use snafu::{OptionExt, ResultExt};

use crate::app::io_csv::CsvStore;
use crate::app::*;

/// Copies one sheet of an Excel workbook into a table, header row included.
pub fn import_sheet(path: &str, sheet: &str, store: &CsvStore, table: &str) -> AppResult<usize> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).context(OpeningExcelSnafu { path: path.to_string() })?;
    let wrange = workbook
        .worksheet_range(sheet)
        .context(MissingSheetSnafu { path, sheet })?
        .context(OpeningExcelSnafu { path: path.to_string() })?;

    let mut rows: Vec<Row> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        debug!("import_sheet: idx: {:?} row: {:?}", idx, row);
        rows.push(row.iter().map(|c| read_cell_calamine(c, idx)).collect());
    }
    store.write_table(table, &rows)?;
    // The header does not count as a submission.
    Ok(rows.len().saturating_sub(1))
}

fn read_cell_calamine(cell: &DataType, row: usize) -> CellValue {
    match cell {
        DataType::String(s) if s.trim().is_empty() => CellValue::Empty,
        DataType::String(s) => CellValue::Text(s.clone()),
        DataType::Float(f) => CellValue::Number(*f),
        DataType::Int(i) => CellValue::Number(*i as f64),
        DataType::DateTime(f) => CellValue::Number(*f),
        DataType::Bool(b) => CellValue::Bool(*b),
        DataType::Empty => CellValue::Empty,
        x => {
            warn!("read_cell_calamine: row {}: dropping cell {:?}", row, x);
            CellValue::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(
            read_cell_calamine(&DataType::String("Acme".to_string()), 1),
            CellValue::Text("Acme".to_string())
        );
        // Text cells keep their exact content.
        assert_eq!(
            read_cell_calamine(&DataType::String("00123".to_string()), 1),
            CellValue::Text("00123".to_string())
        );
        assert_eq!(
            read_cell_calamine(&DataType::String("  ".to_string()), 1),
            CellValue::Empty
        );
        assert_eq!(
            read_cell_calamine(&DataType::Int(12), 1),
            CellValue::Number(12.0)
        );
        assert_eq!(
            read_cell_calamine(&DataType::Float(0.5), 1),
            CellValue::Number(0.5)
        );
        assert_eq!(
            read_cell_calamine(&DataType::Bool(true), 1),
            CellValue::Bool(true)
        );
        assert_eq!(read_cell_calamine(&DataType::Empty, 1), CellValue::Empty);
        assert_eq!(
            read_cell_calamine(&DataType::Error(calamine::CellErrorType::Div0), 1),
            CellValue::Empty
        );
    }
}
