// Tables stored as CSV files, one file per table.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use fieldplan_analysis::{CellValue, Row, StoreError, TabularStore};
use log::debug;
use snafu::ResultExt;

use crate::app::*;

/// A directory holding `<table>.csv` files. Row 0 of every file is its header.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: &Path) -> CsvStore {
        CsvStore {
            dir: dir.to_path_buf(),
        }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", table))
    }

    /// The raw text of every cell. Row 0 is the header.
    pub fn read_records(&self, table: &str) -> AppResult<Vec<Vec<String>>> {
        let path = self.table_path(table);
        let path_s = path.display().to_string();
        let rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .context(ReadingCsvSnafu { path: path_s.clone() })?;
        let mut records: Vec<Vec<String>> = Vec::new();
        for record in rdr.into_records() {
            let record = record.context(ReadingCsvSnafu { path: path_s.clone() })?;
            records.push(record.iter().map(|f| f.to_string()).collect());
        }
        debug!("read_records: {} rows from {}", records.len(), path_s);
        Ok(records)
    }

    /// Replaces the content of a table. The file is swapped in only once fully written.
    pub fn write_records(&self, table: &str, records: &[Vec<String>]) -> AppResult<()> {
        fs::create_dir_all(&self.dir).context(WritingFileSnafu {
            path: self.dir.display().to_string(),
        })?;
        let path = self.table_path(table);
        let tmp = path.with_extension("csv.tmp");
        let tmp_s = tmp.display().to_string();
        {
            let mut wtr = WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp)
                .context(WritingCsvSnafu { path: tmp_s.clone() })?;
            for record in records {
                wtr.write_record(record)
                    .context(WritingCsvSnafu { path: tmp_s.clone() })?;
            }
            wtr.flush().context(WritingFileSnafu { path: tmp_s.clone() })?;
        }
        fs::rename(&tmp, &path).context(WritingFileSnafu {
            path: path.display().to_string(),
        })?;
        Ok(())
    }

    pub fn write_table(&self, table: &str, rows: &[Row]) -> AppResult<()> {
        let records: Vec<Vec<String>> = rows.iter().map(|r| to_record(r)).collect();
        self.write_records(table, &records)
    }

    fn backend(&self, table: &str, e: AppError) -> StoreError {
        StoreError::Backend {
            table: table.to_string(),
            message: e.to_string(),
        }
    }

    fn load(&self, table: &str) -> Result<Vec<Vec<String>>, StoreError> {
        if !self.has_table(table) {
            return Err(StoreError::MissingTable {
                table: table.to_string(),
            });
        }
        self.read_records(table).map_err(|e| self.backend(table, e))
    }

    fn save(&self, table: &str, records: &[Vec<String>]) -> Result<(), StoreError> {
        self.write_records(table, records)
            .map_err(|e| self.backend(table, e))
    }
}

fn to_record(row: &Row) -> Vec<String> {
    row.iter().map(|c| c.to_string()).collect()
}

fn to_row(record: &[String]) -> Row {
    record.iter().map(|f| CellValue::parse(f)).collect()
}

/// Cells are typed on read only. Writes touch the raw text of the cells they change.
impl TabularStore for CsvStore {
    fn has_table(&self, table: &str) -> bool {
        self.table_path(table).is_file()
    }

    fn list_rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        Ok(self.load(table)?.iter().map(|r| to_row(r)).collect())
    }

    fn get_row(&self, table: &str, row: usize) -> Result<Row, StoreError> {
        let records = self.load(table)?;
        match records.get(row) {
            Some(r) => Ok(to_row(r)),
            None => Err(StoreError::RowOutOfRange {
                table: table.to_string(),
                row,
            }),
        }
    }

    fn append_row(&mut self, table: &str, row: Row) -> Result<usize, StoreError> {
        let mut records = self.load(table)?;
        records.push(to_record(&row));
        self.save(table, &records)?;
        Ok(records.len() - 1)
    }

    fn set_cell(
        &mut self,
        table: &str,
        row: usize,
        column: usize,
        value: CellValue,
    ) -> Result<(), StoreError> {
        let mut records = self.load(table)?;
        let r = match records.get_mut(row) {
            Some(r) => r,
            None => {
                return Err(StoreError::RowOutOfRange {
                    table: table.to_string(),
                    row,
                })
            }
        };
        if r.len() <= column {
            r.resize(column + 1, String::new());
        }
        r[column] = value.to_string();
        self.save(table, &records)
    }
}
