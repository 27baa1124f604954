// ********* Storage boundaries ***********

use std::collections::BTreeMap;

use snafu::{OptionExt, Snafu};

use crate::cell::CellValue;

pub type Row = Vec<CellValue>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("Table {table} does not exist"))]
    MissingTable { table: String },
    #[snafu(display("Row {row} is out of range for table {table}"))]
    RowOutOfRange { table: String, row: usize },
    #[snafu(display("Table {table} could not be accessed: {message}"))]
    Backend { table: String, message: String },
}

/// The system of record for the submission tables.
///
/// Row indexes are stable: row 0 is the header, later submissions get higher indexes.
pub trait TabularStore {
    fn has_table(&self, table: &str) -> bool;

    fn list_rows(&self, table: &str) -> Result<Vec<Row>, StoreError>;

    fn get_row(&self, table: &str, row: usize) -> Result<Row, StoreError>;

    fn append_row(&mut self, table: &str, row: Row) -> Result<usize, StoreError>;

    fn set_cell(
        &mut self,
        table: &str,
        row: usize,
        column: usize,
        value: CellValue,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PropertyError {
    #[snafu(display("Property store failure: {message}"))]
    PropertyBackend { message: String },
}

/// A flat persistent string map.
pub trait PropertyStore {
    fn get(&self, key: &str) -> Result<Option<String>, PropertyError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PropertyError>;

    fn delete(&mut self, key: &str) -> Result<(), PropertyError>;

    /// The entries whose key starts with `prefix`, ordered by key.
    fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, PropertyError>;
}

/// Tables held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Creates or replaces a table.
    pub fn insert_table(&mut self, table: &str, rows: Vec<Row>) {
        self.tables.insert(table.to_string(), rows);
    }
}

impl TabularStore for MemoryStore {
    fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn list_rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let rows = self.tables.get(table).context(MissingTableSnafu { table })?;
        Ok(rows.clone())
    }

    fn get_row(&self, table: &str, row: usize) -> Result<Row, StoreError> {
        let rows = self.tables.get(table).context(MissingTableSnafu { table })?;
        let r = rows.get(row).context(RowOutOfRangeSnafu { table, row })?;
        Ok(r.clone())
    }

    fn append_row(&mut self, table: &str, row: Row) -> Result<usize, StoreError> {
        let rows = self
            .tables
            .get_mut(table)
            .context(MissingTableSnafu { table })?;
        rows.push(row);
        Ok(rows.len() - 1)
    }

    fn set_cell(
        &mut self,
        table: &str,
        row: usize,
        column: usize,
        value: CellValue,
    ) -> Result<(), StoreError> {
        let rows = self
            .tables
            .get_mut(table)
            .context(MissingTableSnafu { table })?;
        let r = rows
            .get_mut(row)
            .context(RowOutOfRangeSnafu { table, row })?;
        if r.len() <= column {
            r.resize(column + 1, CellValue::Empty);
        }
        r[column] = value;
        Ok(())
    }
}

/// Properties held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryProperties {
    values: BTreeMap<String, String>,
}

impl MemoryProperties {
    pub fn new() -> MemoryProperties {
        MemoryProperties::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertyStore for MemoryProperties {
    fn get(&self, key: &str) -> Result<Option<String>, PropertyError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PropertyError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), PropertyError> {
        self.values.remove(key);
        Ok(())
    }

    fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, PropertyError> {
        Ok(self
            .values
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
