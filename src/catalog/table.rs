//! Table Management Module
//!
//! This module defines the Table type: ordered column definitions plus ordered
//! rows, each row a tuple aligned to the columns.

use std::collections::{HashMap, HashSet};
use serde::{Serialize, Deserialize};

use super::column::Column;
use super::error::{TableError, TableResult};
use super::identifier::quote_identifier;
use crate::query::executor::result::DataValue;

/// An in-memory table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct Table {
    /// Columns in the table
    columns: Vec<Column>,
    /// Row tuples, each with exactly `columns.len()` values
    rows: Vec<Vec<DataValue>>,
}

/// Unvalidated wire form of a table
#[derive(Deserialize)]
struct TableParts {
    columns: Vec<Column>,
    #[serde(default)]
    rows: Vec<Vec<DataValue>>,
}

impl TryFrom<TableParts> for Table {
    type Error = TableError;

    fn try_from(parts: TableParts) -> TableResult<Self> {
        Table::new(parts.columns, parts.rows)
    }
}

/// Per-column statistics shown by the metadata view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: super::schema::DataType,
    pub non_null: usize,
    pub distinct: usize,
    pub total: usize,
}

impl Table {
    /// Create a table from columns and rows.
    ///
    /// Column names must be non-empty and unique and every row must have one
    /// value per column. Values are aligned to their column kind.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<DataValue>>) -> TableResult<Self> {
        let mut seen = HashSet::new();
        for (i, col) in columns.iter().enumerate() {
            if col.name().is_empty() {
                return Err(TableError::EmptyColumnName(i));
            }
            if !seen.insert(col.name()) {
                return Err(TableError::DuplicateColumn(col.name().to_string()));
            }
        }

        let mut aligned = Vec::with_capacity(rows.len());
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RowArity {
                    row: row_idx,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            aligned.push(
                row.into_iter()
                    .zip(&columns)
                    .map(|(value, col)| value.aligned_to(col.data_type()))
                    .collect(),
            );
        }

        Ok(Table { columns, rows: aligned })
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get all rows
    pub fn rows(&self) -> &[Vec<DataValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get a string representation of the table schema under the given relation name
    pub fn schema_string(&self, name: &str) -> String {
        let mut schema = format!("CREATE TABLE {} (\n", quote_identifier(name));

        for (i, col) in self.columns.iter().enumerate() {
            schema.push_str(&format!("  {} {}", quote_identifier(col.name()), col.data_type().sql_type_name()));

            if i < self.columns.len() - 1 {
                schema.push_str(",\n");
            }
        }

        schema.push_str("\n);");
        schema
    }

    /// Compute non-null and distinct counts for every column
    pub fn column_profiles(&self) -> Vec<ColumnProfile> {
        self.columns.iter().enumerate().map(|(idx, col)| {
            let mut distinct = HashSet::new();
            let mut non_null = 0;
            for row in &self.rows {
                let value = &row[idx];
                if !value.is_null() {
                    non_null += 1;
                    distinct.insert(value);
                }
            }
            ColumnProfile {
                name: col.name().to_string(),
                data_type: col.data_type(),
                non_null,
                distinct: distinct.len(),
                total: self.rows.len(),
            }
        }).collect()
    }

    /// Drop rows where every value is NULL and trim whitespace around column names
    pub fn clean(mut self) -> TableResult<Self> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (i, col) in self.columns.iter_mut().enumerate() {
            let trimmed = col.name().trim().to_string();
            if trimmed.is_empty() {
                return Err(TableError::EmptyColumnName(i));
            }
            if positions.insert(trimmed.clone(), i).is_some() {
                return Err(TableError::DuplicateColumn(trimmed));
            }
            if trimmed != col.name() {
                col.rename(&trimmed);
            }
        }
        self.rows.retain(|row| !row.iter().all(DataValue::is_null));
        Ok(self)
    }
}
