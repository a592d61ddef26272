// Query Result Implementation
//
// This module defines the value, row and result types for query execution.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use thiserror::Error;

use crate::catalog::column::Column;
use crate::catalog::schema::DataType;

/// Possible data types for values in a row.
///
/// Serialized untagged, so JSON tables read as plain scalars; temporal values
/// arrive as text and are aligned to their column kind by `Table::new`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Date(String),
    Timestamp(String),
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DataValue::Null => 0.hash(state),
            DataValue::Integer(i) => { 1.hash(state); i.hash(state); }
            DataValue::Float(f) => { 2.hash(state); f.to_bits().hash(state); }
            DataValue::Text(s) => { 3.hash(state); s.hash(state); }
            DataValue::Boolean(b) => { 4.hash(state); b.hash(state); }
            DataValue::Date(s) => { 5.hash(state); s.hash(state); }
            DataValue::Timestamp(s) => { 6.hash(state); s.hash(state); }
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "{}", s),
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::Date(s) => write!(f, "{}", s),
            DataValue::Timestamp(s) => write!(f, "{}", s),
        }
    }
}

impl DataValue {
    /// The kind of this value, or `None` for NULL
    pub fn get_type(&self) -> Option<DataType> {
        match self {
            DataValue::Null => None,
            DataValue::Integer(_) => Some(DataType::Integer),
            DataValue::Float(_) => Some(DataType::Float),
            DataValue::Text(_) => Some(DataType::Text),
            DataValue::Boolean(_) => Some(DataType::Boolean),
            DataValue::Date(_) => Some(DataType::Date),
            DataValue::Timestamp(_) => Some(DataType::Timestamp),
        }
    }

    /// Whether this value may be stored in a column of the given kind
    pub fn is_compatible_with(&self, kind: DataType) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::Integer(_) => matches!(kind, DataType::Integer | DataType::Float),
            DataValue::Float(_) => kind == DataType::Float,
            DataValue::Text(_) => kind == DataType::Text,
            DataValue::Boolean(_) => kind == DataType::Boolean,
            DataValue::Date(_) => kind == DataType::Date,
            DataValue::Timestamp(_) => kind == DataType::Timestamp,
        }
    }

    /// Align a value with the kind of the column it sits in.
    ///
    /// Text in a temporal column becomes a temporal value and an integer in a
    /// float column becomes a float. Anything else is returned unchanged.
    pub fn aligned_to(self, kind: DataType) -> DataValue {
        match (self, kind) {
            (DataValue::Text(s), DataType::Date) => DataValue::Date(s),
            (DataValue::Text(s), DataType::Timestamp) => DataValue::Timestamp(s),
            (DataValue::Integer(i), DataType::Float) => DataValue::Float(i as f64),
            (value, _) => value,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    pub fn to_sql_literal_for_error(&self) -> String {
        match self {
            DataValue::Null => "NULL".to_string(),
            DataValue::Integer(i) => i.to_string(),
            DataValue::Float(f) => f.to_string(),
            DataValue::Text(s) => format!("'{}'", s.replace("'", "''")),
            DataValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            DataValue::Date(s) => format!("'{}'", s),
            DataValue::Timestamp(s) => format!("'{}'", s),
        }
    }
}

/// One row: a tuple of values aligned to the result's columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    values: Vec<DataValue>,
}

impl Row {
    /// Create a row from values in column order
    pub fn from_values(values: Vec<DataValue>) -> Self {
        Row { values }
    }

    /// Get a value by column position
    pub fn get(&self, index: usize) -> Option<&DataValue> {
        self.values.get(index)
    }

    /// All values in column order
    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Represents query execution error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The embedded store could not be created or a table failed to load
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),
    /// Malformed SQL or a relational failure reported by the engine
    #[error("Query execution failed: {0}")]
    Execution(String),
    /// Rejected by a single-slot controller while another query runs
    #[error("Another query is already in flight")]
    Busy,
    /// The handle's deadline elapsed before a terminal outcome
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
    /// The worker exited without delivering an outcome
    #[error("Query worker terminated without a result")]
    WorkerLost,
}

impl QueryError {
    /// Human-readable diagnostic; engine messages are returned verbatim
    pub fn message(&self) -> String {
        match self {
            QueryError::EngineInit(msg) | QueryError::Execution(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query resultset representation
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResultSet {
    /// Columns in the resultset
    columns: Vec<Column>,
    /// Rows of data
    rows: Vec<Row>,
}

impl QueryResultSet {
    /// Create a new empty resultset with the given columns
    pub fn new(columns: Vec<Column>) -> Self {
        QueryResultSet {
            columns,
            rows: Vec::new(),
        }
    }

    /// Add a row to the resultset
    pub fn add_row(&mut self, row: Row) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Get the columns in the resultset
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Position of the first column with this name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Get the rows in the resultset
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Look up a value by row position and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&DataValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Format the resultset as a string table
    pub fn to_string_table(&self) -> String {
        if self.columns.is_empty() {
            return "Empty result".to_string();
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name().len().max(3)).collect();
        let rendered: Vec<Vec<String>> = self.rows.iter()
            .map(|row| row.values().iter().map(|v| v.to_string()).collect())
            .collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut result = String::new();
        result.push('|');
        for (col, width) in self.columns.iter().zip(&widths) {
            result.push_str(&format!(" {:<width$} |", col.name(), width = *width));
        }
        result.push('\n');

        result.push('+');
        for width in &widths {
            result.push_str(&format!("{:-<width$}+", "", width = width + 2));
        }
        result.push('\n');

        for row in &rendered {
            result.push('|');
            for (cell, width) in row.iter().zip(&widths) {
                result.push_str(&format!(" {:<width$} |", cell, width = *width));
            }
            result.push('\n');
        }

        result.push_str(&format!("({} rows)", self.row_count()));
        result
    }

    /// Return a message for empty result sets
    pub fn empty_message(&self) -> String {
        if self.columns.is_empty() {
            "Empty result".to_string()
        } else {
            format!("Empty result set with columns: {}", self.column_names().join(", "))
        }
    }
}
