use thiserror::Error;

/// Errors returned synchronously by registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid table name '{0}': only letters, digits and underscores are allowed")]
    InvalidIdentifier(String),
    #[error("Table already exists: {0}")]
    DuplicateTable(String),
    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// Errors raised while constructing a table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Row {row} has {actual} values, but the table has {expected} columns")]
    RowArity {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Column name at position {0} is empty")]
    EmptyColumnName(usize),
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for table construction
pub type TableResult<T> = Result<T, TableError>;
