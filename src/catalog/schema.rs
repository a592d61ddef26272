// Column Kind Module
//
// This module defines the scalar kinds a table column can hold.

use std::fmt;
use serde::{Serialize, Deserialize};

/// Scalar kinds supported for table columns and result columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
    Timestamp,
}

impl DataType {
    /// Convert a string representation to a DataType
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_uppercase().as_str() {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" => Ok(DataType::Integer),
            "FLOAT" | "REAL" | "DOUBLE" | "NUMERIC" | "DECIMAL" => Ok(DataType::Float),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Ok(DataType::Text),
            "BOOL" | "BOOLEAN" => Ok(DataType::Boolean),
            "DATE" => Ok(DataType::Date),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            _ => Err(format!("Unknown data type: {}", s)),
        }
    }

    /// Map a declared column type reported by the engine to a kind.
    ///
    /// Only the leading type word counts, so a length suffix (`VARCHAR(20)`)
    /// or an affinity word (`DATE TEXT`) is ignored.
    pub fn from_declared(decl: &str) -> Option<Self> {
        let base = decl.split('(').next().unwrap_or(decl);
        let word = base.split_whitespace().next()?;
        DataType::from_str(word).ok()
    }

    /// Kind name shown to users
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
        }
    }

    /// Type used when declaring a relation column in the engine.
    ///
    /// Temporal kinds carry a trailing `TEXT` so the column gets TEXT affinity;
    /// a bare `DATE` would get NUMERIC affinity and store `20240501` as an
    /// integer. The leading word still maps back through `from_declared`.
    pub fn sql_type_name(&self) -> &'static str {
        match self {
            DataType::Date => "DATE TEXT",
            DataType::Timestamp => "TIMESTAMP TEXT",
            other => other.name(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
