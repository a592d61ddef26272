// Column Management Module
//
// This module defines the Column type describing one table or result column.

use super::schema::DataType;
use serde::{Serialize, Deserialize};

/// Represents a column definition: a name and a scalar kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    name: String,
    /// Column data type
    data_type: DataType,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
        }
    }

    /// Get the column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the column data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Rename the column
    pub(crate) fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }
}
