//! Immutable view of the registry taken when a query is submitted.

use std::sync::Arc;
use linked_hash_map::LinkedHashMap;

use super::table::Table;

/// A by-value copy of the registry's name → table mapping.
///
/// Tables are shared with the registry through `Arc`; the registry never
/// mutates a table in place, so later registry changes cannot reach a
/// snapshot already taken.
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
    tables: LinkedHashMap<String, Arc<Table>>,
}

impl QuerySnapshot {
    pub(crate) fn new(tables: LinkedHashMap<String, Arc<Table>>) -> Self {
        QuerySnapshot { tables }
    }

    /// Build a snapshot directly from named tables, bypassing a registry
    pub fn from_tables<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (String, Table)>,
    {
        QuerySnapshot {
            tables: tables.into_iter().map(|(name, table)| (name, Arc::new(table))).collect(),
        }
    }

    /// Get a table by name
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).map(|t| t.as_ref())
    }

    /// Iterate tables in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table.as_ref()))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
