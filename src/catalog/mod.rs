//! Table Registry Module
//!
//! This module owns the named in-memory tables a user has registered and the
//! marker for the currently active table. Queries never see the live registry;
//! they run against a [`QuerySnapshot`] taken at submission.

pub mod schema;
pub mod table;
pub mod column;
pub mod error;
pub mod identifier;
pub mod snapshot;

// Re-export key types
pub use self::schema::DataType;
pub use self::table::{Table, ColumnProfile};
pub use self::column::Column;
pub use self::error::{RegistryError, RegistryResult, TableError, TableResult};
pub use self::identifier::{is_valid_identifier, validate_identifier};
pub use self::snapshot::QuerySnapshot;

use std::sync::Arc;
use linked_hash_map::LinkedHashMap;
use log::debug;

/// Listing entry for one registered table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub active: bool,
}

/// The registry of named tables.
///
/// Mutated only through `&mut self`, so a single owner controls every change.
/// Enumeration follows registration order. Names are unique ignoring ASCII
/// case, since the engine resolves relation names that way.
#[derive(Debug, Default)]
pub struct TableRegistry {
    /// Tables keyed by validated name
    tables: LinkedHashMap<String, Arc<Table>>,
    /// Name of the active table, if any
    active: Option<String>,
}

impl TableRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        TableRegistry::default()
    }

    /// Register a table under a new name. Never overwrites an existing table.
    pub fn register(&mut self, name: &str, table: Table) -> RegistryResult<()> {
        validate_identifier(name)?;
        if self.clashing_key(name).is_some() {
            return Err(RegistryError::DuplicateTable(name.to_string()));
        }

        debug!("Registering table {} ({} rows, {} columns)", name, table.row_count(), table.column_count());
        self.tables.insert(name.to_string(), Arc::new(table));
        if self.active.is_none() {
            self.active = Some(name.to_string());
        }
        Ok(())
    }

    /// Register a table, overwriting any existing table with the same name.
    ///
    /// This is the explicit-confirmation path; an overwritten table keeps its
    /// position in the listing. Returns the previous table, if there was one.
    pub fn replace(&mut self, name: &str, table: Table) -> RegistryResult<Option<Table>> {
        validate_identifier(name)?;
        if self.clashing_key(name).is_some_and(|existing| existing != name) {
            return Err(RegistryError::DuplicateTable(name.to_string()));
        }

        let previous = match self.tables.get_mut(name) {
            Some(slot) => {
                debug!("Replacing table {}", name);
                let old = std::mem::replace(slot, Arc::new(table));
                Some(Arc::unwrap_or_clone(old))
            }
            None => {
                self.tables.insert(name.to_string(), Arc::new(table));
                None
            }
        };
        if self.active.is_none() {
            self.active = Some(name.to_string());
        }
        Ok(previous)
    }

    /// Rename a table. Either the whole rename happens or nothing changes.
    pub fn rename(&mut self, old: &str, new: &str) -> RegistryResult<()> {
        validate_identifier(new)?;
        if !self.tables.contains_key(old) {
            return Err(RegistryError::TableNotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.tables.keys().any(|k| k != old && k.eq_ignore_ascii_case(new)) {
            return Err(RegistryError::DuplicateTable(new.to_string()));
        }

        debug!("Renaming table {} to {}", old, new);
        let tables = std::mem::take(&mut self.tables);
        self.tables = tables
            .into_iter()
            .map(|(name, table)| if name == old { (new.to_string(), table) } else { (name, table) })
            .collect();

        if self.active.as_deref() == Some(old) {
            self.active = Some(new.to_string());
        }
        Ok(())
    }

    /// Remove a table and return it.
    ///
    /// When the active table is removed the first remaining table becomes
    /// active, or none if the registry is now empty.
    pub fn remove(&mut self, name: &str) -> RegistryResult<Table> {
        let table = self.tables
            .remove(name)
            .ok_or_else(|| RegistryError::TableNotFound(name.to_string()))?;

        debug!("Removed table {}", name);
        if self.active.as_deref() == Some(name) {
            self.active = self.tables.keys().next().cloned();
        }
        Ok(Arc::unwrap_or_clone(table))
    }

    /// Mark a table as active
    pub fn set_active(&mut self, name: &str) -> RegistryResult<()> {
        if !self.tables.contains_key(name) {
            return Err(RegistryError::TableNotFound(name.to_string()));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Name of the active table
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active table with its name
    pub fn active(&self) -> Option<(&str, &Table)> {
        let name = self.active.as_deref()?;
        self.tables.get(name).map(|t| (name, t.as_ref()))
    }

    /// Copy the current name → table mapping for a query
    pub fn snapshot(&self) -> QuerySnapshot {
        QuerySnapshot::new(self.tables.clone())
    }

    /// Get a table by name
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name).map(|t| t.as_ref())
    }

    /// Check if a table exists
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Name, size and active flag for every table, in registration order
    pub fn summaries(&self) -> Vec<TableSummary> {
        self.tables.iter().map(|(name, table)| TableSummary {
            name: name.clone(),
            rows: table.row_count(),
            columns: table.column_count(),
            active: self.active.as_deref() == Some(name.as_str()),
        }).collect()
    }

    /// Drop every table
    pub fn clear(&mut self) {
        self.tables.clear();
        self.active = None;
    }

    /// Existing key naming the same engine relation; SQLite folds ASCII case
    fn clashing_key(&self, name: &str) -> Option<&str> {
        self.tables
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .map(|k| k.as_str())
    }
}
