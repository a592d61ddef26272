// Query Engine Implementation
//
// This module materializes a snapshot of registered tables into a private
// in-memory SQLite database and runs exactly one statement against it.

use log::debug;
use rusqlite::{params_from_iter, Batch, Connection, InterruptHandle};

use crate::catalog::identifier::quote_identifier;
use crate::catalog::{QuerySnapshot, Table};
use crate::catalog::column::Column;
use crate::query::executor::result::{DataValue, QueryError, QueryResult, QueryResultSet, Row};
use crate::query::executor::type_conversion::{align_result_value, from_value_ref, infer_column_kind, to_sql_value};

/// Configuration for the embedded store
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Page cache size for the in-memory database, in KiB
    pub cache_size_kib: u32,
    /// Capacity of the prepared statement cache used while loading rows
    pub statement_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_size_kib: 64 * 1024, // 64 MB
            statement_cache_capacity: 16,
        }
    }
}

/// A freshly built, process-local relational store.
///
/// The underlying connection is closed when the engine is dropped, which
/// `execute` does on every exit path by taking `self`.
pub struct QueryEngine {
    conn: Connection,
    tables: Vec<String>,
}

impl QueryEngine {
    /// Create an empty in-memory store
    pub fn open(config: &EngineConfig) -> QueryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| QueryError::EngineInit(e.to_string()))?;

        // Negative cache_size is interpreted by SQLite as KiB.
        conn.pragma_update(None, "cache_size", -i64::from(config.cache_size_kib))
            .map_err(|e| QueryError::EngineInit(e.to_string()))?;
        conn.set_prepared_statement_cache_capacity(config.statement_cache_capacity);

        Ok(QueryEngine { conn, tables: Vec::new() })
    }

    /// Open a store and load every table of the snapshot into it
    pub fn build(snapshot: &QuerySnapshot, config: &EngineConfig) -> QueryResult<Self> {
        let mut engine = QueryEngine::open(config)?;
        engine.load(snapshot)?;
        Ok(engine)
    }

    /// Load every snapshot table as a relation named after its registry key.
    ///
    /// All tables load in one transaction; on any failure it rolls back and
    /// no relation from this snapshot is left in the store.
    pub fn load(&mut self, snapshot: &QuerySnapshot) -> QueryResult<()> {
        let tx = self.conn.transaction()
            .map_err(|e| QueryError::EngineInit(e.to_string()))?;

        for (name, table) in snapshot.iter() {
            load_table(&tx, name, table)?;
        }

        tx.commit().map_err(|e| QueryError::EngineInit(e.to_string()))?;
        self.tables.extend(snapshot.table_names().into_iter().map(str::to_string));
        Ok(())
    }

    /// Relations loaded into this engine
    pub fn table_names(&self) -> &[String] {
        &self.tables
    }

    /// Handle that aborts the statement currently running on this engine
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Run exactly one statement and materialize its result.
    ///
    /// Engine diagnostics are returned verbatim in `QueryError::Execution`.
    pub fn execute(self, sql: &str) -> QueryResult<QueryResultSet> {
        if sql.trim().is_empty() {
            return Err(QueryError::Execution("empty statement".to_string()));
        }

        let mut batch = Batch::new(&self.conn, sql);
        let mut stmt = batch.next()
            .map_err(|e| QueryError::Execution(e.to_string()))?
            .ok_or_else(|| QueryError::Execution("empty statement".to_string()))?;
        if batch.next().map_err(|e| QueryError::Execution(e.to_string()))?.is_some() {
            return Err(QueryError::Execution("only one statement may be executed at a time".to_string()));
        }

        let declared: Vec<(String, Option<String>)> = stmt.columns()
            .iter()
            .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
            .collect();
        let width = declared.len();

        let mut raw_rows = Vec::new();
        let mut rows = stmt.query([])
            .map_err(|e| QueryError::Execution(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| QueryError::Execution(e.to_string()))? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value = row.get_ref(idx).map_err(|e| QueryError::Execution(e.to_string()))?;
                values.push(from_value_ref(value));
            }
            raw_rows.push(values);
        }

        let columns: Vec<Column> = declared.into_iter().enumerate().map(|(idx, (name, decl))| {
            let values: Vec<&DataValue> = raw_rows.iter().map(|r| &r[idx]).collect();
            let kind = infer_column_kind(decl.as_deref(), &values);
            Column::new(name, kind)
        }).collect();

        let kinds: Vec<_> = columns.iter().map(|c| c.data_type()).collect();
        let mut result = QueryResultSet::new(columns);
        for values in raw_rows {
            let aligned = values.into_iter()
                .zip(&kinds)
                .map(|(value, kind)| align_result_value(value, *kind))
                .collect();
            result.add_row(Row::from_values(aligned));
        }

        debug!("Statement returned {} rows x {} columns", result.row_count(), result.column_count());
        Ok(result)
    }
}

/// Create one relation and insert its rows through a cached prepared statement
fn load_table(conn: &Connection, name: &str, table: &Table) -> QueryResult<()> {
    for (row_idx, row) in table.rows().iter().enumerate() {
        for (value, col) in row.iter().zip(table.columns()) {
            // SQLite stores NaN as NULL.
            if matches!(value, DataValue::Float(f) if f.is_nan()) {
                return Err(QueryError::EngineInit(format!(
                    "Cannot load table '{}': column '{}' row {} holds NaN, which cannot be stored",
                    name, col.name(), row_idx
                )));
            }
            if !value.is_compatible_with(col.data_type()) {
                return Err(QueryError::EngineInit(format!(
                    "Cannot load table '{}': column '{}' is {} but row {} holds {}",
                    name, col.name(), col.data_type(), row_idx, value.to_sql_literal_for_error()
                )));
            }
        }
    }

    conn.execute_batch(&table.schema_string(name))
        .map_err(|e| QueryError::EngineInit(format!("Cannot create table '{}': {}", name, e)))?;

    let placeholders = vec!["?"; table.column_count()].join(", ");
    let insert = format!("INSERT INTO {} VALUES ({})", quote_identifier(name), placeholders);
    let mut stmt = conn.prepare_cached(&insert)
        .map_err(|e| QueryError::EngineInit(format!("Cannot load table '{}': {}", name, e)))?;
    for row in table.rows() {
        stmt.execute(params_from_iter(row.iter().map(to_sql_value)))
            .map_err(|e| QueryError::EngineInit(format!("Cannot load table '{}': {}", name, e)))?;
    }

    debug!("Loaded table {} ({} rows)", name, table.row_count());
    Ok(())
}
