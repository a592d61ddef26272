// Query Executor Module
//
// This module materializes snapshots into the embedded relational store and
// executes single statements against it.

pub mod engine;
pub mod result;
pub mod type_conversion;

// Export key types
pub use self::engine::{EngineConfig, QueryEngine};
pub use self::result::{DataValue, QueryError, QueryResult, QueryResultSet, Row};
