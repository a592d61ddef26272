// tabsql: ad hoc SQL across named in-memory tables

pub mod catalog;
pub mod query;

// Re-export key items for convenient access
pub use catalog::{Column, DataType, QuerySnapshot, RegistryError, Table, TableRegistry};
pub use query::executor::engine::{EngineConfig, QueryEngine};
pub use query::executor::result::{DataValue, QueryError, QueryResultSet, Row};
pub use query::controller::{
    ConcurrencyPolicy, ControllerConfig, ExecutionController, ExecutionOutcome, ProgressEvent,
    QueryEvent, QueryHandle,
};
