// tabsql Query Processing Module
//
// This module contains the embedded engine wrapper and the controller that
// runs queries in the background.

pub mod executor;
pub mod controller;

// Export key public interfaces
pub use executor::engine::{EngineConfig, QueryEngine};
pub use executor::result::{DataValue, QueryError, QueryResult, QueryResultSet, Row};
pub use controller::{
    ConcurrencyPolicy, ControllerConfig, ExecutionController, ExecutionOutcome, Phase,
    ProgressEvent, QueryEvent, QueryHandle, QueryState,
};
