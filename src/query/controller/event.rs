//! Messages a query worker sends back to its handle.

use std::fmt;

use crate::query::executor::result::{QueryError, QueryResultSet};

/// Coarse phase a progress milestone belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    EngineInit,
    Load,
    Execute,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::EngineInit => write!(f, "engine-init"),
            Phase::Load => write!(f, "load"),
            Phase::Execute => write!(f, "execute"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// A progress milestone in [0, 100]. Values are not proportional to work done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub phase: Phase,
}

impl ProgressEvent {
    /// Store creation has started
    pub const ENGINE_INIT: ProgressEvent = ProgressEvent { percent: 10, phase: Phase::EngineInit };
    /// Tables are being loaded into the store
    pub const LOADING: ProgressEvent = ProgressEvent { percent: 20, phase: Phase::Load };
    /// Loading finished, the statement is about to run
    pub const LOADED: ProgressEvent = ProgressEvent { percent: 50, phase: Phase::Execute };
    /// The statement finished successfully
    pub const DONE: ProgressEvent = ProgressEvent { percent: 100, phase: Phase::Done };
}

/// The single terminal result of a submitted query
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success(QueryResultSet),
    Failure(QueryError),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    /// Convert into a plain `Result`
    pub fn into_result(self) -> Result<QueryResultSet, QueryError> {
        match self {
            ExecutionOutcome::Success(result) => Ok(result),
            ExecutionOutcome::Failure(err) => Err(err),
        }
    }
}

impl From<Result<QueryResultSet, QueryError>> for ExecutionOutcome {
    fn from(result: Result<QueryResultSet, QueryError>) -> Self {
        match result {
            Ok(set) => ExecutionOutcome::Success(set),
            Err(err) => ExecutionOutcome::Failure(err),
        }
    }
}

/// One item of a handle's event stream
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    Progress(ProgressEvent),
    Finished(ExecutionOutcome),
}

/// Where a query is in its lifecycle, as observed through its handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Submitted,
    Initializing,
    Loading,
    Executing,
    Completed,
    Failed,
}

impl QueryState {
    /// State after observing an event
    pub(crate) fn after(self, event: &QueryEvent) -> QueryState {
        match event {
            QueryEvent::Progress(p) => match p.phase {
                Phase::EngineInit => QueryState::Initializing,
                Phase::Load => QueryState::Loading,
                Phase::Execute => QueryState::Executing,
                Phase::Done => self,
            },
            QueryEvent::Finished(ExecutionOutcome::Success(_)) => QueryState::Completed,
            QueryEvent::Finished(ExecutionOutcome::Failure(_)) => QueryState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryState::Completed | QueryState::Failed)
    }
}
