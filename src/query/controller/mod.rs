//! Execution Controller Module
//!
//! Runs queries on worker threads so the submitting thread never blocks.
//! Each submission gets its own snapshot, its own engine and its own event
//! channel; nothing is shared with the live registry.

pub mod event;
pub mod handle;
mod worker;

pub use self::event::{ExecutionOutcome, Phase, ProgressEvent, QueryEvent, QueryState};
pub use self::handle::QueryHandle;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use log::{info, warn};

use crate::catalog::{QuerySnapshot, TableRegistry};
use crate::query::executor::engine::EngineConfig;
use crate::query::executor::result::QueryError;
use self::worker::{InFlightGuard, InterruptSlot, Job};

/// How submissions interact while another query is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Every submission runs immediately and independently
    #[default]
    Unbounded,
    /// At most one query runs; a submission while one is in flight fails with `Busy`
    SingleSlot,
}

/// Configuration for the execution controller
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    /// Concurrency policy for overlapping submissions
    pub policy: ConcurrencyPolicy,
    /// Time after which a handle gives up with `Timeout`
    pub deadline: Option<Duration>,
    /// Settings for each query's engine
    pub engine: EngineConfig,
}

/// Starts query workers and hands back handles to observe them
pub struct ExecutionController {
    config: ControllerConfig,
    in_flight: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

impl ExecutionController {
    pub fn new(config: ControllerConfig) -> Self {
        ExecutionController {
            config,
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of workers that have not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Snapshot the registry and submit a query against it
    pub fn submit_from(&self, sql: impl Into<String>, registry: &TableRegistry) -> QueryHandle {
        self.submit(sql, registry.snapshot())
    }

    /// Start running `sql` against `snapshot` and return immediately
    pub fn submit(&self, sql: impl Into<String>, snapshot: QuerySnapshot) -> QueryHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let sql = sql.into();
        let (tx, rx) = channel::unbounded();
        let interrupt = Arc::new(InterruptSlot::default());
        let handle = QueryHandle::new(id, rx, self.config.deadline, interrupt.clone());

        let guard = match self.config.policy {
            ConcurrencyPolicy::Unbounded => InFlightGuard::acquire(&self.in_flight),
            ConcurrencyPolicy::SingleSlot => match InFlightGuard::try_acquire_exclusive(&self.in_flight) {
                Some(guard) => guard,
                None => {
                    warn!("Query {} rejected: another query is in flight", id);
                    let _ = tx.send(QueryEvent::Finished(ExecutionOutcome::Failure(QueryError::Busy)));
                    return handle;
                }
            },
        };

        info!("Query {} submitted against {} tables", id, snapshot.len());
        let job = Job {
            id,
            sql,
            snapshot,
            engine_config: self.config.engine.clone(),
            events: tx.clone(),
            interrupt,
            guard,
        };

        let spawned = thread::Builder::new()
            .name(format!("tabsql-query-{}", id))
            .spawn(move || worker::run(job));
        if let Err(e) = spawned {
            // The job, and with it the in-flight guard, was dropped by the failed spawn.
            warn!("Query {} could not start a worker: {}", id, e);
            let _ = tx.send(QueryEvent::Finished(ExecutionOutcome::Failure(
                QueryError::EngineInit(format!("failed to spawn query worker: {}", e)),
            )));
        }
        handle
    }
}

impl Default for ExecutionController {
    fn default() -> Self {
        ExecutionController::new(ControllerConfig::default())
    }
}
