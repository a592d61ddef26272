//! The body of a query worker thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::channel::Sender;
use log::{debug, error, info};
use parking_lot::Mutex;
use rusqlite::InterruptHandle;

use crate::catalog::QuerySnapshot;
use crate::query::executor::engine::{EngineConfig, QueryEngine};
use crate::query::executor::result::{QueryError, QueryResult, QueryResultSet};
use super::event::{ExecutionOutcome, ProgressEvent, QueryEvent};

#[derive(Default)]
struct SlotState {
    fired: bool,
    handle: Option<InterruptHandle>,
}

/// Shared between a handle and its worker so an expired deadline can stop
/// the statement running on the worker's engine.
#[derive(Default)]
pub(crate) struct InterruptSlot {
    state: Mutex<SlotState>,
}

impl InterruptSlot {
    /// Called by the handle when its deadline expires
    pub(crate) fn fire(&self) {
        let mut state = self.state.lock();
        state.fired = true;
        if let Some(handle) = state.handle.as_ref() {
            handle.interrupt();
        }
    }

    /// Called by the worker once its engine exists
    fn install(&self, handle: InterruptHandle) {
        let mut state = self.state.lock();
        if state.fired {
            handle.interrupt();
        }
        state.handle = Some(handle);
    }

    fn is_fired(&self) -> bool {
        self.state.lock().fired
    }
}

/// Keeps the controller's in-flight count accurate on every worker exit path
pub(crate) struct InFlightGuard {
    counter: Arc<AtomicUsize>,
}

impl InFlightGuard {
    /// Take a slot unconditionally
    pub(crate) fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlightGuard { counter: counter.clone() }
    }

    /// Take the only slot, or `None` if a query is already in flight
    pub(crate) fn try_acquire_exclusive(counter: &Arc<AtomicUsize>) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard { counter: counter.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything a worker owns for the lifetime of one query
pub(crate) struct Job {
    pub id: u64,
    pub sql: String,
    pub snapshot: QuerySnapshot,
    pub engine_config: EngineConfig,
    pub events: Sender<QueryEvent>,
    pub interrupt: Arc<InterruptSlot>,
    pub guard: InFlightGuard,
}

/// Run one query to a terminal outcome and send it.
///
/// The engine is dropped inside `execute_job`, before the outcome is sent.
pub(crate) fn run(job: Job) {
    let Job { id, sql, snapshot, engine_config, events, interrupt, guard } = job;
    let emit = |event: ProgressEvent| {
        debug!("Query {} progress {} ({})", id, event.percent, event.phase);
        // A dropped or timed-out handle no longer listens; nothing to do.
        let _ = events.send(QueryEvent::Progress(event));
    };

    let result = execute_job(&sql, snapshot, &engine_config, &interrupt, &emit);
    match &result {
        Ok(set) => info!("Query {} completed with {} rows", id, set.row_count()),
        Err(err) => error!("Query {} failed: {}", id, err),
    }
    drop(guard);

    // DONE and the terminal event go out back to back.
    if result.is_ok() {
        emit(ProgressEvent::DONE);
    }
    let _ = events.send(QueryEvent::Finished(ExecutionOutcome::from(result)));
}

fn execute_job(
    sql: &str,
    snapshot: QuerySnapshot,
    config: &EngineConfig,
    interrupt: &InterruptSlot,
    emit: &dyn Fn(ProgressEvent),
) -> QueryResult<QueryResultSet> {
    emit(ProgressEvent::ENGINE_INIT);
    let mut engine = QueryEngine::open(config)?;
    interrupt.install(engine.interrupt_handle());

    emit(ProgressEvent::LOADING);
    check_interrupted(interrupt)?;
    engine.load(&snapshot)?;
    drop(snapshot);

    emit(ProgressEvent::LOADED);
    check_interrupted(interrupt)?;
    engine.execute(sql)
}

fn check_interrupted(interrupt: &InterruptSlot) -> QueryResult<()> {
    if interrupt.is_fired() {
        Err(QueryError::Execution("interrupted".to_string()))
    } else {
        Ok(())
    }
}
