//! Caller-side view of one submitted query.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use log::warn;

use crate::query::executor::result::QueryError;
use super::event::{ExecutionOutcome, Phase, ProgressEvent, QueryEvent, QueryState};
use super::worker::InterruptSlot;

/// Handle returned by `ExecutionController::submit`.
///
/// Yields zero or more progress events in non-decreasing order followed by
/// exactly one `Finished` event; after that every poll returns `None`.
pub struct QueryHandle {
    id: u64,
    events: Receiver<QueryEvent>,
    deadline: Option<(Instant, Duration)>,
    interrupt: Arc<InterruptSlot>,
    state: QueryState,
}

impl QueryHandle {
    pub(crate) fn new(
        id: u64,
        events: Receiver<QueryEvent>,
        deadline: Option<Duration>,
        interrupt: Arc<InterruptSlot>,
    ) -> Self {
        QueryHandle {
            id,
            events,
            deadline: deadline.map(|d| (Instant::now() + d, d)),
            interrupt,
            state: QueryState::Submitted,
        }
    }

    /// Identifier assigned at submission
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Last state observed through this handle
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Whether the terminal event has been delivered
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Poll for the next event without blocking
    pub fn try_next(&mut self) -> Option<QueryEvent> {
        if self.is_finished() {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Disconnected) => Some(self.lost()),
            Err(TryRecvError::Empty) => match self.deadline {
                Some((at, limit)) if Instant::now() >= at => Some(self.expire(limit)),
                _ => None,
            },
        }
    }

    /// Block until the next event. Returns `None` once the terminal event has
    /// been delivered.
    pub fn next_event(&mut self) -> Option<QueryEvent> {
        if self.is_finished() {
            return None;
        }
        let received = match self.deadline {
            Some((at, limit)) => match self.events.recv_deadline(at) {
                Ok(event) => Ok(event),
                Err(RecvTimeoutError::Timeout) => return Some(self.expire(limit)),
                Err(RecvTimeoutError::Disconnected) => Err(()),
            },
            None => self.events.recv().map_err(|_| ()),
        };
        Some(match received {
            Ok(event) => self.observe(event),
            Err(()) => self.lost(),
        })
    }

    /// Block until the terminal outcome, discarding progress
    pub fn wait(self) -> ExecutionOutcome {
        self.wait_with_progress(|_| {})
    }

    /// Block until the terminal outcome, passing each progress event to `on_progress`
    pub fn wait_with_progress<F>(mut self, mut on_progress: F) -> ExecutionOutcome
    where
        F: FnMut(ProgressEvent),
    {
        while let Some(event) = self.next_event() {
            match event {
                QueryEvent::Progress(progress) => on_progress(progress),
                QueryEvent::Finished(outcome) => return outcome,
            }
        }
        // next_event only returns None after Finished was already handed out.
        ExecutionOutcome::Failure(QueryError::WorkerLost)
    }

    fn observe(&mut self, event: QueryEvent) -> QueryEvent {
        // After 100% the outcome is a success already on its way; it must not
        // turn into a timeout.
        if let QueryEvent::Progress(ProgressEvent { phase: Phase::Done, .. }) = event {
            self.deadline = None;
        }
        self.state = self.state.after(&event);
        event
    }

    fn lost(&mut self) -> QueryEvent {
        warn!("Query {} worker exited without an outcome", self.id);
        self.observe(QueryEvent::Finished(ExecutionOutcome::Failure(QueryError::WorkerLost)))
    }

    fn expire(&mut self, limit: Duration) -> QueryEvent {
        warn!("Query {} exceeded its deadline of {:?}", self.id, limit);
        self.interrupt.fire();
        self.observe(QueryEvent::Finished(ExecutionOutcome::Failure(QueryError::Timeout(limit))))
    }
}
