use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tabsql::catalog::{Column, DataType, QuerySnapshot, Table, TableRegistry};
use tabsql::query::{
    ConcurrencyPolicy, ControllerConfig, DataValue, ExecutionController, ExecutionOutcome, Phase,
    QueryError, QueryEvent, QueryState,
};

#[path = "../common/mod.rs"]
mod common;
use common::{join_registry, numbers_table};

/// Query that keeps SQLite busy for a while on any machine
const SLOW_QUERY: &str = "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 5000000) SELECT COUNT(*) FROM c";

/// Drain a handle, returning every progress percent seen and the outcome
fn collect(handle: tabsql::query::QueryHandle) -> (Vec<u8>, ExecutionOutcome) {
    let mut percents = Vec::new();
    let outcome = handle.wait_with_progress(|p| percents.push(p.percent));
    (percents, outcome)
}

#[test]
fn test_success_progress_is_ordered_and_ends_at_100() -> Result<()> {
    let controller = ExecutionController::default();
    let handle = controller.submit_from("SELECT a.v, b.w FROM a JOIN b ON a.id=b.id", &join_registry());
    let (percents, outcome) = collect(handle);

    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "progress went backwards: {:?}", percents);
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.iter().all(|p| *p <= 100));

    let result = outcome.into_result().map_err(|e| anyhow!(e))?;
    assert_eq!(result.rows()[0].values(), &[DataValue::Text("x".to_string()), DataValue::Integer(10)]);
    Ok(())
}

#[test]
fn test_malformed_sql_yields_exactly_one_failure() -> Result<()> {
    let registry = join_registry();
    let names_before: Vec<String> = registry.names().iter().map(|s| s.to_string()).collect();
    let controller = ExecutionController::default();
    let mut handle = controller.submit_from("SELEC * FROM a", &registry);

    let mut finished = Vec::new();
    let mut percents = Vec::new();
    while let Some(event) = handle.next_event() {
        match event {
            QueryEvent::Progress(p) => percents.push(p.percent),
            QueryEvent::Finished(outcome) => finished.push(outcome),
        }
    }

    assert_eq!(finished.len(), 1);
    match &finished[0] {
        ExecutionOutcome::Failure(err) => assert!(err.message().contains("syntax error")),
        ExecutionOutcome::Success(_) => panic!("malformed SQL must not succeed"),
    }
    assert!(!percents.contains(&100));
    assert_eq!(handle.state(), QueryState::Failed);
    assert_eq!(registry.names(), names_before);
    Ok(())
}

#[test]
fn test_load_failure_is_reported_as_engine_init() -> Result<()> {
    let bad = Table::new(
        vec![Column::new("n", DataType::Integer)],
        vec![vec![DataValue::Boolean(true)]],
    )?;
    let controller = ExecutionController::default();
    let handle = controller.submit("SELECT * FROM bad", QuerySnapshot::from_tables(vec![("bad".to_string(), bad)]));
    let (percents, outcome) = collect(handle);

    assert!(matches!(outcome, ExecutionOutcome::Failure(QueryError::EngineInit(_))));
    assert!(!percents.contains(&100));
    assert!(!percents.contains(&50));
    Ok(())
}

#[test]
fn test_submit_does_not_block_the_caller() -> Result<()> {
    let controller = ExecutionController::default();
    let started = Instant::now();
    let handle = controller.submit(SLOW_QUERY, QuerySnapshot::default());
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!handle.is_finished());

    let outcome = handle.wait();
    assert_eq!(
        outcome.into_result().map_err(|e| anyhow!(e))?.rows()[0].get(0),
        Some(&DataValue::Integer(5_000_000))
    );
    Ok(())
}

#[test]
fn test_try_next_polls_without_blocking() -> Result<()> {
    let controller = ExecutionController::default();
    let mut handle = controller.submit("SELECT COUNT(*) FROM t", {
        let mut registry = TableRegistry::new();
        registry.register("t", numbers_table(100))?;
        registry.snapshot()
    });

    let mut phases = Vec::new();
    let outcome = loop {
        match handle.try_next() {
            Some(QueryEvent::Progress(p)) => phases.push(p.phase),
            Some(QueryEvent::Finished(outcome)) => break outcome,
            None => thread::sleep(Duration::from_millis(1)),
        }
    };

    assert!(outcome.is_success());
    assert_eq!(phases, vec![Phase::EngineInit, Phase::Load, Phase::Execute, Phase::Done]);
    assert!(handle.try_next().is_none());
    Ok(())
}

#[test]
fn test_unbounded_policy_runs_submissions_independently() -> Result<()> {
    let controller = ExecutionController::new(ControllerConfig {
        policy: ConcurrencyPolicy::Unbounded,
        ..ControllerConfig::default()
    });

    let handles: Vec<_> = (1..=6)
        .map(|n| {
            let mut registry = TableRegistry::new();
            registry.register("t", numbers_table(n)).unwrap();
            (n, controller.submit_from("SELECT COUNT(*) FROM t", &registry))
        })
        .collect();

    for (n, handle) in handles {
        let result = handle.wait().into_result().map_err(|e| anyhow!(e))?;
        assert_eq!(result.rows()[0].get(0), Some(&DataValue::Integer(n)));
    }
    Ok(())
}

#[test]
fn test_single_slot_policy_rejects_while_busy() -> Result<()> {
    let controller = ExecutionController::new(ControllerConfig {
        policy: ConcurrencyPolicy::SingleSlot,
        ..ControllerConfig::default()
    });

    let slow = controller.submit(SLOW_QUERY, QuerySnapshot::default());
    assert_eq!(controller.in_flight(), 1);

    let rejected = controller.submit("SELECT 1", QuerySnapshot::default());
    let (percents, outcome) = collect(rejected);
    assert!(percents.is_empty());
    assert_eq!(outcome, ExecutionOutcome::Failure(QueryError::Busy));

    assert!(slow.wait().is_success());
    assert_eq!(controller.in_flight(), 0);

    // The slot is free again once the terminal outcome has been delivered.
    assert!(controller.submit("SELECT 1", QuerySnapshot::default()).wait().is_success());
    Ok(())
}

#[test]
fn test_deadline_fails_the_handle_and_releases_the_worker() -> Result<()> {
    let controller = ExecutionController::new(ControllerConfig {
        deadline: Some(Duration::from_millis(50)),
        ..ControllerConfig::default()
    });

    let handle = controller.submit(SLOW_QUERY, QuerySnapshot::default());
    let (percents, outcome) = collect(handle);
    assert_eq!(outcome, ExecutionOutcome::Failure(QueryError::Timeout(Duration::from_millis(50))));
    assert!(!percents.contains(&100));

    // The interrupted worker still tears down its engine and exits.
    let waited = Instant::now();
    while controller.in_flight() > 0 {
        assert!(waited.elapsed() < Duration::from_secs(10), "worker never exited");
        thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}
