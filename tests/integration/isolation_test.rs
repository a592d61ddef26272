use anyhow::{anyhow, Result};
use tabsql::catalog::{QuerySnapshot, TableRegistry};
use tabsql::query::{DataValue, EngineConfig, ExecutionController, QueryEngine};

#[path = "../common/mod.rs"]
mod common;
use common::{join_left, join_registry, join_right, numbers_table};

const JOIN: &str = "SELECT a.v, b.w FROM a JOIN b ON a.id=b.id ORDER BY a.v";

fn direct(snapshot: &QuerySnapshot, sql: &str) -> Result<tabsql::query::QueryResultSet> {
    Ok(QueryEngine::build(snapshot, &EngineConfig::default())?.execute(sql)?)
}

#[test]
fn test_mutation_after_submit_does_not_leak_into_the_query() -> Result<()> {
    let mut registry = join_registry();
    let expected = direct(&registry.snapshot(), JOIN)?;

    let controller = ExecutionController::default();
    let handle = controller.submit_from(JOIN, &registry);

    // Every kind of mutation, applied while the worker may still be loading.
    registry.replace("a", numbers_table(5))?;
    registry.remove("b")?;
    registry.register("b", join_left())?;
    registry.rename("b", "c")?;
    registry.clear();

    let result = handle.wait().into_result().map_err(|e| anyhow!(e))?;
    assert_eq!(result, expected);
    Ok(())
}

#[test]
fn test_snapshot_outlives_the_registry() -> Result<()> {
    let snapshot = {
        let registry = join_registry();
        registry.snapshot()
    };

    let controller = ExecutionController::default();
    let result = controller.submit(JOIN, snapshot).wait().into_result().map_err(|e| anyhow!(e))?;
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.value(0, "w"), Some(&DataValue::Integer(10)));
    Ok(())
}

#[test]
fn test_later_submission_sees_the_new_state() -> Result<()> {
    let mut registry = TableRegistry::new();
    registry.register("a", join_left())?;
    registry.register("b", join_right())?;
    let controller = ExecutionController::default();

    let before = controller.submit_from("SELECT COUNT(*) FROM a", &registry);
    registry.replace("a", numbers_table(9))?;
    let after = controller.submit_from("SELECT COUNT(*) FROM a", &registry);

    let count = |r: tabsql::query::QueryResultSet| r.rows()[0].get(0).cloned();
    assert_eq!(count(before.wait().into_result().map_err(|e| anyhow!(e))?), Some(DataValue::Integer(2)));
    assert_eq!(count(after.wait().into_result().map_err(|e| anyhow!(e))?), Some(DataValue::Integer(9)));
    Ok(())
}

#[test]
fn test_statements_inside_a_query_never_reach_the_registry() -> Result<()> {
    let registry = join_registry();
    let controller = ExecutionController::default();

    for sql in ["DROP TABLE a", "DELETE FROM b", "CREATE TABLE extra (x INTEGER)", "ALTER TABLE a RENAME TO z"] {
        assert!(controller.submit_from(sql, &registry).wait().is_success(), "{} failed", sql);
    }

    assert_eq!(registry.names(), vec!["a", "b"]);
    assert_eq!(registry.get("a"), Some(&join_left()));
    assert_eq!(registry.get("b"), Some(&join_right()));
    Ok(())
}
