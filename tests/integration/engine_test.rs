use anyhow::Result;
use tabsql::catalog::{DataType, QuerySnapshot, TableRegistry};
use tabsql::query::{DataValue, EngineConfig, QueryEngine, QueryError};

#[path = "../common/mod.rs"]
mod common;
use common::{join_registry, numbers_table, sales_table};

fn run(snapshot: &QuerySnapshot, sql: &str) -> Result<tabsql::query::QueryResultSet, QueryError> {
    QueryEngine::build(snapshot, &EngineConfig::default())?.execute(sql)
}

#[test]
fn test_count_matches_row_count() -> Result<()> {
    for n in [0, 1, 7, 250] {
        let mut registry = TableRegistry::new();
        registry.register("t", numbers_table(n))?;

        let result = run(&registry.snapshot(), "SELECT COUNT(*) FROM t")?;
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.column_count(), 1);
        assert_eq!(result.rows()[0].get(0), Some(&DataValue::Integer(n)));
    }
    Ok(())
}

#[test]
fn test_two_table_join() -> Result<()> {
    let result = run(&join_registry().snapshot(), "SELECT a.v, b.w FROM a JOIN b ON a.id=b.id")?;

    assert_eq!(result.column_names(), vec!["v", "w"]);
    assert_eq!(result.row_count(), 1);
    assert_eq!(
        result.rows()[0].values(),
        &[DataValue::Text("x".to_string()), DataValue::Integer(10)]
    );
    Ok(())
}

#[test]
fn test_outer_joins_pass_through() -> Result<()> {
    let snapshot = join_registry().snapshot();
    let result = run(&snapshot, "SELECT a.id, b.w FROM a LEFT JOIN b ON a.id = b.id ORDER BY a.id")?;
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.value(1, "w"), Some(&DataValue::Null));

    let result = run(&snapshot, "SELECT COUNT(*) FROM a CROSS JOIN b")?;
    assert_eq!(result.rows()[0].get(0), Some(&DataValue::Integer(4)));
    Ok(())
}

#[test]
fn test_aggregates_case_and_window_functions() -> Result<()> {
    let mut registry = TableRegistry::new();
    registry.register("sales", sales_table(28))?;
    let snapshot = registry.snapshot();

    let grouped = run(&snapshot, "SELECT region, COUNT(*) AS n, SUM(amount) AS total FROM sales GROUP BY region ORDER BY region")?;
    assert_eq!(grouped.row_count(), 4);
    assert_eq!(grouped.value(0, "region"), Some(&DataValue::Text("east".to_string())));
    assert_eq!(grouped.value(0, "n"), Some(&DataValue::Integer(7)));
    assert_eq!(grouped.columns()[2].data_type(), DataType::Float);

    let cased = run(&snapshot, "SELECT SUM(CASE WHEN promo THEN 1 ELSE 0 END) AS promos FROM sales")?;
    assert_eq!(cased.value(0, "promos"), Some(&DataValue::Integer(10)));

    let windowed = run(
        &snapshot,
        "SELECT id, ROW_NUMBER() OVER (PARTITION BY region ORDER BY id) AS rn FROM sales ORDER BY id LIMIT 5",
    )?;
    let ranks: Vec<_> = (0..5).map(|i| windowed.value(i, "rn").cloned()).collect();
    assert_eq!(ranks, vec![
        Some(DataValue::Integer(1)),
        Some(DataValue::Integer(1)),
        Some(DataValue::Integer(1)),
        Some(DataValue::Integer(1)),
        Some(DataValue::Integer(2)),
    ]);
    Ok(())
}

#[test]
fn test_temporal_and_boolean_columns_keep_their_kind() -> Result<()> {
    let mut registry = TableRegistry::new();
    registry.register("sales", sales_table(3))?;

    let result = run(&registry.snapshot(), "SELECT day, sold_at, promo FROM sales ORDER BY id")?;
    let kinds: Vec<DataType> = result.columns().iter().map(|c| c.data_type()).collect();
    assert_eq!(kinds, vec![DataType::Date, DataType::Timestamp, DataType::Boolean]);
    assert_eq!(result.value(0, "day"), Some(&DataValue::Date("2024-01-01".to_string())));
    assert_eq!(result.value(0, "sold_at"), Some(&DataValue::Timestamp("2024-01-01 12:30:00".to_string())));
    assert_eq!(result.value(1, "promo"), Some(&DataValue::Boolean(false)));

    let filtered = run(&registry.snapshot(), "SELECT COUNT(*) FROM sales WHERE day >= date('2024-01-02')")?;
    assert_eq!(filtered.rows()[0].get(0), Some(&DataValue::Integer(2)));
    Ok(())
}

#[test]
fn test_engine_diagnostics_are_verbatim() -> Result<()> {
    let snapshot = join_registry().snapshot();

    let err = run(&snapshot, "SELEC * FROM a").unwrap_err();
    assert!(matches!(err, QueryError::Execution(_)));
    assert!(err.message().contains("syntax error"), "unexpected message: {}", err.message());

    let err = run(&snapshot, "SELECT * FROM nope").unwrap_err();
    assert!(err.message().contains("no such table: nope"));

    let err = run(&snapshot, "SELECT missing FROM a").unwrap_err();
    assert!(err.message().contains("no such column: missing"));
    Ok(())
}

#[test]
fn test_statements_only_touch_the_private_store() -> Result<()> {
    let registry = join_registry();
    let result = run(&registry.snapshot(), "DELETE FROM a")?;
    assert_eq!(result.column_count(), 0);

    // A fresh engine built from the registry still sees both rows.
    let again = run(&registry.snapshot(), "SELECT COUNT(*) FROM a")?;
    assert_eq!(again.rows()[0].get(0), Some(&DataValue::Integer(2)));
    assert_eq!(registry.get("a").map(|t| t.row_count()), Some(2));
    Ok(())
}

#[test]
fn test_engine_lists_loaded_relations() -> Result<()> {
    let engine = QueryEngine::build(&join_registry().snapshot(), &EngineConfig::default())?;
    assert_eq!(engine.table_names(), &["a".to_string(), "b".to_string()]);
    Ok(())
}
