//! End-to-end pid retraction against the in-memory warehouse.

use std::collections::BTreeMap;

use retract_model::{
    PidSource, RetractionConfig, RetractionQuery, RetractionScope, Row, RowCondition, TableRef,
    Value,
};
use retract_plan::SandboxPlan;
use retract_run::{
    CleaningRule, PidRetractionRule, RunError, drop_empty_sandbox_tables, run_queries, run_rule,
    verify_pid_table,
};
use retract_warehouse::{ColumnInfo, ColumnType, MemoryWarehouse, QueryExecutor};

fn row(cells: &[(&str, i64)]) -> Row {
    cells
        .iter()
        .map(|(name, value)| ((*name).to_string(), Value::Int(*value)))
        .collect()
}

fn int_columns(names: &[&str]) -> Vec<ColumnInfo> {
    names
        .iter()
        .map(|name| ColumnInfo::new(name, ColumnType::Integer))
        .collect()
}

/// Warehouse with a combined dataset, a pid table in the sandbox dataset,
/// and rows straddling the registry/EHR id boundary (factor 1000, so the
/// guard threshold is 2000).
fn seed() -> MemoryWarehouse {
    let mut warehouse = MemoryWarehouse::new();
    warehouse.insert_table(
        &TableRef::new("proj", "combined123", "condition_occurrence"),
        int_columns(&["person_id", "condition_occurrence_id"]),
        vec![
            // EHR-origin row: surrogate id 3 * factor, above the threshold
            row(&[("person_id", 42), ("condition_occurrence_id", 3000)]),
            // registry-origin row: surrogate id factor / 2, below threshold
            row(&[("person_id", 42), ("condition_occurrence_id", 500)]),
            // unrelated participant
            row(&[("person_id", 7), ("condition_occurrence_id", 2500)]),
        ],
    );
    warehouse.insert_table(
        &TableRef::new("proj", "sandbox", "pids"),
        int_columns(&["person_id", "research_id"]),
        vec![{
            let mut pid_row = row(&[("person_id", 42)]);
            pid_row.insert("research_id".to_string(), Value::Int(9001));
            pid_row
        }],
    );
    // ensure the sandbox dataset exists even before any copy lands
    warehouse.insert_table(
        &TableRef::new("proj", "sandbox", "placeholder"),
        Vec::new(),
        Vec::new(),
    );
    warehouse
}

fn config() -> RetractionConfig {
    RetractionConfig {
        id_constant_factor: 1000,
        ..RetractionConfig::default()
    }
}

#[test]
fn test_only_ehr_retraction_respects_provenance_boundary() {
    let mut warehouse = seed();
    let mut rule = PidRetractionRule::gather(
        config(),
        &warehouse,
        "proj",
        &["combined123".to_string()],
        "nyc_hpo",
        RetractionScope::OnlyEhr,
        PidSource::table(TableRef::new("proj", "sandbox", "pids")),
        SandboxPlan::new("sandbox", "retract"),
    )
    .unwrap();

    let outcomes = run_rule(&mut rule, &mut warehouse).unwrap();
    assert!(!outcomes.is_empty());

    let remaining = warehouse
        .rows(&TableRef::new("proj", "combined123", "condition_occurrence"))
        .unwrap();
    // The EHR-origin row is gone; the registry-origin row survives, as does
    // the unrelated participant's row.
    assert_eq!(remaining.len(), 2);
    let surrogate_ids: Vec<i64> = remaining
        .iter()
        .filter_map(|row| row.get("condition_occurrence_id").and_then(Value::as_i64))
        .collect();
    assert!(surrogate_ids.contains(&500));
    assert!(surrogate_ids.contains(&2500));
    assert!(!surrogate_ids.contains(&3000));

    // The sandbox holds exactly the deleted row.
    let sandboxed = warehouse
        .rows(&TableRef::new(
            "proj",
            "sandbox",
            "retract_combined123_condition_occurrence",
        ))
        .unwrap();
    assert_eq!(sandboxed.len(), 1);
    assert_eq!(
        sandboxed[0].get("condition_occurrence_id").and_then(Value::as_i64),
        Some(3000)
    );
}

#[test]
fn test_rdr_and_ehr_retraction_removes_both_rows() {
    let mut warehouse = seed();
    let mut rule = PidRetractionRule::gather(
        config(),
        &warehouse,
        "proj",
        &["combined123".to_string()],
        "nyc_hpo",
        RetractionScope::RdrAndEhr,
        PidSource::literal([42]).unwrap(),
        SandboxPlan::new("sandbox", "retract"),
    )
    .unwrap();

    run_rule(&mut rule, &mut warehouse).unwrap();

    let remaining = warehouse
        .rows(&TableRef::new("proj", "combined123", "condition_occurrence"))
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining[0].get("person_id").and_then(Value::as_i64),
        Some(7)
    );
}

#[test]
fn test_listing_failure_aborts_gathering() {
    let warehouse = seed();
    let result = PidRetractionRule::gather(
        config(),
        &warehouse,
        "proj",
        &["combined123".to_string(), "absent_dataset".to_string()],
        "nyc_hpo",
        RetractionScope::OnlyEhr,
        PidSource::literal([42]).unwrap(),
        SandboxPlan::new("sandbox", "retract"),
    );
    assert!(matches!(result, Err(RunError::Warehouse(_))));
}

#[test]
fn test_pid_table_schema_contract_enforced() {
    let mut warehouse = seed();
    warehouse.insert_table(
        &TableRef::new("proj", "sandbox", "bad_pids"),
        int_columns(&["person_id"]),
        Vec::new(),
    );
    assert!(verify_pid_table(&warehouse, &TableRef::new("proj", "sandbox", "pids")).is_ok());
    assert!(matches!(
        verify_pid_table(&warehouse, &TableRef::new("proj", "sandbox", "bad_pids")),
        Err(RunError::PidTableColumn { column, .. }) if column == "research_id"
    ));
}

#[test]
fn test_runner_propagates_mid_batch_failure() {
    let mut warehouse = seed();
    let good = RetractionQuery::delete(
        TableRef::new("proj", "combined123", "condition_occurrence"),
        RowCondition::PersonIn {
            id_column: "person_id".to_string(),
            pids: retract_model::PidExpr::List(vec![42]),
            guard: None,
        },
    );
    let bad = RetractionQuery::delete(
        TableRef::new("proj", "combined123", "no_such_table"),
        RowCondition::PersonIn {
            id_column: "person_id".to_string(),
            pids: retract_model::PidExpr::List(vec![42]),
            guard: None,
        },
    );
    let queries = vec![good, bad];
    let result = run_queries(&mut warehouse, &queries);
    assert!(result.is_err());
    // The first delete already applied; there is no rollback.
    let remaining = warehouse
        .rows(&TableRef::new("proj", "combined123", "condition_occurrence"))
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn test_empty_sandbox_tables_are_dropped() {
    let mut warehouse = seed();
    let empty = TableRef::new("proj", "sandbox", "retract_combined123_observation");
    let full = TableRef::new("proj", "sandbox", "retract_combined123_condition_occurrence");
    warehouse.insert_table(&empty, int_columns(&["person_id"]), Vec::new());
    warehouse.insert_table(
        &full,
        int_columns(&["person_id"]),
        vec![row(&[("person_id", 42)])],
    );

    let catalog = warehouse.clone();
    let dropped = drop_empty_sandbox_tables(
        &catalog,
        &mut warehouse,
        "proj",
        "sandbox",
        &[
            "retract_combined123_observation".to_string(),
            "retract_combined123_condition_occurrence".to_string(),
            "retract_combined123_never_created".to_string(),
        ],
    )
    .unwrap();

    assert_eq!(dropped, vec!["retract_combined123_observation".to_string()]);
    assert!(warehouse.rows(&empty).is_none());
    assert!(warehouse.rows(&full).is_some());
}

#[test]
fn test_sandbox_validation_spots_missing_tables() {
    let mut warehouse = seed();
    let rule = PidRetractionRule::gather(
        config(),
        &warehouse,
        "proj",
        &["combined123".to_string()],
        "nyc_hpo",
        RetractionScope::OnlyEhr,
        PidSource::literal([42]).unwrap(),
        SandboxPlan::new("sandbox", "retract"),
    )
    .unwrap();

    // Execute only the deletes, skipping the sandbox copies: validation
    // must notice the missing sandbox tables.
    let specs = rule.get_query_specs().unwrap();
    let deletes: Vec<_> = specs
        .into_iter()
        .filter(|query| query.destination.is_none())
        .collect();
    for query in &deletes {
        warehouse.execute(query).unwrap();
    }
    let catalog = warehouse.clone();
    assert!(matches!(
        rule.validate_rule(&catalog),
        Err(RunError::Validation { .. })
    ));
}

#[test]
fn test_statement_order_is_catalog_order_per_dataset() {
    let warehouse = seed();
    let rule = PidRetractionRule::gather(
        config(),
        &warehouse,
        "proj",
        &["combined123".to_string()],
        "nyc_hpo",
        RetractionScope::OnlyEhr,
        PidSource::literal([42]).unwrap(),
        SandboxPlan::new("sandbox", "retract"),
    )
    .unwrap();
    let specs = rule.get_query_specs().unwrap();
    // only condition_occurrence exists in the seed dataset
    let targets: BTreeMap<String, usize> =
        specs
            .iter()
            .fold(BTreeMap::new(), |mut counts, query| {
                *counts.entry(query.target.table.clone()).or_insert(0) += 1;
                counts
            });
    assert_eq!(targets.len(), 1);
    assert_eq!(targets.get("condition_occurrence"), Some(&2));
}
