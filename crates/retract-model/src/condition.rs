use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::pid::TableRef;

/// A single cell in an in-memory row. Dates travel as ISO-8601 text, the
/// way the warehouse catalog snapshot carries them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Text(String),
    Null,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Text(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }
}

/// An in-memory table row, column name to value.
pub type Row = BTreeMap<String, Value>;

/// The pid set bound to an identifier column, renderable inside `IN (...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidExpr {
    List(Vec<i64>),
    Subquery { table: TableRef, id_column: String },
}

impl PidExpr {
    pub fn sql(&self) -> String {
        match self {
            Self::List(pids) => {
                let rendered: Vec<String> = pids.iter().map(ToString::to_string).collect();
                rendered.join(", ")
            }
            Self::Subquery { table, id_column } => {
                format!("SELECT {id_column} FROM `{table}`")
            }
        }
    }
}

/// Registry-range guard: only rows whose surrogate id exceeds the threshold
/// are in scope. Registry-origin rows are assigned ids from the disjoint
/// low range and must never be matched by EHR-scoped retraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGuard {
    pub column: String,
    pub threshold: i64,
}

/// The typed predicate a retraction statement applies.
///
/// Each variant renders to a SQL `WHERE` body and also evaluates directly
/// against in-memory rows, so the rendered statement and the test double
/// cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowCondition {
    /// `{id_column} IN (pids) [AND {guard.column} > {guard.threshold}]`
    PersonIn {
        id_column: String,
        pids: PidExpr,
        guard: Option<IdGuard>,
    },
    /// The person reference can occupy either foreign-key slot of
    /// `fact_relationship`; each slot only counts when its domain concept
    /// tag says the slot holds a person.
    FactPersonIn {
        person_domain_concept_id: i64,
        pids: PidExpr,
    },
    /// One deactivated participant's records past the cutoff date.
    DeactivatedAfter {
        id_column: String,
        person_id: i64,
        date_column: String,
        cutoff: NaiveDate,
    },
}

impl RowCondition {
    /// The pid expression this condition selects on, if any.
    pub fn pid_expr(&self) -> Option<&PidExpr> {
        match self {
            Self::PersonIn { pids, .. } | Self::FactPersonIn { pids, .. } => Some(pids),
            Self::DeactivatedAfter { .. } => None,
        }
    }

    /// Render the `WHERE` body of this condition.
    pub fn sql(&self) -> String {
        match self {
            Self::PersonIn {
                id_column,
                pids,
                guard,
            } => {
                let mut sql = format!("{id_column} IN ({})", pids.sql());
                if let Some(guard) = guard {
                    sql.push_str(&format!(" AND {} > {}", guard.column, guard.threshold));
                }
                sql
            }
            Self::FactPersonIn {
                person_domain_concept_id,
                pids,
            } => {
                let pids = pids.sql();
                format!(
                    "(domain_concept_id_1 = {person_domain_concept_id} AND fact_id_1 IN ({pids})) \
                     OR (domain_concept_id_2 = {person_domain_concept_id} AND fact_id_2 IN ({pids}))"
                )
            }
            Self::DeactivatedAfter {
                id_column,
                person_id,
                date_column,
                cutoff,
            } => {
                format!("{id_column} = {person_id} AND {date_column} > '{cutoff}'")
            }
        }
    }

    /// Evaluate against an in-memory row. `pids` is the resolved id set for
    /// the pid-based variants; `DeactivatedAfter` ignores it. A row whose
    /// relevant cells are missing or untypable never matches; ambiguity
    /// errs toward retention.
    pub fn matches(&self, row: &Row, pids: &BTreeSet<i64>) -> bool {
        match self {
            Self::PersonIn {
                id_column, guard, ..
            } => {
                let in_pids = row
                    .get(id_column)
                    .and_then(Value::as_i64)
                    .is_some_and(|id| pids.contains(&id));
                if !in_pids {
                    return false;
                }
                match guard {
                    Some(guard) => row
                        .get(&guard.column)
                        .and_then(Value::as_i64)
                        .is_some_and(|id| id > guard.threshold),
                    None => true,
                }
            }
            Self::FactPersonIn {
                person_domain_concept_id,
                ..
            } => {
                let slot = |concept_column: &str, fact_column: &str| {
                    row.get(concept_column)
                        .and_then(Value::as_i64)
                        .is_some_and(|concept| concept == *person_domain_concept_id)
                        && row
                            .get(fact_column)
                            .and_then(Value::as_i64)
                            .is_some_and(|id| pids.contains(&id))
                };
                slot("domain_concept_id_1", "fact_id_1") || slot("domain_concept_id_2", "fact_id_2")
            }
            Self::DeactivatedAfter {
                id_column,
                person_id,
                date_column,
                cutoff,
            } => {
                row.get(id_column)
                    .and_then(Value::as_i64)
                    .is_some_and(|id| id == *person_id)
                    && row
                        .get(date_column)
                        .and_then(Value::as_date)
                        .is_some_and(|date| date > *cutoff)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, Value)]) -> Row {
        cells
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_literal_list_renders_inside_in() {
        let pids = PidExpr::List(vec![1, 2, 3]);
        assert_eq!(format!("WHERE x IN ({})", pids.sql()), "WHERE x IN (1, 2, 3)");
    }

    #[test]
    fn test_subquery_renders_exact_table_and_column() {
        let pids = PidExpr::Subquery {
            table: TableRef::new("proj", "sandbox", "pids"),
            id_column: "research_id".to_string(),
        };
        assert_eq!(pids.sql(), "SELECT research_id FROM `proj.sandbox.pids`");
    }

    #[test]
    fn test_person_in_with_guard_sql() {
        let condition = RowCondition::PersonIn {
            id_column: "person_id".to_string(),
            pids: PidExpr::List(vec![42]),
            guard: Some(IdGuard {
                column: "condition_occurrence_id".to_string(),
                threshold: 2000,
            }),
        };
        assert_eq!(
            condition.sql(),
            "person_id IN (42) AND condition_occurrence_id > 2000"
        );
    }

    #[test]
    fn test_guard_excludes_registry_range_rows() {
        let condition = RowCondition::PersonIn {
            id_column: "person_id".to_string(),
            pids: PidExpr::List(vec![42]),
            guard: Some(IdGuard {
                column: "condition_occurrence_id".to_string(),
                threshold: 2000,
            }),
        };
        let pids: BTreeSet<i64> = [42].into_iter().collect();
        let ehr_row = row(&[
            ("person_id", Value::Int(42)),
            ("condition_occurrence_id", Value::Int(3000)),
        ]);
        let rdr_row = row(&[
            ("person_id", Value::Int(42)),
            ("condition_occurrence_id", Value::Int(500)),
        ]);
        assert!(condition.matches(&ehr_row, &pids));
        assert!(!condition.matches(&rdr_row, &pids));
    }

    #[test]
    fn test_fact_relationship_matches_either_slot() {
        let condition = RowCondition::FactPersonIn {
            person_domain_concept_id: 56,
            pids: PidExpr::List(vec![42]),
        };
        let pids: BTreeSet<i64> = [42].into_iter().collect();
        let person_first = row(&[
            ("domain_concept_id_1", Value::Int(56)),
            ("fact_id_1", Value::Int(42)),
            ("domain_concept_id_2", Value::Int(27)),
            ("fact_id_2", Value::Int(900)),
        ]);
        let person_second = row(&[
            ("domain_concept_id_1", Value::Int(27)),
            ("fact_id_1", Value::Int(900)),
            ("domain_concept_id_2", Value::Int(56)),
            ("fact_id_2", Value::Int(42)),
        ]);
        // Same id in a slot not tagged as a person must not match.
        let untagged = row(&[
            ("domain_concept_id_1", Value::Int(27)),
            ("fact_id_1", Value::Int(42)),
            ("domain_concept_id_2", Value::Int(27)),
            ("fact_id_2", Value::Int(42)),
        ]);
        assert!(condition.matches(&person_first, &pids));
        assert!(condition.matches(&person_second, &pids));
        assert!(!condition.matches(&untagged, &pids));
    }

    #[test]
    fn test_deactivated_after_date_comparison() {
        let condition = RowCondition::DeactivatedAfter {
            id_column: "person_id".to_string(),
            person_id: 42,
            date_column: "visit_end_date".to_string(),
            cutoff: NaiveDate::from_ymd_opt(2019, 6, 1).unwrap(),
        };
        let empty = BTreeSet::new();
        let after = row(&[
            ("person_id", Value::Int(42)),
            ("visit_end_date", Value::Text("2020-06-01".to_string())),
        ]);
        let before = row(&[
            ("person_id", Value::Int(42)),
            ("visit_end_date", Value::Text("2019-01-01".to_string())),
        ]);
        let unparseable = row(&[
            ("person_id", Value::Int(42)),
            ("visit_end_date", Value::Text("not-a-date".to_string())),
        ]);
        assert!(condition.matches(&after, &empty));
        assert!(!condition.matches(&before, &empty));
        assert!(!condition.matches(&unparseable, &empty));
        assert_eq!(
            condition.sql(),
            "person_id = 42 AND visit_end_date > '2019-06-01'"
        );
    }
}
