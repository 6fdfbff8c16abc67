use std::collections::BTreeSet;

use tracing::debug;

use retract_model::{
    DatasetCategory, Destination, PersonLinkage, PidSource, RetractionConfig, RetractionQuery,
    RetractionScope, RowCondition, TableRef, TableRule, WriteDisposition,
};

use crate::error::{PlanError, Result};
use crate::identifier::{category_id_column, resolve_identifier};

/// Sandbox destination for a plan: every delete is preceded by a copy of
/// the affected rows into `{prefix}_{dataset}_{table}` here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxPlan {
    pub dataset: String,
    pub prefix: String,
}

impl SandboxPlan {
    pub fn new(dataset: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            prefix: prefix.into(),
        }
    }

    /// Sandbox table name. Includes the source dataset so multi-dataset
    /// runs cannot collide in one sandbox dataset.
    pub fn table_name(&self, dataset: &str, physical_table: &str) -> String {
        format!("{}_{}_{}", self.prefix, dataset, physical_table)
    }
}

/// Everything needed to plan one dataset's retraction.
#[derive(Debug)]
pub struct PlanRequest<'a> {
    pub project: &'a str,
    pub dataset: &'a str,
    /// Site whose prefixed staging tables are in scope for EHR datasets.
    pub hpo_id: Option<&'a str>,
    pub scope: RetractionScope,
    pub pid_source: &'a PidSource,
    pub sandbox: &'a SandboxPlan,
    /// The dataset's catalog listing; statements are only emitted for
    /// tables that physically exist.
    pub existing_tables: &'a BTreeSet<String>,
}

/// The plan for one dataset.
#[derive(Debug, Default)]
pub struct DatasetPlan {
    /// Sandbox-then-delete pairs, in table-enumeration order.
    pub queries: Vec<RetractionQuery>,
    /// Eligible physical tables absent from the dataset's catalog listing.
    pub missing_tables: Vec<String>,
}

impl DatasetPlan {
    /// Unique sandbox table names this plan will write.
    pub fn sandbox_tables(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .queries
            .iter()
            .filter_map(|query| query.destination.as_ref())
            .map(|destination| destination.table.clone())
            .collect();
        names.into_iter().collect()
    }
}

/// Build the retraction plan for one dataset.
///
/// Tables are visited in configuration order. EHR datasets get each
/// statement twice, once for the unioned staging table and once for the
/// site's, unioned first so log output stays grouped.
pub fn build_dataset_plan(
    config: &RetractionConfig,
    request: &PlanRequest<'_>,
) -> Result<DatasetPlan> {
    let category = DatasetCategory::of(request.dataset);
    let mut plan = DatasetPlan::default();

    for rule in config.retraction_tables() {
        let condition = match rule.linkage {
            PersonLinkage::Direct => {
                match resolve_identifier(config, category, request.scope, rule) {
                    Some(strategy) => RowCondition::PersonIn {
                        id_column: strategy.id_column.to_string(),
                        pids: request.pid_source.expr(strategy.id_column),
                        guard: strategy.guard,
                    },
                    None => continue,
                }
            }
            PersonLinkage::FactRelationship => {
                let id_column = category_id_column(category);
                RowCondition::FactPersonIn {
                    person_domain_concept_id: config.person_domain_concept_id,
                    pids: request.pid_source.expr(id_column),
                }
            }
            PersonLinkage::None => continue,
        };

        for physical in physical_names(category, rule, request)? {
            if !request.existing_tables.contains(&physical) {
                debug!(
                    dataset = request.dataset,
                    table = %physical,
                    "table absent from catalog listing; statement suppressed"
                );
                plan.missing_tables.push(physical);
                continue;
            }
            push_pair(&mut plan.queries, request, &physical, condition.clone());
        }
    }

    Ok(plan)
}

/// The physical table names a logical table occupies in this dataset.
fn physical_names(
    category: DatasetCategory,
    rule: &TableRule,
    request: &PlanRequest<'_>,
) -> Result<Vec<String>> {
    match category {
        DatasetCategory::Ehr => {
            let hpo_id = request.hpo_id.ok_or_else(|| PlanError::MissingHpoId {
                dataset: request.dataset.to_string(),
            })?;
            Ok(vec![
                format!("unioned_ehr_{}", rule.name),
                format!("{hpo_id}_{}", rule.name),
            ])
        }
        _ => Ok(vec![rule.name.clone()]),
    }
}

fn push_pair(
    queries: &mut Vec<RetractionQuery>,
    request: &PlanRequest<'_>,
    physical: &str,
    condition: RowCondition,
) {
    let target = TableRef::new(request.project, request.dataset, physical);
    let destination = Destination {
        dataset: request.sandbox.dataset.clone(),
        table: request.sandbox.table_name(request.dataset, physical),
        disposition: WriteDisposition::Truncate,
    };
    queries.push(RetractionQuery::select_into(target.clone(), condition.clone(), destination).batched());
    queries.push(RetractionQuery::delete(target, condition).batched());
}
