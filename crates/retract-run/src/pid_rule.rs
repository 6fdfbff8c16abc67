use std::collections::BTreeSet;

use tracing::debug;

use retract_model::{PidSource, RetractionConfig, RetractionQuery, RetractionScope, TableRef};
use retract_plan::{PERSON_ID, PlanRequest, RESEARCH_ID, SandboxPlan, build_dataset_plan};
use retract_warehouse::WarehouseCatalog;

use crate::error::{Result, RunError};
use crate::rule::CleaningRule;

/// Check that a pid table honors the `{person_id, research_id}` schema
/// contract before any statement is built against it.
pub fn verify_pid_table(catalog: &dyn WarehouseCatalog, table: &TableRef) -> Result<()> {
    let columns = catalog.table_columns(table)?;
    for required in [PERSON_ID, RESEARCH_ID] {
        if !columns
            .iter()
            .any(|column| column.name.eq_ignore_ascii_case(required))
        {
            return Err(RunError::PidTableColumn {
                table: table.clone(),
                column: required.to_string(),
            });
        }
    }
    Ok(())
}

/// Ad hoc pid retraction across a caller-supplied dataset list.
///
/// Catalog listings are gathered eagerly at construction; a listing failure
/// aborts the whole run rather than silently narrowing its scope, since
/// this is a targeted, supervised operation.
pub struct PidRetractionRule {
    config: RetractionConfig,
    project: String,
    hpo_id: String,
    scope: RetractionScope,
    pid_source: PidSource,
    sandbox: SandboxPlan,
    datasets: Vec<(String, BTreeSet<String>)>,
}

impl PidRetractionRule {
    #[allow(clippy::too_many_arguments)]
    pub fn gather(
        config: RetractionConfig,
        catalog: &dyn WarehouseCatalog,
        project: &str,
        dataset_ids: &[String],
        hpo_id: &str,
        scope: RetractionScope,
        pid_source: PidSource,
        sandbox: SandboxPlan,
    ) -> Result<Self> {
        let mut datasets = Vec::with_capacity(dataset_ids.len());
        for dataset in dataset_ids {
            let listing = catalog.list_tables(project, dataset)?;
            debug!(dataset = %dataset, table_count = listing.len(), "dataset listed");
            datasets.push((dataset.clone(), listing));
        }
        Ok(Self {
            config,
            project: project.to_string(),
            hpo_id: hpo_id.to_string(),
            scope,
            pid_source,
            sandbox,
            datasets,
        })
    }
}

impl CleaningRule for PidRetractionRule {
    fn name(&self) -> &str {
        "pid_retraction"
    }

    fn setup_rule(&mut self, catalog: &dyn WarehouseCatalog) -> Result<()> {
        if let PidSource::Table(table) = &self.pid_source {
            verify_pid_table(catalog, table)?;
        }
        Ok(())
    }

    fn get_query_specs(&self) -> Result<Vec<RetractionQuery>> {
        let mut queries = Vec::new();
        for (dataset, existing_tables) in &self.datasets {
            let plan = build_dataset_plan(
                &self.config,
                &PlanRequest {
                    project: &self.project,
                    dataset,
                    hpo_id: Some(&self.hpo_id),
                    scope: self.scope,
                    pid_source: &self.pid_source,
                    sandbox: &self.sandbox,
                    existing_tables,
                },
            )?;
            queries.extend(plan.queries);
        }
        Ok(queries)
    }

    fn get_sandbox_tablenames(&self) -> Vec<String> {
        let names: BTreeSet<String> = match self.get_query_specs() {
            Ok(queries) => queries
                .iter()
                .filter_map(|query| query.destination.as_ref())
                .map(|destination| destination.table.clone())
                .collect(),
            Err(_) => BTreeSet::new(),
        };
        names.into_iter().collect()
    }

    fn validate_rule(&self, catalog: &dyn WarehouseCatalog) -> Result<()> {
        let sandbox_tables = catalog.list_tables(&self.project, &self.sandbox.dataset)?;
        for name in self.get_sandbox_tablenames() {
            if !sandbox_tables.contains(&name) {
                return Err(RunError::Validation {
                    message: format!("sandbox table '{name}' was not created"),
                });
            }
        }
        Ok(())
    }
}
