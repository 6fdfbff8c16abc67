use tracing::{info, info_span};

use retract_model::RetractionQuery;
use retract_warehouse::{QueryExecutor, QueryOutcome, WarehouseCatalog};

use crate::error::Result;
use crate::runner::run_queries;

/// The sandboxing contract every destructive operation runs through.
///
/// A rule never deletes without first copying the affected rows into a
/// sandbox table, and it must be able to name those tables up front so
/// post-run verification and cleanup tooling can find them.
pub trait CleaningRule {
    /// Short name for spans and summaries.
    fn name(&self) -> &str;

    /// Pre-flight checks (pid table schema, sandbox reachability).
    fn setup_rule(&mut self, catalog: &dyn WarehouseCatalog) -> Result<()>;

    /// The ordered statement list, sandbox copies interleaved before their
    /// deletes.
    fn get_query_specs(&self) -> Result<Vec<RetractionQuery>>;

    /// Sandbox tables this rule will create.
    fn get_sandbox_tablenames(&self) -> Vec<String>;

    /// Post-hoc assertion, run after the statements.
    fn validate_rule(&self, catalog: &dyn WarehouseCatalog) -> Result<()>;
}

/// Drive a rule through setup, execution, and validation against one
/// warehouse, which serves as both the catalog and the executor.
pub fn run_rule<W>(rule: &mut dyn CleaningRule, warehouse: &mut W) -> Result<Vec<QueryOutcome>>
where
    W: WarehouseCatalog + QueryExecutor,
{
    let span = info_span!("rule", name = rule.name());
    let _guard = span.enter();
    rule.setup_rule(warehouse)?;
    let specs = rule.get_query_specs()?;
    info!(statement_count = specs.len(), "rule planned");
    let outcomes = run_queries(warehouse, &specs)?;
    rule.validate_rule(warehouse)?;
    info!(statement_count = outcomes.len(), "rule complete");
    Ok(outcomes)
}
