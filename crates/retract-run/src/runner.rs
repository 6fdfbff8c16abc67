use std::time::Instant;

use tracing::info;

use retract_model::RetractionQuery;
use retract_warehouse::{QueryExecutor, QueryOutcome};

use crate::error::Result;

/// Execute a statement list strictly sequentially, waiting on each before
/// submitting the next. The first executor error aborts the remainder and
/// propagates; earlier statements stay applied (there is no cross-statement
/// transaction, and a supervised retraction should stop on surprise rather
/// than skip scope).
pub fn run_queries(
    executor: &mut dyn QueryExecutor,
    queries: &[RetractionQuery],
) -> Result<Vec<QueryOutcome>> {
    let mut outcomes = Vec::with_capacity(queries.len());
    for query in queries {
        let start = Instant::now();
        let outcome = executor.execute(query)?;
        match outcome.affected_rows {
            Some(affected_rows) => info!(
                job_id = %outcome.job_id,
                target = %query.target,
                op = query.op.as_str(),
                batch = query.batch,
                affected_rows,
                duration_ms = start.elapsed().as_millis() as u64,
                "statement complete"
            ),
            None => info!(
                job_id = %outcome.job_id,
                target = %query.target,
                op = query.op.as_str(),
                batch = query.batch,
                duration_ms = start.elapsed().as_millis() as u64,
                "statement queued"
            ),
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
