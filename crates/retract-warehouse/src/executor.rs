use retract_model::{RetractionQuery, TableRef};

use crate::error::Result;

/// Result of one submitted statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub job_id: String,
    /// Rows the statement touched. `None` when the executor cannot know
    /// (for example, when rendering a reviewable script).
    pub affected_rows: Option<u64>,
}

/// Submits retraction statements and waits for each synchronously.
pub trait QueryExecutor {
    fn execute(&mut self, query: &RetractionQuery) -> Result<QueryOutcome>;

    /// Used by sandbox cleanup to remove empty leftover tables.
    fn drop_table(&mut self, table: &TableRef) -> Result<()>;
}
