use serde::{Deserialize, Serialize};

use crate::condition::RowCondition;
use crate::pid::TableRef;

/// Statement verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOp {
    /// Copy matching rows into a destination table (sandbox copy).
    SelectInto,
    /// Remove matching rows from the target table.
    Delete,
}

impl QueryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelectInto => "select_into",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteDisposition {
    Append,
    Truncate,
}

/// Where a `SelectInto` lands its rows. Applied through the warehouse job
/// configuration; the statement text itself stays a plain `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub dataset: String,
    pub table: String,
    pub disposition: WriteDisposition,
}

/// One immutable unit of retraction work.
///
/// Carries both the rendered SQL submitted to the warehouse and the typed
/// condition it was rendered from, so executors that cannot run SQL (the
/// in-memory test double) can still apply the statement faithfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetractionQuery {
    pub sql: String,
    pub op: QueryOp,
    pub target: TableRef,
    pub condition: RowCondition,
    pub destination: Option<Destination>,
    /// Submit at batch priority rather than interactive.
    pub batch: bool,
}

impl RetractionQuery {
    pub fn delete(target: TableRef, condition: RowCondition) -> Self {
        let sql = format!("DELETE FROM `{target}` WHERE {}", condition.sql());
        Self {
            sql,
            op: QueryOp::Delete,
            target,
            condition,
            destination: None,
            batch: false,
        }
    }

    pub fn select_into(target: TableRef, condition: RowCondition, destination: Destination) -> Self {
        let sql = format!("SELECT * FROM `{target}` WHERE {}", condition.sql());
        Self {
            sql,
            op: QueryOp::SelectInto,
            target,
            condition,
            destination: Some(destination),
            batch: false,
        }
    }

    pub fn batched(mut self) -> Self {
        self.batch = true;
        self
    }
}
