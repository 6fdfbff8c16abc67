use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::condition::PidExpr;
use crate::error::{ModelError, Result};

/// Fully-qualified warehouse table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

impl FromStr for TableRef {
    type Err = ModelError;

    /// Parse a dotted `project.dataset.table` name. Anything other than
    /// exactly three non-empty parts is an operator mistake and fails fast.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|part| part.trim().is_empty()) {
            return Err(ModelError::InvalidTableRef {
                value: s.to_string(),
            });
        }
        Ok(Self::new(parts[0].trim(), parts[1].trim(), parts[2].trim()))
    }
}

/// Where the pids to retract come from: an explicit literal set, or a
/// pointer to a one-id-per-row warehouse table.
///
/// Either form resolves to a finite, deterministic id set for the duration
/// of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidSource {
    Literal(BTreeSet<i64>),
    Table(TableRef),
}

impl PidSource {
    /// Build a literal source. An empty set is a configuration error: a
    /// retraction run with nothing to retract is an operator mistake, not a
    /// no-op.
    pub fn literal<I>(pids: I) -> Result<Self>
    where
        I: IntoIterator<Item = i64>,
    {
        let set: BTreeSet<i64> = pids.into_iter().collect();
        if set.is_empty() {
            return Err(ModelError::EmptyPidSource);
        }
        Ok(Self::Literal(set))
    }

    pub fn table(table: TableRef) -> Self {
        Self::Table(table)
    }

    /// Bind this source to an identifier column, producing the renderable
    /// and evaluable expression used inside `IN (...)`.
    pub fn expr(&self, id_column: &str) -> PidExpr {
        match self {
            Self::Literal(pids) => PidExpr::List(pids.iter().copied().collect()),
            Self::Table(table) => PidExpr::Subquery {
                table: table.clone(),
                id_column: id_column.to_string(),
            },
        }
    }
}
