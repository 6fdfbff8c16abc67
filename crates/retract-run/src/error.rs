use std::path::PathBuf;

use retract_model::TableRef;
use retract_plan::PlanError;
use retract_warehouse::WarehouseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("failed to read roster {path}: {source}")]
    RosterIo {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("roster {path} is missing column '{column}'")]
    RosterColumn { path: PathBuf, column: String },

    #[error("roster {path} record {record}: {message}")]
    RosterRecord {
        path: PathBuf,
        record: usize,
        message: String,
    },

    #[error("pid table '{table}' is missing column '{column}'")]
    PidTableColumn { table: TableRef, column: String },

    #[error("rule validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, RunError>;
