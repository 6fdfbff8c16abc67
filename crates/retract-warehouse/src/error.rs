use std::path::PathBuf;

use retract_model::TableRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("failed to read catalog snapshot {path}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog snapshot {path}: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown project '{project}'")]
    ProjectNotFound { project: String },

    #[error("unknown dataset '{project}.{dataset}'")]
    DatasetNotFound { project: String, dataset: String },

    #[error("unknown table '{table}'")]
    TableNotFound { table: TableRef },

    #[error("select statement for '{table}' has no destination")]
    MissingDestination { table: TableRef },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WarehouseError>;
