use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilesError {
    #[error("no bucket configured for site '{hpo_id}'; set BUCKET_NAME_{env_suffix} or DRC_BUCKET_NAME")]
    BucketNotConfigured { hpo_id: String, env_suffix: String },

    #[error("io error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}' as csv: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("confirmation prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FilesError>;
