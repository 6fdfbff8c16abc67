use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid table reference '{value}': expected project.dataset.table")]
    InvalidTableRef { value: String },
    #[error("pid source resolved to an empty id set")]
    EmptyPidSource,
}

pub type Result<T> = std::result::Result<T, ModelError>;
