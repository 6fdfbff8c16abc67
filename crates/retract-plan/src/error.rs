use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("dataset '{dataset}' is EHR-scoped but no hpo id was supplied")]
    MissingHpoId { dataset: String },
}

pub type Result<T> = std::result::Result<T, PlanError>;
