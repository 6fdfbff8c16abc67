//! Retraction plan generation.
//!
//! Turns (dataset, category, scope, pid source) into an ordered list of
//! sandbox-then-delete statement pairs, one group per dataset. Pure: the
//! catalog listing comes in as data, nothing here performs I/O.

pub mod builder;
pub mod error;
pub mod identifier;

pub use builder::{DatasetPlan, PlanRequest, SandboxPlan, build_dataset_plan};
pub use error::{PlanError, Result};
pub use identifier::{IdentifierStrategy, PERSON_ID, RESEARCH_ID, resolve_identifier};
