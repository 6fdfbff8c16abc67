//! Retraction execution.
//!
//! The runner submits statements strictly sequentially and logs affected
//! row counts. Destructive work is packaged as cleaning rules: every rule
//! copies affected rows into a sandbox table before deleting, and exposes
//! the setup / query-spec / sandbox-name / validate hooks that post-run
//! tooling relies on.

pub mod cleanup;
pub mod deactivated;
pub mod error;
pub mod pid_rule;
pub mod roster;
pub mod rule;
pub mod runner;
pub mod script;

pub use cleanup::drop_empty_sandbox_tables;
pub use deactivated::{
    DateFilter, DeactivatedRetractionRule, RetractionInfoRow, discover_retraction_info,
};
pub use error::{Result, RunError};
pub use pid_rule::{PidRetractionRule, verify_pid_table};
pub use roster::{DeactivationRecord, load_roster};
pub use rule::{CleaningRule, run_rule};
pub use runner::run_queries;
pub use script::ScriptExecutor;
