//! Flat-file retraction.
//!
//! Site submissions live as CSV files in bucket folders. This crate walks
//! the selected folders, filters out records whose pid column matches a
//! retracted id, and rewrites only the files that actually lost records.
//! Ambiguous records (too short, non-numeric pid field) are always kept:
//! not silently deleting questionable data outweighs completeness.

pub mod bucket;
pub mod error;
pub mod filter;
pub mod runner;
pub mod store;

pub use bucket::resolve_bucket;
pub use error::{FilesError, Result};
pub use filter::{FilterOutcome, filter_pid_records};
pub use runner::{
    Confirm, FileRetraction, FilesReport, FolderSelection, ForceConfirm, RetractFilesRequest,
    StdinConfirm, retract_files,
};
pub use store::{DirStore, ObjectStore};
