use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use tracing::{debug, info, info_span};

use retract_model::RetractionConfig;

use crate::error::{FilesError, Result};
use crate::filter::filter_pid_records;
use crate::store::ObjectStore;

/// Which submission folders a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderSelection {
    Named(String),
    /// Every folder in the bucket, newest first.
    AllFolders,
    /// Explicit skip.
    None,
}

impl FolderSelection {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "all_folders" => Self::AllFolders,
            "none" => Self::None,
            _ => Self::Named(value.trim().to_string()),
        }
    }
}

/// Per-folder and per-file go/no-go decision.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Accepts everything; for unattended or scripted runs.
#[derive(Debug, Default)]
pub struct ForceConfirm;

impl Confirm for ForceConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Interactive Y/n prompt on stdin.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        print!("{prompt} [Y/n]: ");
        io::stdout().flush().map_err(FilesError::Prompt)?;
        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .map_err(FilesError::Prompt)?;
        let answer = answer.trim();
        Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
    }
}

/// One file's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRetraction {
    pub folder: String,
    pub file: String,
    pub records_removed: usize,
    pub reuploaded: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilesReport {
    pub folders_processed: usize,
    pub files: Vec<FileRetraction>,
}

#[derive(Debug)]
pub struct RetractFilesRequest<'a> {
    pub config: &'a RetractionConfig,
    pub pids: &'a BTreeSet<i64>,
    pub selection: FolderSelection,
}

/// Walk the selected folders and filter retracted pids out of every
/// recognizable submission file.
///
/// Per folder: discover files, then for each eligible file confirm,
/// download, filter, and re-upload. The upload only happens when at least
/// one record was actually removed, to avoid needless writes.
pub fn retract_files(
    store: &mut dyn ObjectStore,
    confirm: &mut dyn Confirm,
    request: &RetractFilesRequest<'_>,
) -> Result<FilesReport> {
    let folders = match &request.selection {
        FolderSelection::None => {
            info!("folder selection is none; nothing to do");
            return Ok(FilesReport::default());
        }
        FolderSelection::Named(name) => vec![name.clone()],
        FolderSelection::AllFolders => store.list_folders()?,
    };

    let mut report = FilesReport::default();
    for folder in folders {
        let span = info_span!("folder", folder = %folder);
        let _guard = span.enter();
        if !confirm.confirm(&format!("Retract from folder '{folder}'?"))? {
            info!("folder skipped");
            continue;
        }
        let files = store.list_files(&folder)?;
        for name in files {
            let Some(rule) = request.config.file_rule(file_stem(&name)) else {
                debug!(file = %name, "not a retractable submission file");
                continue;
            };
            // file_rule only matches rules with a pid column position
            let Some(pid_column) = rule.file_pid_column else {
                continue;
            };
            if !confirm.confirm(&format!("Retract pids from '{folder}/{name}'?"))? {
                debug!(file = %name, "file skipped");
                continue;
            }
            let object_path = format!("{folder}/{name}");
            let content = store.download(&folder, &name)?;
            let outcome = filter_pid_records(&object_path, &content, pid_column, request.pids)?;
            let reuploaded = outcome.records_removed > 0;
            if reuploaded {
                store.upload(&folder, &name, &outcome.content)?;
                info!(
                    file = %name,
                    records_removed = outcome.records_removed,
                    records_kept = outcome.records_kept,
                    "file rewritten"
                );
            } else {
                debug!(file = %name, "no matching records; upload skipped");
            }
            report.files.push(FileRetraction {
                folder: folder.clone(),
                file: name,
                records_removed: outcome.records_removed,
                reuploaded,
            });
        }
        report.folders_processed += 1;
    }
    Ok(report)
}

/// Base name without the extension; table-rule matching is case-insensitive.
fn file_stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_selection_parse() {
        assert_eq!(FolderSelection::parse("all_folders"), FolderSelection::AllFolders);
        assert_eq!(FolderSelection::parse("NONE"), FolderSelection::None);
        assert_eq!(
            FolderSelection::parse("2020-01-15-v1"),
            FolderSelection::Named("2020-01-15-v1".to_string())
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("person.csv"), "person");
        assert_eq!(file_stem("PII_NAME.CSV"), "PII_NAME");
        assert_eq!(file_stem("noext"), "noext");
    }
}
