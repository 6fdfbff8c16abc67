//! Folder-walk retraction over a directory-backed store.

use std::collections::BTreeSet;
use std::fs;

use tempfile::TempDir;

use retract_files::{
    Confirm, DirStore, FolderSelection, ForceConfirm, RetractFilesRequest, retract_files,
};
use retract_model::RetractionConfig;

fn pids(ids: &[i64]) -> BTreeSet<i64> {
    ids.iter().copied().collect()
}

fn seed_bucket() -> TempDir {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().join("2020-01-15-v1");
    fs::create_dir(&folder).unwrap();
    fs::write(
        folder.join("person.csv"),
        "person_id,gender_concept_id\n42,8507\n7,8532\n",
    )
    .unwrap();
    fs::write(
        folder.join("visit_occurrence.csv"),
        "visit_occurrence_id,person_id\n1,42\n2,7\n",
    )
    .unwrap();
    // no retracted pid in this one: must not be rewritten
    fs::write(
        folder.join("measurement.csv"),
        "measurement_id,person_id\n10,7\n",
    )
    .unwrap();
    // unknown file: ignored entirely
    fs::write(folder.join("README.csv"), "whatever\n1,2\n").unwrap();
    let older = dir.path().join("2019-06-01-v1");
    fs::create_dir(&older).unwrap();
    fs::write(older.join("person.csv"), "person_id,x\n42,a\n").unwrap();
    dir
}

#[test]
fn test_named_folder_filters_eligible_files() {
    let dir = seed_bucket();
    let mut store = DirStore::new(dir.path());
    let config = RetractionConfig::default();
    let pids = pids(&[42]);
    let report = retract_files(
        &mut store,
        &mut ForceConfirm,
        &RetractFilesRequest {
            config: &config,
            pids: &pids,
            selection: FolderSelection::Named("2020-01-15-v1".to_string()),
        },
    )
    .unwrap();

    assert_eq!(report.folders_processed, 1);
    let person = fs::read_to_string(dir.path().join("2020-01-15-v1/person.csv")).unwrap();
    assert_eq!(person, "person_id,gender_concept_id\n7,8532\n");
    let visit = fs::read_to_string(dir.path().join("2020-01-15-v1/visit_occurrence.csv")).unwrap();
    assert_eq!(visit, "visit_occurrence_id,person_id\n2,7\n");
    // untouched: no matching pid / not a submission table
    let measurement =
        fs::read_to_string(dir.path().join("2020-01-15-v1/measurement.csv")).unwrap();
    assert_eq!(measurement, "measurement_id,person_id\n10,7\n");
    let readme = fs::read_to_string(dir.path().join("2020-01-15-v1/README.csv")).unwrap();
    assert_eq!(readme, "whatever\n1,2\n");
    // the older folder was not selected
    let older = fs::read_to_string(dir.path().join("2019-06-01-v1/person.csv")).unwrap();
    assert_eq!(older, "person_id,x\n42,a\n");

    let rewritten: Vec<&str> = report
        .files
        .iter()
        .filter(|file| file.reuploaded)
        .map(|file| file.file.as_str())
        .collect();
    assert_eq!(rewritten, vec!["person.csv", "visit_occurrence.csv"]);
    let untouched = report
        .files
        .iter()
        .find(|file| file.file == "measurement.csv")
        .unwrap();
    assert!(!untouched.reuploaded);
    assert_eq!(untouched.records_removed, 0);
}

#[test]
fn test_all_folders_covers_every_submission() {
    let dir = seed_bucket();
    let mut store = DirStore::new(dir.path());
    let config = RetractionConfig::default();
    let pids = pids(&[42]);
    let report = retract_files(
        &mut store,
        &mut ForceConfirm,
        &RetractFilesRequest {
            config: &config,
            pids: &pids,
            selection: FolderSelection::AllFolders,
        },
    )
    .unwrap();

    assert_eq!(report.folders_processed, 2);
    let older = fs::read_to_string(dir.path().join("2019-06-01-v1/person.csv")).unwrap();
    assert_eq!(older, "person_id,x\n");
}

#[test]
fn test_none_selection_is_a_no_op() {
    let dir = seed_bucket();
    let mut store = DirStore::new(dir.path());
    let config = RetractionConfig::default();
    let pids = pids(&[42]);
    let report = retract_files(
        &mut store,
        &mut ForceConfirm,
        &RetractFilesRequest {
            config: &config,
            pids: &pids,
            selection: FolderSelection::None,
        },
    )
    .unwrap();
    assert_eq!(report.folders_processed, 0);
    assert!(report.files.is_empty());
    let person = fs::read_to_string(dir.path().join("2020-01-15-v1/person.csv")).unwrap();
    assert!(person.contains("42"));
}

/// Declines every folder prompt.
struct DeclineAll;

impl Confirm for DeclineAll {
    fn confirm(&mut self, _prompt: &str) -> retract_files::Result<bool> {
        Ok(false)
    }
}

#[test]
fn test_declined_folder_is_left_alone() {
    let dir = seed_bucket();
    let mut store = DirStore::new(dir.path());
    let config = RetractionConfig::default();
    let pids = pids(&[42]);
    let report = retract_files(
        &mut store,
        &mut DeclineAll,
        &RetractFilesRequest {
            config: &config,
            pids: &pids,
            selection: FolderSelection::Named("2020-01-15-v1".to_string()),
        },
    )
    .unwrap();
    assert_eq!(report.folders_processed, 0);
    let person = fs::read_to_string(dir.path().join("2020-01-15-v1/person.csv")).unwrap();
    assert!(person.contains("42"));
}
