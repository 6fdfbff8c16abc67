use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FilesError, Result};

/// The object-storage seam for a site bucket.
///
/// Folders are submission folders at the bucket root; objects are the files
/// within one folder. Cloud bindings implement this against the real
/// store; [`DirStore`] implements it over a local directory tree (a synced
/// bucket mirror).
pub trait ObjectStore {
    /// Submission folder names, newest first.
    fn list_folders(&self) -> Result<Vec<String>>;

    /// File names within one folder, sorted.
    fn list_files(&self, folder: &str) -> Result<Vec<String>>;

    fn download(&self, folder: &str, name: &str) -> Result<Vec<u8>>;

    fn upload(&mut self, folder: &str, name: &str, content: &[u8]) -> Result<()>;
}

/// Directory-backed store: one subdirectory per submission folder.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, folder: &str, name: &str) -> PathBuf {
        self.root.join(folder).join(name)
    }

    fn io_error(path: &Path, source: std::io::Error) -> FilesError {
        FilesError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl ObjectStore for DirStore {
    fn list_folders(&self) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.root).map_err(|source| Self::io_error(&self.root, source))?;
        let mut folders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Self::io_error(&self.root, source))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                folders.push(name.to_string());
            }
        }
        // Submission folders carry date-stamped names; descending order puts
        // the newest first.
        folders.sort_by(|a, b| b.cmp(a));
        Ok(folders)
    }

    fn list_files(&self, folder: &str) -> Result<Vec<String>> {
        let dir = self.root.join(folder);
        let entries = fs::read_dir(&dir).map_err(|source| Self::io_error(&dir, source))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Self::io_error(&dir, source))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                files.push(name.to_string());
            }
        }
        files.sort();
        Ok(files)
    }

    fn download(&self, folder: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.object_path(folder, name);
        fs::read(&path).map_err(|source| Self::io_error(&path, source))
    }

    fn upload(&mut self, folder: &str, name: &str, content: &[u8]) -> Result<()> {
        let path = self.object_path(folder, name);
        fs::write(&path, content).map_err(|source| Self::io_error(&path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_folders_listed_newest_first() {
        let dir = TempDir::new().unwrap();
        for folder in ["2019-06-01-v1", "2020-01-15-v1", "2018-11-02-v2"] {
            fs::create_dir(dir.path().join(folder)).unwrap();
        }
        fs::write(dir.path().join("stray_file.txt"), b"x").unwrap();
        let store = DirStore::new(dir.path());
        assert_eq!(
            store.list_folders().unwrap(),
            vec!["2020-01-15-v1", "2019-06-01-v1", "2018-11-02-v2"]
        );
    }

    #[test]
    fn test_download_upload_round_trip() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("2020-01-15-v1")).unwrap();
        let mut store = DirStore::new(dir.path());
        store
            .upload("2020-01-15-v1", "person.csv", b"person_id\n42\n")
            .unwrap();
        assert_eq!(
            store.download("2020-01-15-v1", "person.csv").unwrap(),
            b"person_id\n42\n"
        );
        assert_eq!(
            store.list_files("2020-01-15-v1").unwrap(),
            vec!["person.csv"]
        );
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = DirStore::new(dir.path());
        assert!(store.list_files("nope").is_err());
    }
}
