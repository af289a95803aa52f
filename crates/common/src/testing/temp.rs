//! Temporary directory helper
//!
//! RAII directory under the system temp dir, removed on drop. Used for token
//! caches, `userdata.json` and recipe folders in tests.

#![allow(clippy::missing_errors_doc)]

use std::path::{Path, PathBuf};
use std::{fs, io};

/// Temporary directory that is deleted when dropped
///
/// ```
/// use actionarc_common::testing::temp::TempDir;
///
/// let dir = TempDir::new("tokens").unwrap();
/// dir.create_file("spotify.json", "{}").unwrap();
/// ```
#[derive(Debug)]
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> io::Result<Self> {
        let path = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `contents` to `name`, creating parent directories.
    pub fn create_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let file_path = self.path.join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, contents)?;
        Ok(file_path)
    }

    /// Serializes `value` as pretty JSON into `name`.
    pub fn write_json<T: serde::Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.create_file(name, &json)
    }

    pub fn create_dir(&self, name: &str) -> io::Result<PathBuf> {
        let dir_path = self.path.join(name);
        fs::create_dir_all(&dir_path)?;
        Ok(dir_path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::temp.
    use super::*;

    /// Validates the directory lifecycle.
    ///
    /// Assertions:
    /// - The directory exists while held and is gone after drop.
    #[test]
    fn test_removed_on_drop() {
        let dir = TempDir::new("lifecycle").unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());

        drop(dir);
        assert!(!path.exists());
    }

    /// Validates nested file creation and JSON helpers.
    ///
    /// Assertions:
    /// - Parent directories are created on demand.
    /// - JSON written by `write_json` parses back.
    #[test]
    fn test_nested_files() {
        let dir = TempDir::new("nested").unwrap();
        let file = dir.create_file("tokens/google.json", "{}").unwrap();
        assert_eq!(fs::read_to_string(file).unwrap(), "{}");

        let json = dir.write_json("data.json", &serde_json::json!({ "k": 1 })).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(value["k"], 1);
    }
}
