//! JSON file persistence for run outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SimError;

/// Reads and writes pretty-printed JSON files under one directory.
#[derive(Debug, Clone)]
pub struct FileHandler {
    /// Directory for file storage.
    pub directory: PathBuf,
}

impl FileHandler {
    /// Create a new `FileHandler` for the given directory.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Load and deserialize a JSON file from the handler's directory.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>, SimError> {
        let path = self.directory.join(filename);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Serialize `data` to a file in the handler's directory and return its
    /// path.
    ///
    /// Creates the directory if it does not exist.
    pub fn save<T: Serialize + ?Sized>(&self, filename: &str, data: &T) -> Result<PathBuf, SimError> {
        if !self.directory.exists() {
            fs::create_dir_all(&self.directory)?;
        }
        let path = self.directory.join(filename);
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&path, content)?;
        log::debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Check if a file exists in the handler's directory.
    pub fn exists(&self, filename: &str) -> bool {
        self.directory.join(filename).exists()
    }

    /// Directory the handler reads and writes.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Default for FileHandler {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_creates_directory_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FileHandler::new(dir.path().join("nested").join("out"));
        let path = handler.save("run.json", &json!({"sessions": [1, 2]})).unwrap();
        assert!(path.exists());
        assert!(handler.exists("run.json"));
        let loaded: serde_json::Value = handler.load("run.json").unwrap().unwrap();
        assert_eq!(loaded["sessions"][1], 2);
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FileHandler::new(dir.path());
        let loaded: Option<serde_json::Value> = handler.load("absent.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_output_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FileHandler::new(dir.path());
        let path = handler.save("x.json", &json!({"a": 1})).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("\n  \"a\": 1"));
    }
}
