//! Persistent client-side key-value store.
//!
//! A small JSON file that survives restarts; it holds only the last-seen
//! backend session token and a handful of layout preferences. Writes go
//! through a temp file + rename so a crash mid-write never corrupts the
//! stored token.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    session_token: Option<String>,
    #[serde(default)]
    layout: BTreeMap<String, String>,
}

/// File-backed store for the session token and layout preferences.
pub struct KvStore {
    path: PathBuf,
    data: StoreFile,
}

impl KvStore {
    /// Open the store at `path`, creating an empty one if the file does
    /// not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_token(&self) -> Option<&str> {
        self.data.session_token.as_deref()
    }

    pub fn set_session_token(&mut self, token: impl Into<String>) -> Result<(), StoreError> {
        self.data.session_token = Some(token.into());
        self.sync()
    }

    pub fn layout_pref(&self, key: &str) -> Option<&str> {
        self.data.layout.get(key).map(String::as_str)
    }

    pub fn set_layout_pref(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.data.layout.insert(key.into(), value.into());
        self.sync()
    }

    fn sync(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.data)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = KvStore::open(dir.path().join("state.json")).unwrap();
        assert!(store.session_token().is_none());
    }

    #[test]
    fn test_token_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = KvStore::open(&path).unwrap();
        store.set_session_token("proc-abc123").unwrap();

        let reopened = KvStore::open(&path).unwrap();
        assert_eq!(reopened.session_token(), Some("proc-abc123"));
    }

    #[test]
    fn test_layout_prefs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = KvStore::open(&path).unwrap();
        store.set_layout_pref("panel.width", "320").unwrap();

        let reopened = KvStore::open(&path).unwrap();
        assert_eq!(reopened.layout_pref("panel.width"), Some("320"));
        assert_eq!(reopened.layout_pref("missing"), None);
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(KvStore::open(&path), Err(StoreError::Corrupt(_))));
    }
}
