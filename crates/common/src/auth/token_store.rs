//! On-disk token cache
//!
//! One JSON file per account under a cache directory. Writes go to a
//! sibling temp file that is renamed over the target, so a crash never
//! leaves a truncated cache behind.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::traits::TokenStore;
use super::types::TokenSet;

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("token cache {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid account name: {0}")]
    InvalidAccount(String),
}

/// Token cache rooted at a directory
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<account>.json`; account names are restricted to a safe
    /// alphabet so they cannot escape the directory.
    pub fn path_for(&self, account: &str) -> Result<PathBuf, TokenStoreError> {
        let valid = !account.is_empty()
            && account.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !account.starts_with('.');
        if !valid {
            return Err(TokenStoreError::InvalidAccount(account.to_string()));
        }
        Ok(self.dir.join(format!("{account}.json")))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> TokenStoreError + '_ {
    move |source| TokenStoreError::Io { path: path.to_path_buf(), source }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, account: &str) -> Result<Option<TokenSet>, TokenStoreError> {
        let path = self.path_for(account)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };

        let tokens = serde_json::from_slice(&bytes)
            .map_err(|source| TokenStoreError::Corrupt { path: path.clone(), source })?;
        debug!(path = %path.display(), "loaded cached tokens");
        Ok(Some(tokens))
    }

    async fn save(&self, account: &str, tokens: &TokenSet) -> Result<(), TokenStoreError> {
        let path = self.path_for(account)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err(&self.dir))?;

        let json = serde_json::to_vec_pretty(tokens)
            .map_err(|source| TokenStoreError::Corrupt { path: path.clone(), source })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err(&tmp))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(io_err(&tmp))?;
        }

        tokio::fs::rename(&tmp, &path).await.map_err(io_err(&path))?;
        debug!(path = %path.display(), "token cache written");
        Ok(())
    }

    async fn delete(&self, account: &str) -> Result<(), TokenStoreError> {
        let path = self.path_for(account)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::token_store.
    use super::*;

    /// Validates save then load through a fresh store instance.
    ///
    /// Assertions:
    /// - Loaded tokens equal the saved ones.
    /// - No temp file is left next to the cache.
    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("tokens"));
        let tokens = TokenSet::new("a".into(), Some("r".into()), None, 3600, None);

        store.save("google", &tokens).await.unwrap();
        let reloaded = FileTokenStore::new(dir.path().join("tokens")).load("google").await.unwrap();

        assert_eq!(reloaded, Some(tokens));
        assert!(!dir.path().join("tokens/google.json.tmp").exists());
    }

    /// Validates missing and deleted entries.
    ///
    /// Assertions:
    /// - Loading an unknown account yields `None`.
    /// - Deleting twice is fine.
    #[tokio::test]
    async fn test_missing_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());

        assert!(store.load("spotify").await.unwrap().is_none());

        let tokens = TokenSet::new("a".into(), None, None, 60, None);
        store.save("spotify", &tokens).await.unwrap();
        store.delete("spotify").await.unwrap();
        store.delete("spotify").await.unwrap();
        assert!(store.load("spotify").await.unwrap().is_none());
    }

    /// Validates corrupt files are reported, not silently dropped.
    ///
    /// Assertions:
    /// - Returns `TokenStoreError::Corrupt`.
    #[tokio::test]
    async fn test_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("microsoft.json"), b"{not json").unwrap();
        let store = FileTokenStore::new(dir.path());

        let err = store.load("microsoft").await.unwrap_err();
        assert!(matches!(err, TokenStoreError::Corrupt { .. }));
    }

    /// Validates account names cannot traverse out of the directory.
    ///
    /// Assertions:
    /// - `../x`, empty and dot-prefixed names are rejected.
    #[test]
    fn test_account_name_validation() {
        let store = FileTokenStore::new("/tmp/cache");
        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for(".hidden").is_err());
        assert_eq!(store.path_for("google").unwrap(), PathBuf::from("/tmp/cache/google.json"));
    }
}
