//! JSON file persistence for listening statistics

use std::path::{Path, PathBuf};

use actionarc_core::{TasteStore, UserTaste};
use actionarc_domain::constants::USER_DATA_FILE;
use actionarc_domain::{ActionArcError, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Stores [`UserTaste`] in `<data_dir>/userdata.json`.
pub struct FileTasteStore {
    path: PathBuf,
}

impl FileTasteStore {
    pub fn new(data_dir: &Path) -> Self {
        Self { path: data_dir.join(USER_DATA_FILE) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TasteStore for FileTasteStore {
    async fn load(&self) -> Result<UserTaste> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(UserTaste::default()),
            Err(err) => return Err(InfraError::from(err).into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(taste) => Ok(taste),
            Err(err) => {
                // Unreadable statistics are discarded.
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable user data");
                Ok(UserTaste::default())
            }
        }
    }

    async fn save(&self, taste: &UserTaste) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }
        let json = serde_json::to_vec_pretty(taste)
            .map_err(|e| ActionArcError::Internal(format!("failed to encode user data: {e}")))?;

        // atomic replace
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).await.map_err(InfraError::from)?;
        fs::rename(&tmp, &self.path).await.map_err(InfraError::from)?;
        debug!(path = %self.path.display(), "saved user data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use actionarc_domain::Track;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileTasteStore::new(&dir.path().join("nested"));
        assert!(store.load().await.unwrap().is_empty());

        let mut taste = UserTaste::default();
        taste.record_tracks(&[Track {
            id: "t1".into(),
            name: "Yellow".into(),
            uri: "spotify:track:t1".into(),
            artists: vec!["Coldplay".into()],
            album: None,
            duration_ms: 0,
            popularity: 0,
        }]);
        store.save(&taste).await.unwrap();

        assert!(store.path().ends_with("userdata.json"));
        assert_eq!(store.load().await.unwrap(), taste);
    }

    #[tokio::test]
    async fn corrupt_file_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileTasteStore::new(dir.path());
        std::fs::write(store.path(), b"{not json").unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
