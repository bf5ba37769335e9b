//! State slot persisted to a file on disk.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use mdvault_core::{Result, StateSlot, VaultError};

/// Stores the serialized vault state in a single file.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StateSlot for FileSlot {
    async fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::Transport(e.to_string())),
        }
    }

    async fn save(&self, raw: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| VaultError::Transport(e.to_string()))?;
            }
        }
        fs::write(&self.path, raw)
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let tmp = TempDir::new().unwrap();
        let slot = FileSlot::new(tmp.path().join("state.json"));
        assert_eq!(slot.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_creates_parents_and_round_trips() {
        let tmp = TempDir::new().unwrap();
        let slot = FileSlot::new(tmp.path().join("nested/state.json"));
        slot.save("{\"tree\":[]}").await.unwrap();
        assert_eq!(slot.load().await.unwrap().as_deref(), Some("{\"tree\":[]}"));
    }
}
