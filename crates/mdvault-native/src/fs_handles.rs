//! Handle implementations over tokio::fs.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use mdvault_core::{Result, VaultError};

use crate::handle::{DirHandle, FileHandle, HandleEntry};

fn map_io(e: io::Error) -> VaultError {
    match e.kind() {
        io::ErrorKind::NotFound => VaultError::NotFound(e.to_string()),
        io::ErrorKind::PermissionDenied => VaultError::PermissionDenied(e.to_string()),
        io::ErrorKind::AlreadyExists => VaultError::Conflict(e.to_string()),
        _ => VaultError::Transport(e.to_string()),
    }
}

fn base_name(path: &PathBuf) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory handle backed by a real path.
pub struct FsDirHandle {
    path: PathBuf,
    name: String,
}

impl FsDirHandle {
    pub fn new(path: PathBuf) -> Self {
        let name = base_name(&path);
        Self { path, name }
    }
}

#[async_trait]
impl DirHandle for FsDirHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn duplicate(&self) -> Box<dyn DirHandle> {
        Box::new(Self::new(self.path.clone()))
    }

    async fn entries(&self) -> Result<Vec<HandleEntry>> {
        let mut out = Vec::new();
        let mut dir = fs::read_dir(&self.path).await.map_err(map_io)?;
        while let Some(entry) = dir.next_entry().await.map_err(map_io)? {
            let file_type = entry.file_type().await.map_err(map_io)?;
            out.push(HandleEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
            });
        }
        Ok(out)
    }

    async fn open_dir(&self, name: &str) -> Result<Box<dyn DirHandle>> {
        let path = self.path.join(name);
        let meta = fs::metadata(&path).await.map_err(map_io)?;
        if !meta.is_dir() {
            return Err(VaultError::NotFound(format!("{name} is not a directory")));
        }
        Ok(Box::new(Self::new(path)))
    }

    async fn open_file(&self, name: &str) -> Result<Box<dyn FileHandle>> {
        let path = self.path.join(name);
        let meta = fs::metadata(&path).await.map_err(map_io)?;
        if meta.is_dir() {
            return Err(VaultError::NotFound(format!("{name} is not a file")));
        }
        Ok(Box::new(FsFileHandle::new(path)))
    }

    async fn create_dir(&self, name: &str) -> Result<Box<dyn DirHandle>> {
        let path = self.path.join(name);
        fs::create_dir(&path).await.map_err(map_io)?;
        Ok(Box::new(Self::new(path)))
    }

    async fn create_file(&self, name: &str) -> Result<Box<dyn FileHandle>> {
        let path = self.path.join(name);
        // create_new makes a taken name surface as Conflict.
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(map_io)?;
        file.flush().await.map_err(map_io)?;
        Ok(Box::new(FsFileHandle::new(path)))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()> {
        let path = self.path.join(name);
        let meta = fs::metadata(&path).await.map_err(map_io)?;
        if meta.is_dir() {
            if recursive {
                fs::remove_dir_all(&path).await.map_err(map_io)
            } else {
                fs::remove_dir(&path).await.map_err(map_io)
            }
        } else {
            fs::remove_file(&path).await.map_err(map_io)
        }
    }
}

/// File handle backed by a real path.
pub struct FsFileHandle {
    path: PathBuf,
    name: String,
}

impl FsFileHandle {
    pub fn new(path: PathBuf) -> Self {
        let name = base_name(&path);
        Self { path, name }
    }
}

#[async_trait]
impl FileHandle for FsFileHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_text(&self) -> Result<String> {
        fs::read_to_string(&self.path).await.map_err(map_io)
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        fs::write(&self.path, text).await.map_err(map_io)
    }
}
