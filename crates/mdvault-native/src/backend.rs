//! Vault backend over capability handles.
//!
//! Every operation walks from the root handle to the directory it needs,
//! so nothing outside the granted subtree is ever touched. The handle API
//! has no rename primitive; renames and moves are copy-then-delete.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use mdvault_core::frontmatter::{self, FrontMatter};
use mdvault_core::item::{self, Folder, Item, Note, NOTE_SUFFIX};
use mdvault_core::{NoteBody, Result, VaultBackend, VaultError};

use crate::fs_handles::FsDirHandle;
use crate::handle::{Access, AlwaysGranted, DirHandle, PermissionGate};

pub struct HandleStore {
    root: Box<dyn DirHandle>,
    gate: Arc<dyn PermissionGate>,
}

impl HandleStore {
    pub fn new(root: Box<dyn DirHandle>, gate: Arc<dyn PermissionGate>) -> Self {
        Self { root, gate }
    }

    /// A store over a local directory with no permission prompting.
    pub fn at_path(root: PathBuf) -> Self {
        Self::new(Box::new(FsDirHandle::new(root)), Arc::new(AlwaysGranted))
    }

    /// Check access, re-prompting once before giving up.
    fn ensure(&self, access: Access) -> Result<()> {
        if self.gate.request(access) || self.gate.request(access) {
            return Ok(());
        }
        Err(VaultError::PermissionDenied(
            "vault access was not granted".into(),
        ))
    }

    /// Walk from the root to the directory at `path` (empty means the root).
    async fn walk(&self, path: &str) -> Result<Box<dyn DirHandle>> {
        let mut dir = self.root.duplicate();
        if path.is_empty() {
            return Ok(dir);
        }
        for segment in path.split('/') {
            dir = dir.open_dir(segment).await?;
        }
        Ok(dir)
    }

    async fn walk_parent(&self, path: &str) -> Result<(Box<dyn DirHandle>, String)> {
        let (parent, base) = item::split_path(path);
        Ok((self.walk(parent).await?, base.to_string()))
    }

    /// Copy-then-delete relocation of a file or directory subtree.
    async fn relocate(&self, source: &str, dest: &str) -> Result<()> {
        let (src_parent, src_base) = self.walk_parent(source).await?;
        let (dst_parent, dst_base) = self.walk_parent(dest).await?;

        let entry = src_parent
            .entries()
            .await?
            .into_iter()
            .find(|e| e.name == src_base)
            .ok_or_else(|| VaultError::NotFound(format!("no entry at {source}")))?;

        if entry.is_dir {
            let src = src_parent.open_dir(&src_base).await?;
            let dst = dst_parent.create_dir(&dst_base).await?;
            copy_dir(src, dst).await?;
            src_parent.remove_entry(&src_base, true).await?;
        } else {
            let text = src_parent.open_file(&src_base).await?.read_text().await?;
            let file = dst_parent.create_file(&dst_base).await?;
            file.write_text(&text).await?;
            src_parent.remove_entry(&src_base, false).await?;
        }
        tracing::debug!("relocated {source} to {dest}");
        Ok(())
    }
}

fn copy_dir(src: Box<dyn DirHandle>, dst: Box<dyn DirHandle>) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        for entry in src.entries().await? {
            if entry.is_dir {
                let child_src = src.open_dir(&entry.name).await?;
                let child_dst = dst.create_dir(&entry.name).await?;
                copy_dir(child_src, child_dst).await?;
            } else {
                let text = src.open_file(&entry.name).await?.read_text().await?;
                let file = dst.create_file(&entry.name).await?;
                file.write_text(&text).await?;
            }
        }
        Ok(())
    })
}

/// Recursive listing. Hidden entries and non-note files are invisible to
/// the vault.
fn list_level(dir: Box<dyn DirHandle>, base: String) -> BoxFuture<'static, Result<Vec<Item>>> {
    Box::pin(async move {
        let mut items = Vec::new();
        for entry in dir.entries().await? {
            if entry.name.starts_with('.') {
                continue;
            }
            let path = item::join_path(&base, &entry.name);
            if entry.is_dir {
                let child = dir.open_dir(&entry.name).await?;
                let children = list_level(child, path.clone()).await?;
                items.push(Item::Folder(Folder::at_path(&path, children)));
            } else if entry.name.ends_with(NOTE_SUFFIX) {
                items.push(Item::Note(Note::at_path(&path, false)));
            }
        }
        Ok(items)
    })
}

#[async_trait]
impl VaultBackend for HandleStore {
    async fn list_tree(&self) -> Result<Vec<Item>> {
        self.ensure(Access::Read)?;
        list_level(self.root.duplicate(), String::new()).await
    }

    async fn load_note_body(&self, path: &str) -> Result<NoteBody> {
        self.ensure(Access::Read)?;
        let (parent, base) = self.walk_parent(path).await?;
        let raw = parent.open_file(&base).await?.read_text().await?;
        let parsed = frontmatter::parse(&raw);
        Ok(NoteBody {
            content: parsed.body,
            tags: parsed.matter.tags,
        })
    }

    async fn create_note(&self, parent_path: &str, name: &str) -> Result<String> {
        self.ensure(Access::ReadWrite)?;
        let dir = self.walk(parent_path).await?;
        let file_name = item::note_file_name(name);
        dir.create_file(&file_name).await?;
        Ok(item::join_path(parent_path, &file_name))
    }

    async fn create_folder(&self, parent_path: &str, name: &str) -> Result<String> {
        self.ensure(Access::ReadWrite)?;
        let dir = self.walk(parent_path).await?;
        dir.create_dir(name).await?;
        Ok(item::join_path(parent_path, name))
    }

    async fn write_note_body(&self, path: &str, content: &str, tags: &[String]) -> Result<()> {
        self.ensure(Access::ReadWrite)?;
        let (parent, base) = self.walk_parent(path).await?;
        let file = match parent.open_file(&base).await {
            Ok(file) => file,
            Err(VaultError::NotFound(_)) => parent.create_file(&base).await?,
            Err(e) => return Err(e),
        };
        let matter = FrontMatter::with_tags(tags.to_vec());
        file.write_text(&frontmatter::serialize(&matter, content)).await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.ensure(Access::ReadWrite)?;
        self.relocate(old_path, new_path).await
    }

    async fn move_item(&self, source: &str, dest_parent: &str) -> Result<()> {
        self.ensure(Access::ReadWrite)?;
        let (_, base) = item::split_path(source);
        let dest = item::join_path(dest_parent, base);
        self.relocate(source, &dest).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.ensure(Access::ReadWrite)?;
        let (parent, base) = self.walk_parent(path).await?;
        let entry = parent
            .entries()
            .await?
            .into_iter()
            .find(|e| e.name == base)
            .ok_or_else(|| VaultError::NotFound(format!("no entry at {path}")))?;
        if !entry.is_dir && !entry.name.ends_with(NOTE_SUFFIX) {
            return Err(VaultError::InvalidOperation(format!(
                "{path} is not part of the vault"
            )));
        }
        parent.remove_entry(&base, entry.is_dir).await
    }

    fn name(&self) -> &'static str {
        "handles"
    }
}
