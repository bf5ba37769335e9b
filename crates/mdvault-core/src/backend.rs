//! Unified interface for vault storage backends.
//!
//! The engine tells the backend WHAT to mutate; the backend decides HOW
//! (in-memory slot writes, capability-handle walks, HTTP calls). The engine
//! holds a single `Arc<dyn VaultBackend>` and never branches on backend
//! identity outside adapter construction.

use async_trait::async_trait;

use crate::error::Result;
use crate::item::Item;

/// A note body as the backend stores it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteBody {
    pub content: String,
    pub tags: Vec<String>,
}

/// Common capability set implemented by the local persisted store, the
/// native handle tree and the remote HTTP tree.
///
/// Paths are slash-joined and relative to the vault root; the empty string
/// is the root itself. Note paths carry the `.md` suffix.
#[async_trait]
pub trait VaultBackend: Send + Sync {
    /// Full tree snapshot. Backends with lazy bodies return notes with
    /// `content_loaded == false`.
    async fn list_tree(&self) -> Result<Vec<Item>>;

    /// Fetch one note body (content plus tags from its front matter).
    async fn load_note_body(&self, path: &str) -> Result<NoteBody>;

    /// Create an empty note under `parent_path`. Returns the committed path.
    async fn create_note(&self, parent_path: &str, name: &str) -> Result<String>;

    /// Create a folder under `parent_path`. Returns the committed path.
    async fn create_folder(&self, parent_path: &str, name: &str) -> Result<String>;

    /// Persist a note body. The engine guarantees the content is authoritative
    /// (loaded, or freshly supplied) before calling this.
    async fn write_note_body(&self, path: &str, content: &str, tags: &[String]) -> Result<()>;

    /// Rename an item in place. `new_path` shares `old_path`'s parent.
    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()>;

    /// Move an item under another parent folder, keeping its base name.
    async fn move_item(&self, source: &str, dest_parent: &str) -> Result<()>;

    /// Delete an item. Folders are removed recursively; note paths must
    /// carry the note suffix.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Whether a committed move requires a full re-list instead of a
    /// client-side rewrite. True for backends whose destination-side path
    /// semantics the client cannot safely predict.
    fn relist_after_move(&self) -> bool {
        false
    }

    /// Server-side archive unpack, when the backend offers one. `Ok(false)`
    /// means unsupported and the engine unpacks client-side.
    async fn upload_archive(&self, _target: &str, _name: &str, _bytes: Vec<u8>) -> Result<bool> {
        Ok(false)
    }

    /// Server-side archive render, when the backend offers one. `Ok(None)`
    /// means unsupported and the engine builds the archive client-side.
    async fn export_archive(&self, _path: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Backend name for logs and notices.
    fn name(&self) -> &'static str;
}

// Implement VaultBackend for Arc<T> so a backend can be shared between the
// engine and adapter-specific surfaces (e.g. a credential refresher).
#[async_trait]
impl<T: VaultBackend + ?Sized> VaultBackend for std::sync::Arc<T> {
    async fn list_tree(&self) -> Result<Vec<Item>> {
        (**self).list_tree().await
    }

    async fn load_note_body(&self, path: &str) -> Result<NoteBody> {
        (**self).load_note_body(path).await
    }

    async fn create_note(&self, parent_path: &str, name: &str) -> Result<String> {
        (**self).create_note(parent_path, name).await
    }

    async fn create_folder(&self, parent_path: &str, name: &str) -> Result<String> {
        (**self).create_folder(parent_path, name).await
    }

    async fn write_note_body(&self, path: &str, content: &str, tags: &[String]) -> Result<()> {
        (**self).write_note_body(path, content, tags).await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        (**self).rename(old_path, new_path).await
    }

    async fn move_item(&self, source: &str, dest_parent: &str) -> Result<()> {
        (**self).move_item(source, dest_parent).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        (**self).delete(path).await
    }

    fn relist_after_move(&self) -> bool {
        (**self).relist_after_move()
    }

    async fn upload_archive(&self, target: &str, name: &str, bytes: Vec<u8>) -> Result<bool> {
        (**self).upload_archive(target, name, bytes).await
    }

    async fn export_archive(&self, path: &str) -> Result<Option<Vec<u8>>> {
        (**self).export_archive(path).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
