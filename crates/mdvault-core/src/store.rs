//! Local persisted store: the whole tree lives in a durable key-value slot.
//!
//! Every mutation delegates to tree algebra and then persists the serialized
//! tree. There is no partial loading; bodies are always authoritative. The
//! slot is a
//! single mutable cell; concurrent writers are not supported and the last
//! write wins.

use async_trait::async_trait;
use std::sync::{Mutex, RwLock};

use crate::backend::{NoteBody, VaultBackend};
use crate::error::{Result, VaultError};
use crate::item::{self, Folder, Item, Note};
use crate::tree;

/// Durable slot holding one serialized tree.
#[async_trait]
pub trait StateSlot: Send + Sync {
    /// Read the stored tree, `None` when the slot has never been written.
    async fn load(&self) -> Result<Option<String>>;

    /// Overwrite the stored tree.
    async fn save(&self, raw: &str) -> Result<()>;
}

/// In-process slot, for tests and throwaway vaults.
#[derive(Default)]
pub struct MemorySlot {
    cell: RwLock<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at the raw stored value.
    pub fn raw(&self) -> Option<String> {
        self.cell.read().unwrap().clone()
    }
}

// Implement StateSlot for Arc<T> so a slot can be shared with a reopened
// store in tests.
#[async_trait]
impl<T: StateSlot + ?Sized> StateSlot for std::sync::Arc<T> {
    async fn load(&self) -> Result<Option<String>> {
        (**self).load().await
    }

    async fn save(&self, raw: &str) -> Result<()> {
        (**self).save(raw).await
    }
}

#[async_trait]
impl StateSlot for MemorySlot {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.cell.read().unwrap().clone())
    }

    async fn save(&self, raw: &str) -> Result<()> {
        *self.cell.write().unwrap() = Some(raw.to_string());
        Ok(())
    }
}

/// Tree-in-a-slot backend.
pub struct LocalStore<S: StateSlot> {
    slot: S,
    tree: Mutex<Vec<Item>>,
}

impl<S: StateSlot> LocalStore<S> {
    /// Open the store, deserializing whatever the slot holds.
    pub async fn open(slot: S) -> Result<Self> {
        let tree = match slot.load().await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| VaultError::Transport(format!("corrupt vault state: {e}")))?,
            None => Vec::new(),
        };
        Ok(Self {
            slot,
            tree: Mutex::new(tree),
        })
    }

    async fn persist(&self) -> Result<()> {
        let raw = {
            let tree = self.tree.lock().unwrap();
            serde_json::to_string(&*tree)
                .map_err(|e| VaultError::Transport(format!("serialize vault state: {e}")))?
        };
        self.slot.save(&raw).await
    }

    /// The parent folder id an operation targets, or `None` for root.
    /// Fails when the parent path names no folder in the tree.
    fn parent_target(tree: &[Item], parent_path: &str) -> Result<Option<String>> {
        if parent_path.is_empty() {
            return Ok(None);
        }
        let id = item::folder_id(parent_path);
        if !tree::contains(tree, &id) {
            return Err(VaultError::NotFound(parent_path.to_string()));
        }
        Ok(Some(id))
    }

    /// Take the item at `path` out of the tree, trying the note id first for
    /// suffixed paths.
    fn take_at_path(tree: &mut Vec<Item>, path: &str) -> Option<Item> {
        tree::remove_by_id(tree, &item::note_id(path))
            .or_else(|| tree::remove_by_id(tree, &item::folder_id(path)))
    }

    /// Shared tail of rename and move: relocate the subtree at `old_path`
    /// to `new_path`, rewriting every descendant identity.
    fn relocate(tree: &mut Vec<Item>, old_path: &str, new_path: &str) -> Result<()> {
        if tree::contains(tree, &item::note_id(new_path))
            || tree::contains(tree, &item::folder_id(new_path))
        {
            return Err(VaultError::Conflict(new_path.to_string()));
        }
        let (new_parent, new_base) = item::split_path(new_path);
        let target = Self::parent_target(tree, new_parent)?;
        let mut moved = Self::take_at_path(tree, old_path)
            .ok_or_else(|| VaultError::NotFound(old_path.to_string()))?;
        moved.set_name(item::display_name(new_base));
        tree::reprefix(&mut moved, old_path, new_path);
        tree::insert_into(tree, target.as_deref(), vec![moved]);
        Ok(())
    }
}

#[async_trait]
impl<S: StateSlot> VaultBackend for LocalStore<S> {
    async fn list_tree(&self) -> Result<Vec<Item>> {
        Ok(self.tree.lock().unwrap().clone())
    }

    async fn load_note_body(&self, path: &str) -> Result<NoteBody> {
        let tree = self.tree.lock().unwrap();
        let (item, _) = tree::find(&tree, &item::note_id(path))
            .ok_or_else(|| VaultError::NotFound(path.to_string()))?;
        let note = item
            .as_note()
            .ok_or_else(|| VaultError::InvalidOperation(format!("not a note: {path}")))?;
        Ok(NoteBody {
            content: note.content.clone(),
            tags: note.tags.clone(),
        })
    }

    async fn create_note(&self, parent_path: &str, name: &str) -> Result<String> {
        let path = {
            let mut tree = self.tree.lock().unwrap();
            let target = Self::parent_target(&tree, parent_path)?;
            let note = Note::new(parent_path, name);
            if tree::contains(&tree, &note.id) {
                return Err(VaultError::Conflict(note.path));
            }
            let path = note.path.clone();
            tree::insert_into(&mut tree, target.as_deref(), vec![Item::Note(note)]);
            path
        };
        self.persist().await?;
        Ok(path)
    }

    async fn create_folder(&self, parent_path: &str, name: &str) -> Result<String> {
        let path = {
            let mut tree = self.tree.lock().unwrap();
            let target = Self::parent_target(&tree, parent_path)?;
            let folder = Folder::new(parent_path, name);
            if tree::contains(&tree, &folder.id) {
                return Err(VaultError::Conflict(folder.path));
            }
            let path = folder.path.clone();
            tree::insert_into(&mut tree, target.as_deref(), vec![Item::Folder(folder)]);
            path
        };
        self.persist().await?;
        Ok(path)
    }

    async fn write_note_body(&self, path: &str, content: &str, tags: &[String]) -> Result<()> {
        {
            let mut tree = self.tree.lock().unwrap();
            let note = tree::find_mut(&mut tree, &item::note_id(path))
                .and_then(Item::as_note_mut)
                .ok_or_else(|| VaultError::NotFound(path.to_string()))?;
            note.content = content.to_string();
            note.tags = tags.to_vec();
            note.content_loaded = true;
        }
        self.persist().await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        {
            let mut tree = self.tree.lock().unwrap();
            Self::relocate(&mut tree, old_path, new_path)?;
        }
        self.persist().await
    }

    async fn move_item(&self, source: &str, dest_parent: &str) -> Result<()> {
        let (_, base) = item::split_path(source);
        let new_path = item::join_path(dest_parent, base);
        {
            let mut tree = self.tree.lock().unwrap();
            Self::relocate(&mut tree, source, &new_path)?;
        }
        self.persist().await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        {
            let mut tree = self.tree.lock().unwrap();
            Self::take_at_path(&mut tree, path)
                .ok_or_else(|| VaultError::NotFound(path.to_string()))?;
        }
        self.persist().await
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn empty_store() -> LocalStore<MemorySlot> {
        LocalStore::open(MemorySlot::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_note_commits_path_and_persists() {
        let store = empty_store().await;
        let path = store.create_note("", "New Note").await.unwrap();
        assert_eq!(path, "New Note.md");

        let tree = store.list_tree().await.unwrap();
        assert_eq!(tree.len(), 1);
        let note = tree[0].as_note().unwrap();
        assert!(note.content_loaded);
        assert!(store.slot.raw().unwrap().contains("New Note.md"));
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let store = empty_store().await;
        store.create_note("", "A").await.unwrap();
        let err = store.create_note("", "A").await.unwrap_err();
        assert!(matches!(err, VaultError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_under_missing_parent_is_not_found() {
        let store = empty_store().await;
        let err = store.create_note("Nope", "A").await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_folder_rewrites_descendants() {
        let store = empty_store().await;
        store.create_folder("", "Work").await.unwrap();
        store.create_note("Work", "Todo").await.unwrap();

        store.rename("Work", "Projects").await.unwrap();

        let tree = store.list_tree().await.unwrap();
        let folder = tree[0].as_folder().unwrap();
        assert_eq!(folder.id, "folder:Projects");
        assert_eq!(folder.children[0].id(), "note:Projects/Todo.md");
    }

    #[tokio::test]
    async fn test_move_keeps_base_name() {
        let store = empty_store().await;
        store.create_folder("", "Archive").await.unwrap();
        store.create_note("", "Todo").await.unwrap();

        store.move_item("Todo.md", "Archive").await.unwrap();

        let tree = store.list_tree().await.unwrap();
        let archive = tree[0].as_folder().unwrap();
        assert_eq!(archive.children[0].path(), "Archive/Todo.md");
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let store = empty_store().await;
        store.create_folder("", "Work").await.unwrap();
        store.create_note("Work", "Todo").await.unwrap();

        store.delete("Work").await.unwrap();
        assert!(store.list_tree().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_from_slot_round_trips() {
        use std::sync::Arc;

        let slot = Arc::new(MemorySlot::new());
        {
            let store = LocalStore::open(Arc::clone(&slot)).await.unwrap();
            store.create_note("", "Kept").await.unwrap();
        }
        let store = LocalStore::open(Arc::clone(&slot)).await.unwrap();
        let body = store.load_note_body("Kept.md").await.unwrap();
        assert_eq!(body, NoteBody::default());
    }
}
