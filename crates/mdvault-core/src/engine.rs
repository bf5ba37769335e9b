//! Synchronization engine.
//!
//! Owns the in-memory item tree and drives a [`VaultBackend`] underneath it.
//! Mutating operations are optimistic: the backend commits first, then the
//! tree is patched to match, so a backend failure leaves the tree exactly as
//! it was. Every failed operation emits one error notice on the event bus.
//!
//! Backends that cannot report the full effect of an operation (archive
//! uploads, server-side moves) return [`OpStatus::Partial`]; the caller is
//! expected to follow up with [`SyncEngine::refresh`].

use std::sync::Arc;

use crate::archive::{self, ArchiveEntry};
use crate::backend::VaultBackend;
use crate::error::{Result, VaultError};
use crate::events::{EventBus, VaultEvent};
use crate::frontmatter::{self, FrontMatter};
use crate::item::{self, Folder, Item, Note, NOTE_SUFFIX};
use crate::tree;

/// Outcome of a successful engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    /// Backend and tree both reflect the change.
    Committed,
    /// Backend committed but the tree is stale; refresh to converge.
    Partial,
    /// Nothing to do.
    Noop,
}

pub struct SyncEngine {
    backend: Arc<dyn VaultBackend>,
    tree: Vec<Item>,
    events: Arc<EventBus>,
}

impl SyncEngine {
    pub fn new(backend: Arc<dyn VaultBackend>, events: Arc<EventBus>) -> Self {
        Self {
            backend,
            tree: Vec::new(),
            events,
        }
    }

    pub fn tree(&self) -> &[Item] {
        &self.tree
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Replace the tree with a fresh backend listing.
    pub async fn refresh(&mut self) -> Result<()> {
        let res = self.refresh_inner().await;
        self.observe(res)
    }

    async fn refresh_inner(&mut self) -> Result<()> {
        let mut items = self.backend.list_tree().await?;
        tree::sort_deep(&mut items);
        self.tree = items;
        self.events.emit(VaultEvent::TreeRefreshed);
        tracing::debug!(backend = self.backend.name(), "tree refreshed");
        Ok(())
    }

    /// Create a note next to the active item (inside it when the active item
    /// is a folder, as a sibling when it is a note, at the root otherwise).
    pub async fn add_note(&mut self, active: Option<&str>, name: &str) -> Result<OpStatus> {
        let res = self.add_note_inner(active, name).await;
        self.observe(res)
    }

    async fn add_note_inner(&mut self, active: Option<&str>, name: &str) -> Result<OpStatus> {
        let (parent_path, parent_id) = self.resolve_parent(active);
        let committed = self.backend.create_note(&parent_path, name).await?;

        let note = Item::Note(Note::at_path(&committed, true));
        if !tree::insert_into(&mut self.tree, parent_id.as_deref(), vec![note]) {
            return Ok(OpStatus::Partial);
        }
        Ok(OpStatus::Committed)
    }

    /// Create a folder, with the same parent resolution as [`Self::add_note`].
    pub async fn add_folder(&mut self, active: Option<&str>, name: &str) -> Result<OpStatus> {
        let res = self.add_folder_inner(active, name).await;
        self.observe(res)
    }

    async fn add_folder_inner(&mut self, active: Option<&str>, name: &str) -> Result<OpStatus> {
        let (parent_path, parent_id) = self.resolve_parent(active);
        let committed = self.backend.create_folder(&parent_path, name).await?;

        let folder = Item::Folder(Folder::at_path(&committed, Vec::new()));
        if !tree::insert_into(&mut self.tree, parent_id.as_deref(), vec![folder]) {
            return Ok(OpStatus::Partial);
        }
        Ok(OpStatus::Committed)
    }

    /// Rename an item in place. Path-derived identity means a folder rename
    /// rewrites the id of every descendant.
    pub async fn rename(&mut self, id: &str, new_name: &str) -> Result<OpStatus> {
        let res = self.rename_inner(id, new_name).await;
        self.observe(res)
    }

    async fn rename_inner(&mut self, id: &str, new_name: &str) -> Result<OpStatus> {
        let new_name = new_name.trim();
        let (item, _) = tree::find(&self.tree, id)
            .ok_or_else(|| VaultError::NotFound(format!("no item {id}")))?;
        if new_name.is_empty() || new_name == item.name() {
            return Ok(OpStatus::Noop);
        }

        let old_path = item.path().to_string();
        let (parent, _) = item::split_path(&old_path);
        let new_base = if item.is_folder() {
            new_name.to_string()
        } else {
            item::note_file_name(new_name)
        };
        let new_path = item::join_path(parent, &new_base);
        let mut patched = item.clone();

        self.backend.rename(&old_path, &new_path).await?;

        patched.set_name(new_name);
        tree::reprefix(&mut patched, &old_path, &new_path);
        tree::replace_and_resort(&mut self.tree, id, patched);
        Ok(OpStatus::Committed)
    }

    /// Move an item under another folder (or the root when `dest` is `None`),
    /// keeping its base name.
    pub async fn move_to(&mut self, id: &str, dest: Option<&str>) -> Result<OpStatus> {
        let res = self.move_inner(id, dest).await;
        self.observe(res)
    }

    async fn move_inner(&mut self, id: &str, dest: Option<&str>) -> Result<OpStatus> {
        let (item, _) = tree::find(&self.tree, id)
            .ok_or_else(|| VaultError::NotFound(format!("no item {id}")))?;
        let source = item.path().to_string();
        let (current_parent, base) = item::split_path(&source);
        let base = base.to_string();

        let dest_path = match dest {
            None => String::new(),
            Some(dest_id) => {
                let (target, _) = tree::find(&self.tree, dest_id)
                    .ok_or_else(|| VaultError::NotFound(format!("no folder {dest_id}")))?;
                if !target.is_folder() {
                    return Err(VaultError::InvalidOperation(
                        "move target must be a folder".into(),
                    ));
                }
                target.path().to_string()
            }
        };

        if dest_path == source || dest_path.starts_with(&format!("{source}/")) {
            return Err(VaultError::InvalidOperation(
                "cannot move an item into itself".into(),
            ));
        }
        if dest_path == current_parent {
            return Err(VaultError::InvalidOperation(
                "item is already in that folder".into(),
            ));
        }

        self.backend.move_item(&source, &dest_path).await?;

        if self.backend.relist_after_move() {
            // The backend rebuilt paths server-side; the local tree is stale.
            return Ok(OpStatus::Partial);
        }

        let Some(mut moved) = tree::remove_by_id(&mut self.tree, id) else {
            return Ok(OpStatus::Partial);
        };
        let new_path = item::join_path(&dest_path, &base);
        tree::reprefix(&mut moved, &source, &new_path);
        let parent_id = if dest_path.is_empty() {
            None
        } else {
            Some(item::folder_id(&dest_path))
        };
        if !tree::insert_into(&mut self.tree, parent_id.as_deref(), vec![moved]) {
            return Ok(OpStatus::Partial);
        }
        Ok(OpStatus::Committed)
    }

    /// Delete an item (recursively, for folders).
    pub async fn delete(&mut self, id: &str) -> Result<OpStatus> {
        let res = self.delete_inner(id).await;
        self.observe(res)
    }

    async fn delete_inner(&mut self, id: &str) -> Result<OpStatus> {
        let (item, _) = tree::find(&self.tree, id)
            .ok_or_else(|| VaultError::NotFound(format!("no item {id}")))?;
        let path = item.path().to_string();

        self.backend.delete(&path).await?;
        tree::remove_by_id(&mut self.tree, id);
        Ok(OpStatus::Committed)
    }

    /// Ensure a note's body is present, fetching it when the backend serves
    /// bodies lazily.
    pub async fn open_note(&mut self, id: &str) -> Result<OpStatus> {
        let res = self.open_note_inner(id).await;
        self.observe(res)
    }

    async fn open_note_inner(&mut self, id: &str) -> Result<OpStatus> {
        let note = tree::find(&self.tree, id)
            .and_then(|(item, _)| item.as_note())
            .ok_or_else(|| VaultError::NotFound(format!("no note {id}")))?;
        if note.content_loaded {
            return Ok(OpStatus::Noop);
        }
        let path = note.path.clone();

        let body = self.backend.load_note_body(&path).await?;

        // The note may have been removed while the fetch was in flight.
        let Some(note) = tree::find_mut(&mut self.tree, id).and_then(Item::as_note_mut) else {
            return Ok(OpStatus::Noop);
        };
        note.content = body.content;
        note.tags = body.tags;
        note.content_loaded = true;
        self.events.emit(VaultEvent::NoteLoaded { id: id.to_string() });
        Ok(OpStatus::Committed)
    }

    /// Open a folder and batch-fetch the bodies of its direct child notes.
    /// Individual fetch failures are reported as notices without failing the
    /// whole operation.
    pub async fn expand_folder(&mut self, id: &str) -> Result<OpStatus> {
        let res = self.expand_folder_inner(id).await;
        self.observe(res)
    }

    async fn expand_folder_inner(&mut self, id: &str) -> Result<OpStatus> {
        let folder = tree::find_folder_mut(&mut self.tree, id)
            .ok_or_else(|| VaultError::NotFound(format!("no folder {id}")))?;
        folder.open = true;

        let pending: Vec<(String, String)> = folder
            .children
            .iter()
            .filter_map(|child| child.as_note())
            .filter(|note| !note.content_loaded)
            .map(|note| (note.id.clone(), note.path.clone()))
            .collect();
        if pending.is_empty() {
            return Ok(OpStatus::Committed);
        }
        folder.loading_contents = true;

        let fetches = pending.into_iter().map(|(note_id, path)| {
            let backend = Arc::clone(&self.backend);
            async move {
                let body = backend.load_note_body(&path).await;
                (note_id, body)
            }
        });
        let results = futures::future::join_all(fetches).await;

        for (note_id, body) in results {
            match body {
                Ok(body) => {
                    if let Some(note) =
                        tree::find_mut(&mut self.tree, &note_id).and_then(Item::as_note_mut)
                    {
                        note.content = body.content;
                        note.tags = body.tags;
                        note.content_loaded = true;
                        self.events.emit(VaultEvent::NoteLoaded { id: note_id });
                    }
                }
                Err(e) => self.events.error(format!("failed to load {note_id}: {e}")),
            }
        }
        if let Some(folder) = tree::find_folder_mut(&mut self.tree, id) {
            folder.loading_contents = false;
        }
        Ok(OpStatus::Committed)
    }

    /// Write a note's body. Passing `None` for tags keeps the stored ones,
    /// fetching them first if the body was never loaded.
    pub async fn update_note(
        &mut self,
        id: &str,
        content: &str,
        tags: Option<Vec<String>>,
    ) -> Result<OpStatus> {
        let res = self.update_note_inner(id, content, tags).await;
        self.observe(res)
    }

    async fn update_note_inner(
        &mut self,
        id: &str,
        content: &str,
        tags: Option<Vec<String>>,
    ) -> Result<OpStatus> {
        let note = tree::find(&self.tree, id)
            .and_then(|(item, _)| item.as_note())
            .ok_or_else(|| VaultError::NotFound(format!("no note {id}")))?;
        let path = note.path.clone();

        let tags = match tags {
            Some(tags) => tags,
            None if note.content_loaded => note.tags.clone(),
            None => self.backend.load_note_body(&path).await?.tags,
        };

        self.backend.write_note_body(&path, content, &tags).await?;

        if let Some(note) = tree::find_mut(&mut self.tree, id).and_then(Item::as_note_mut) {
            note.content = content.to_string();
            note.tags = tags;
            note.content_loaded = true;
        }
        Ok(OpStatus::Committed)
    }

    /// Import a single note or a zip archive under a folder (or the root).
    pub async fn import_file(
        &mut self,
        dest: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<OpStatus> {
        let res = self.import_inner(dest, file_name, bytes).await;
        self.observe(res)
    }

    async fn import_inner(
        &mut self,
        dest: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<OpStatus> {
        let (dest_path, dest_id) = match dest {
            None => (String::new(), None),
            Some(dest_folder) => {
                let folder = tree::find(&self.tree, dest_folder)
                    .and_then(|(item, _)| item.as_folder())
                    .ok_or_else(|| VaultError::NotFound(format!("no folder {dest_folder}")))?;
                (folder.path.clone(), Some(folder.id.clone()))
            }
        };

        if file_name.ends_with(NOTE_SUFFIX) {
            return self
                .import_note(&dest_path, dest_id.as_deref(), file_name, bytes)
                .await;
        }
        if file_name.ends_with(".zip") {
            return self
                .import_archive(&dest_path, dest_id.as_deref(), file_name, bytes)
                .await;
        }
        Err(VaultError::InvalidOperation(format!(
            "cannot import {file_name}: only notes and zip archives are supported"
        )))
    }

    async fn import_note(
        &mut self,
        dest_path: &str,
        dest_id: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<OpStatus> {
        let text = String::from_utf8_lossy(&bytes);
        let parsed = frontmatter::parse(&text);
        let name = item::display_name(file_name);

        let committed = self.backend.create_note(dest_path, name).await?;
        self.backend
            .write_note_body(&committed, &parsed.body, &parsed.matter.tags)
            .await?;

        let mut note = Note::at_path(&committed, true);
        note.content = parsed.body;
        note.tags = parsed.matter.tags;
        if !tree::insert_into(&mut self.tree, dest_id, vec![Item::Note(note)]) {
            return Ok(OpStatus::Partial);
        }
        Ok(OpStatus::Committed)
    }

    async fn import_archive(
        &mut self,
        dest_path: &str,
        dest_id: Option<&str>,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<OpStatus> {
        // Backends that accept whole archives unpack them server-side.
        if self
            .backend
            .upload_archive(dest_path, file_name, bytes.clone())
            .await?
        {
            return Ok(OpStatus::Partial);
        }

        let entries = archive::read_zip(&bytes)?;
        let incoming = archive::tree_from_entries(&entries, dest_path);

        for cmd in persist_commands(&incoming) {
            match cmd {
                PersistCmd::Folder { parent, name } => {
                    match self.backend.create_folder(&parent, &name).await {
                        Ok(_) => {}
                        // An existing folder just means the import merges.
                        Err(VaultError::Conflict(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                PersistCmd::Note {
                    parent,
                    name,
                    content,
                    tags,
                } => {
                    let committed = self.backend.create_note(&parent, &name).await?;
                    self.backend
                        .write_note_body(&committed, &content, &tags)
                        .await?;
                }
            }
        }

        let level = match dest_id {
            None => &mut self.tree,
            Some(dest_id) => {
                let Some(folder) = tree::find_folder_mut(&mut self.tree, dest_id) else {
                    return Ok(OpStatus::Partial);
                };
                &mut folder.children
            }
        };
        tree::merge_level(level, incoming);
        self.events
            .info(format!("imported {} entries from {file_name}", entries.len()));
        Ok(OpStatus::Committed)
    }

    /// Render a note (body plus metadata block) for export.
    pub async fn export_note(&mut self, id: &str) -> Result<String> {
        let res = self.export_note_inner(id).await;
        self.observe(res)
    }

    async fn export_note_inner(&mut self, id: &str) -> Result<String> {
        self.open_note_inner(id).await?;
        let note = tree::find(&self.tree, id)
            .and_then(|(item, _)| item.as_note())
            .ok_or_else(|| VaultError::NotFound(format!("no note {id}")))?;
        let matter = FrontMatter::with_tags(note.tags.clone());
        Ok(frontmatter::serialize(&matter, &note.content))
    }

    /// Export a folder subtree as `(file_name, zip bytes)`, preferring a
    /// backend-built archive when one is offered.
    pub async fn export_folder(&mut self, id: &str) -> Result<(String, Vec<u8>)> {
        let res = self.export_folder_inner(id).await;
        self.observe(res)
    }

    async fn export_folder_inner(&mut self, id: &str) -> Result<(String, Vec<u8>)> {
        let folder = tree::find(&self.tree, id)
            .and_then(|(item, _)| item.as_folder())
            .ok_or_else(|| VaultError::NotFound(format!("no folder {id}")))?;
        let file_name = format!("{}.zip", folder.name);
        let path = folder.path.clone();

        if let Some(bytes) = self.backend.export_archive(&path).await? {
            return Ok((file_name, bytes));
        }

        // Every descendant body has to be present before flattening.
        let mut pending = Vec::new();
        collect_unloaded(std::slice::from_ref(&self.tree_item(id)?), &mut pending);
        for note_id in pending {
            self.open_note_inner(&note_id).await?;
        }

        let folder = tree::find(&self.tree, id)
            .and_then(|(item, _)| item.as_folder())
            .ok_or_else(|| VaultError::NotFound(format!("no folder {id}")))?;
        let mut entries = vec![ArchiveEntry::file(
            archive::INDEX_FILE,
            archive::index_document(folder),
        )];
        entries.extend(archive::flatten(folder));
        let bytes = archive::build_zip(&entries)?;
        Ok((file_name, bytes))
    }

    fn tree_item(&self, id: &str) -> Result<Item> {
        tree::find(&self.tree, id)
            .map(|(item, _)| item.clone())
            .ok_or_else(|| VaultError::NotFound(format!("no item {id}")))
    }

    /// Parent resolution for create operations: a folder hosts new items, a
    /// note puts them beside itself, anything else means the root.
    fn resolve_parent(&self, active: Option<&str>) -> (String, Option<String>) {
        let Some(active) = active else {
            return (String::new(), None);
        };
        match tree::find(&self.tree, active) {
            Some((Item::Folder(folder), _)) => (folder.path.clone(), Some(folder.id.clone())),
            Some((Item::Note(note), _)) => {
                let (parent, _) = item::split_path(&note.path);
                if parent.is_empty() {
                    (String::new(), None)
                } else {
                    (parent.to_string(), Some(item::folder_id(parent)))
                }
            }
            None => {
                tracing::debug!("active item {active} not in tree, creating at root");
                (String::new(), None)
            }
        }
    }

    /// Emit one error notice per failed operation.
    fn observe<T>(&self, res: Result<T>) -> Result<T> {
        if let Err(e) = &res {
            self.events.error(e.to_string());
        }
        res
    }
}

enum PersistCmd {
    Folder {
        parent: String,
        name: String,
    },
    Note {
        parent: String,
        name: String,
        content: String,
        tags: Vec<String>,
    },
}

/// Depth-first backend writes for a synthesized subtree, parents before
/// children.
fn persist_commands(items: &[Item]) -> Vec<PersistCmd> {
    let mut cmds = Vec::new();
    collect_commands(items, &mut cmds);
    cmds
}

fn collect_commands(items: &[Item], out: &mut Vec<PersistCmd>) {
    for item in items {
        match item {
            Item::Folder(folder) => {
                let (parent, name) = item::split_path(&folder.path);
                out.push(PersistCmd::Folder {
                    parent: parent.to_string(),
                    name: name.to_string(),
                });
                collect_commands(&folder.children, out);
            }
            Item::Note(note) => {
                let (parent, _) = item::split_path(&note.path);
                out.push(PersistCmd::Note {
                    parent: parent.to_string(),
                    name: note.name.clone(),
                    content: note.content.clone(),
                    tags: note.tags.clone(),
                });
            }
        }
    }
}

fn collect_unloaded(items: &[Item], out: &mut Vec<String>) {
    for item in items {
        match item {
            Item::Folder(folder) => collect_unloaded(&folder.children, out),
            Item::Note(note) => {
                if !note.content_loaded {
                    out.push(note.id.clone());
                }
            }
        }
    }
}
