//! Archive transform: folder-tree <-> flat-entry conversion for bulk
//! import/export, plus zip encoding on both sides.
//!
//! Entry paths are relative with `/` separators. On import the reserved
//! index document and platform metadata entries are ignored, and folders
//! are synthesized for path segments that do not yet exist.

use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Result, VaultError};
use crate::frontmatter::{self, FrontMatter};
use crate::item::{self, Folder, Item, Note, NOTE_SUFFIX};
use crate::tree;

/// Generated table-of-contents document emitted at the archive root on
/// export and ignored on import.
pub const INDEX_FILE: &str = "INDEX.md";

/// Platform metadata directories skipped on import.
const IGNORED_PREFIXES: &[&str] = &["__MACOSX/"];
/// Platform metadata files skipped on import.
const IGNORED_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// One flat archive entry. Folder entries end with `/` and carry no content.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: String,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            content: String::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }
}

/// Flatten a folder subtree into an ordered set of entries whose relative
/// paths mirror the folder structure. Notes must be loaded; the engine
/// guarantees that before exporting.
pub fn flatten(folder: &Folder) -> Vec<ArchiveEntry> {
    let mut entries = Vec::new();
    flatten_level(&folder.children, "", &mut entries);
    entries
}

fn flatten_level(items: &[Item], base: &str, out: &mut Vec<ArchiveEntry>) {
    for item in items {
        match item {
            Item::Folder(folder) => {
                let dir = item::join_path(base, &folder.name);
                out.push(ArchiveEntry::dir(dir.clone()));
                flatten_level(&folder.children, &dir, out);
            }
            Item::Note(note) => {
                let path = item::join_path(base, &item::note_file_name(&note.name));
                let matter = FrontMatter::with_tags(note.tags.clone());
                out.push(ArchiveEntry::file(path, frontmatter::serialize(&matter, &note.content)));
            }
        }
    }
}

/// The generated index document: every descendant path in depth-first order,
/// indented two spaces per level.
pub fn index_document(folder: &Folder) -> String {
    let mut out = format!("# {}\n\n", folder.name);
    index_level(&folder.children, 0, &mut out);
    out
}

fn index_level(items: &[Item], depth: usize, out: &mut String) {
    for item in items {
        let indent = "  ".repeat(depth);
        match item {
            Item::Folder(folder) => {
                out.push_str(&format!("{indent}- {}/\n", folder.name));
                index_level(&folder.children, depth + 1, out);
            }
            Item::Note(note) => {
                out.push_str(&format!("{indent}- {}\n", item::note_file_name(&note.name)));
            }
        }
    }
}

/// Encode entries as a zip archive.
pub fn build_zip(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();

    for entry in entries {
        if entry.is_dir() {
            writer
                .add_directory(entry.path.trim_end_matches('/'), options)
                .map_err(|e| VaultError::Transport(format!("archive write: {e}")))?;
        } else {
            writer
                .start_file(entry.path.as_str(), options)
                .map_err(|e| VaultError::Transport(format!("archive write: {e}")))?;
            writer
                .write_all(entry.content.as_bytes())
                .map_err(|e| VaultError::Transport(format!("archive write: {e}")))?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| VaultError::Transport(format!("archive write: {e}")))?;
    Ok(cursor.into_inner())
}

/// Decode a zip archive into entries, dropping the reserved index document
/// and platform metadata.
pub fn read_zip(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| VaultError::InvalidOperation(format!("invalid archive: {e}")))?;

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| VaultError::InvalidOperation(format!("invalid archive: {e}")))?;
        let name = file.name().to_string();
        if is_ignored(&name) {
            tracing::debug!("skipping archive entry: {name}");
            continue;
        }
        if file.is_dir() {
            entries.push(ArchiveEntry::dir(name));
            continue;
        }
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)
            .map_err(|e| VaultError::InvalidOperation(format!("invalid archive: {e}")))?;
        entries.push(ArchiveEntry::file(
            name,
            String::from_utf8_lossy(&raw).into_owned(),
        ));
    }
    Ok(entries)
}

fn is_ignored(name: &str) -> bool {
    if IGNORED_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return true;
    }
    let base = name.rsplit('/').next().unwrap_or(name);
    base == INDEX_FILE || IGNORED_NAMES.contains(&base)
}

/// Reconstruct a nested item tree from flat entries, synthesizing
/// intermediate folders. All produced paths are absolute under `base_path`.
/// Non-note files are skipped.
pub fn tree_from_entries(entries: &[ArchiveEntry], base_path: &str) -> Vec<Item> {
    let mut items = Vec::new();

    for entry in entries {
        let clean = entry.path.trim_matches('/');
        if clean.is_empty() {
            continue;
        }
        let segments: Vec<&str> = clean.split('/').collect();

        if entry.is_dir() {
            ensure_folder_chain(&mut items, base_path, &segments);
            continue;
        }

        let (folders, file) = segments.split_at(segments.len() - 1);
        if !file[0].ends_with(NOTE_SUFFIX) {
            tracing::debug!("skipping non-note archive entry: {}", entry.path);
            continue;
        }
        let level = ensure_folder_chain(&mut items, base_path, folders);
        let parent_path = item::join_path(
            base_path,
            &folders.join("/"),
        );
        let parsed = frontmatter::parse(&entry.content);
        let mut note = Note::new(parent_path.trim_matches('/'), item::display_name(file[0]));
        note.content = parsed.body;
        note.tags = parsed.matter.tags;
        level.push(Item::Note(note));
    }

    tree::sort_deep(&mut items);
    items
}

/// Walk (creating as needed) the folder chain for `segments`, returning the
/// level the last segment's children live in.
fn ensure_folder_chain<'a>(
    items: &'a mut Vec<Item>,
    base_path: &str,
    segments: &[&str],
) -> &'a mut Vec<Item> {
    let mut level = items;
    let mut path = base_path.trim_matches('/').to_string();
    for seg in segments {
        path = item::join_path(&path, seg);
        let id = item::folder_id(&path);
        let pos = match level.iter().position(|i| i.id() == id) {
            Some(pos) => pos,
            None => {
                level.push(Item::Folder(Folder::at_path(&path, Vec::new())));
                level.len() - 1
            }
        };
        level = match &mut level[pos] {
            Item::Folder(folder) => &mut folder.children,
            // Folder ids never collide with note ids.
            Item::Note(_) => unreachable!("folder chain position holds a folder"),
        };
    }
    level
}
