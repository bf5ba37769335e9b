//! Vault items: notes and folders identified by their path.
//!
//! Identity is derived deterministically from `(kind, path)`: `note:{path}`
//! or `folder:{path}`. Note paths carry the `.md` suffix even though display
//! names do not, so renaming or moving an item always goes through
//! [`crate::tree::reprefix`] to rewrite the whole subtree.

use serde::{Deserialize, Serialize};

/// File suffix carried by note paths (display names omit it).
pub const NOTE_SUFFIX: &str = ".md";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Item {
    Note(Note),
    Folder(Folder),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub path: String,
    #[serde(default)]
    pub content_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Item>,
    #[serde(default)]
    pub open: bool,
    pub path: String,
    /// In-flight batch content fetch marker. Transient, never persisted.
    #[serde(skip)]
    pub loading_contents: bool,
}

/// Derive a note id from its path.
pub fn note_id(path: &str) -> String {
    format!("note:{path}")
}

/// Derive a folder id from its path.
pub fn folder_id(path: &str) -> String {
    format!("folder:{path}")
}

/// Join a parent path and a base name. The empty string is the root.
pub fn join_path(parent: &str, base: &str) -> String {
    if parent.is_empty() {
        base.to_string()
    } else {
        format!("{parent}/{base}")
    }
}

/// Split a path into `(parent, base)`. Root-level items have an empty parent.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, base)) => (parent, base),
        None => ("", path),
    }
}

/// File name a note with this display name is stored under.
pub fn note_file_name(name: &str) -> String {
    format!("{name}{NOTE_SUFFIX}")
}

/// Display name for a stored file name (strips the note suffix).
pub fn display_name(file_name: &str) -> &str {
    file_name.strip_suffix(NOTE_SUFFIX).unwrap_or(file_name)
}

impl Note {
    /// A freshly created note with its body considered loaded.
    pub fn new(parent_path: &str, name: &str) -> Self {
        Self::at_path(&join_path(parent_path, &note_file_name(name)), true)
    }

    /// A note at a committed path. `loaded` is false for backends that
    /// fetch bodies lazily.
    pub fn at_path(path: &str, loaded: bool) -> Self {
        let (_, base) = split_path(path);
        Self {
            id: note_id(path),
            name: display_name(base).to_string(),
            content: String::new(),
            tags: Vec::new(),
            path: path.to_string(),
            content_loaded: loaded,
        }
    }
}

impl Folder {
    pub fn new(parent_path: &str, name: &str) -> Self {
        Self::at_path(&join_path(parent_path, name), Vec::new())
    }

    pub fn at_path(path: &str, children: Vec<Item>) -> Self {
        let (_, base) = split_path(path);
        Self {
            id: folder_id(path),
            name: base.to_string(),
            children,
            open: false,
            path: path.to_string(),
            loading_contents: false,
        }
    }
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Note(n) => &n.id,
            Item::Folder(f) => &f.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Note(n) => &n.name,
            Item::Folder(f) => &f.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Item::Note(n) => &n.path,
            Item::Folder(f) => &f.path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Item::Folder(_))
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Item::Note(n) => Some(n),
            Item::Folder(_) => None,
        }
    }

    pub fn as_note_mut(&mut self) -> Option<&mut Note> {
        match self {
            Item::Note(n) => Some(n),
            Item::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Item::Folder(f) => Some(f),
            Item::Note(_) => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match self {
            Item::Folder(f) => Some(f),
            Item::Note(_) => None,
        }
    }

    /// Set the display name without touching path or id. Identity rewrite
    /// is always a separate [`crate::tree::reprefix`] step.
    pub fn set_name(&mut self, name: &str) {
        match self {
            Item::Note(n) => n.name = name.to_string(),
            Item::Folder(f) => f.name = name.to_string(),
        }
    }
}
