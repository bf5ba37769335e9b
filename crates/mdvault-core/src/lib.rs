//! mdvault-core: hierarchical markdown vault kept in sync with an
//! interchangeable storage backend.
//!
//! This crate provides the core functionality for:
//! - The in-memory item tree (notes and folders with path-derived identity)
//! - Pure tree algebra (find/insert/remove/replace/reprefix/sort)
//! - Front-matter parsing/serialization
//! - The `VaultBackend` trait and the local persisted store
//! - The synchronization engine that drives every user-facing operation
//! - Archive (folder-tree <-> flat-entry) import/export

pub mod archive;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod frontmatter;
pub mod item;
pub mod store;
pub mod tree;

pub use backend::{NoteBody, VaultBackend};
pub use config::{BackendKind, VaultConfig};
pub use engine::{OpStatus, SyncEngine};
pub use error::{Result, VaultError};
pub use events::{EventBus, NoticeLevel, Subscription, VaultEvent};
pub use item::{Folder, Item, Note};
pub use store::{LocalStore, MemorySlot, StateSlot};
