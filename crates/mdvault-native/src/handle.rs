//! Capability handles over a directory tree.
//!
//! Access to the vault root is granted as a handle, and every descendant
//! handle is derived from it by name. A [`PermissionGate`] mediates the
//! grant: read access is checked before listing, write access before any
//! mutation, and a denied request is retried once before the operation
//! fails with `PermissionDenied`.

use async_trait::async_trait;

use mdvault_core::Result;

/// Access level a handle operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    ReadWrite,
}

/// Decides whether the process currently holds the requested access.
/// Implementations may prompt the user.
pub trait PermissionGate: Send + Sync {
    fn request(&self, access: Access) -> bool;
}

/// Gate that never prompts. Used where the root handle implies full access.
pub struct AlwaysGranted;

impl PermissionGate for AlwaysGranted {
    fn request(&self, _access: Access) -> bool {
        true
    }
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Handle to a directory. Child handles never escape the subtree they were
/// derived from.
#[async_trait]
pub trait DirHandle: Send + Sync {
    fn name(&self) -> &str;

    /// A second handle to the same directory.
    fn duplicate(&self) -> Box<dyn DirHandle>;

    async fn entries(&self) -> Result<Vec<HandleEntry>>;

    async fn open_dir(&self, name: &str) -> Result<Box<dyn DirHandle>>;

    async fn open_file(&self, name: &str) -> Result<Box<dyn FileHandle>>;

    /// Create a child directory. Fails with `Conflict` when the name is
    /// taken.
    async fn create_dir(&self, name: &str) -> Result<Box<dyn DirHandle>>;

    /// Create a child file. Fails with `Conflict` when the name is taken.
    async fn create_file(&self, name: &str) -> Result<Box<dyn FileHandle>>;

    /// Remove a child entry. `recursive` is required for non-empty
    /// directories.
    async fn remove_entry(&self, name: &str, recursive: bool) -> Result<()>;
}

/// Handle to a single file.
#[async_trait]
pub trait FileHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn read_text(&self) -> Result<String>;

    async fn write_text(&self, text: &str) -> Result<()>;
}
