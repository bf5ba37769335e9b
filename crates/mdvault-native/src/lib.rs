//! mdvault-native: vault backend over capability handles to a local
//! directory tree.

pub mod backend;
pub mod fs_handles;
pub mod handle;

pub use backend::HandleStore;
pub use fs_handles::{FsDirHandle, FsFileHandle};
pub use handle::{Access, AlwaysGranted, DirHandle, FileHandle, HandleEntry, PermissionGate};
