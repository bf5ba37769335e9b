//! Error taxonomy shared by every backend and the engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Access to a handle or resource was refused after a re-prompt.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Target already exists. The backend is authoritative for collisions;
    /// the engine never pre-checks names client-side.
    #[error("already exists: {0}")]
    Conflict(String),

    /// Operation is structurally invalid (move into self/descendant,
    /// wrong file type, malformed archive, ...).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Network, HTTP or I/O layer failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Missing or expired credential. The remote adapter clears the stored
    /// credential when it sees this.
    #[error("not signed in: {0}")]
    Unauthorized(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
