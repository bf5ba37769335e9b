//! mdvault-remote: vault backend over an HTTP tree service.

pub mod auth;
pub mod backend;
pub mod client;
pub mod models;

pub use auth::{CredentialProvider, StaticCredential};
pub use backend::RemoteStore;
pub use client::ApiClient;
