//! Vault configuration: which backend to drive and where it lives.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Persisted in-process store backed by a state slot.
    Local,
    /// Capability-handle file tree on the local filesystem.
    Native,
    /// Remote HTTP tree.
    Remote,
}

impl std::str::FromStr for BackendKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "native" => Ok(Self::Native),
            "remote" => Ok(Self::Remote),
            other => Err(VaultError::InvalidOperation(format!(
                "unknown backend: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Local => "local",
            Self::Native => "native",
            Self::Remote => "remote",
        };
        f.write_str(s)
    }
}

/// Runtime configuration for opening a vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub backend: BackendKind,
    /// Root directory for the native backend, or the state file for the
    /// local one.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Base URL of the remote tree service.
    #[serde(default)]
    pub server_url: Option<String>,
}

impl VaultConfig {
    pub fn local(root: Option<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Local,
            root,
            server_url: None,
        }
    }

    pub fn native(root: PathBuf) -> Self {
        Self {
            backend: BackendKind::Native,
            root: Some(root),
            server_url: None,
        }
    }

    pub fn remote(server_url: String) -> Self {
        Self {
            backend: BackendKind::Remote,
            root: None,
            server_url: Some(server_url),
        }
    }

    /// Reject configurations missing the inputs their backend needs.
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            BackendKind::Local => Ok(()),
            BackendKind::Native => {
                if self.root.is_none() {
                    return Err(VaultError::InvalidOperation(
                        "native backend needs a root directory".into(),
                    ));
                }
                Ok(())
            }
            BackendKind::Remote => {
                if self.server_url.is_none() {
                    return Err(VaultError::InvalidOperation(
                        "remote backend needs a server url".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse_and_display() {
        assert_eq!("remote".parse::<BackendKind>().unwrap(), BackendKind::Remote);
        assert_eq!(BackendKind::Native.to_string(), "native");
        assert!("sqlite".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_validate_requires_backend_inputs() {
        assert!(VaultConfig::local(None).validate().is_ok());
        assert!(VaultConfig::remote("http://localhost:8080".into()).validate().is_ok());

        let broken = VaultConfig {
            backend: BackendKind::Native,
            root: None,
            server_url: None,
        };
        assert!(broken.validate().is_err());
    }
}
