//! Credential plumbing for the remote tree service.

use std::sync::RwLock;

/// Source of the bearer token attached to every request. `clear` is called
/// when the server rejects the token, so a stale credential is never
/// retried.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;

    fn clear(&self);
}

/// A fixed token, clearable once.
pub struct StaticCredential {
    token: RwLock<Option<String>>,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// No credential at all. Requests fail with `Unauthorized` until a real
    /// provider replaces this.
    pub fn missing() -> Self {
        Self {
            token: RwLock::new(None),
        }
    }
}

impl CredentialProvider for StaticCredential {
    fn token(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear(&self) {
        self.token.write().unwrap_or_else(|e| e.into_inner()).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credential_clears_once() {
        let creds = StaticCredential::new("secret");
        assert_eq!(creds.token().as_deref(), Some("secret"));
        creds.clear();
        assert_eq!(creds.token(), None);
    }
}
