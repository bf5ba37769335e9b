//! HTTP client for the remote tree service.
//!
//! Every call attaches the current bearer token; a missing token fails with
//! `Unauthorized` before any network traffic, and a 401 response clears the
//! stored credential so it is never retried.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};

use mdvault_core::{Result, VaultError};

use crate::auth::CredentialProvider;
use crate::models::{
    CreateFileRequest, CreateFolderRequest, DeleteRequest, MoveRequest, RemoteNode, RenameRequest,
    UpdateFileRequest,
};

pub struct ApiClient {
    http: reqwest::Client,
    /// Base URL without a trailing slash.
    base: String,
    creds: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(base_url: &str, creds: Arc<dyn CredentialProvider>) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(VaultError::InvalidOperation(
                "server url must not be empty".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| VaultError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
            creds,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn bearer(&self) -> Result<String> {
        self.creds
            .token()
            .ok_or_else(|| VaultError::Unauthorized("no credential available".into()))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let token = self.bearer()?;
        let resp = req
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))?;
        self.check(resp).await
    }

    /// Map non-success statuses onto the vault error taxonomy. Some server
    /// builds report name collisions as a plain 500 with an "already exists"
    /// body, so the body is inspected as a fallback.
    async fn check(&self, resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let err = match status {
            StatusCode::UNAUTHORIZED => {
                self.creds.clear();
                VaultError::Unauthorized("credential rejected".into())
            }
            StatusCode::FORBIDDEN => VaultError::PermissionDenied("access forbidden".into()),
            StatusCode::NOT_FOUND => VaultError::NotFound("no such remote item".into()),
            StatusCode::CONFLICT => VaultError::Conflict("remote item already exists".into()),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                tracing::debug!(status = %status, "remote error: {body}");
                if body.to_lowercase().contains("exist") {
                    VaultError::Conflict(body)
                } else {
                    VaultError::Transport(format!("server returned {status}: {body}"))
                }
            }
        };
        Err(err)
    }

    pub async fn fetch_tree(&self) -> Result<Vec<RemoteNode>> {
        let resp = self.send(self.http.get(self.url("/tree"))).await?;
        resp.json()
            .await
            .map_err(|e| VaultError::Transport(format!("bad tree listing: {e}")))
    }

    pub async fn download_file(&self, path: &str) -> Result<String> {
        let req = self
            .http
            .get(self.url("/download/file"))
            .query(&[("path", path)]);
        let resp = self.send(req).await?;
        resp.text()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))
    }

    pub async fn create_file(&self, parent: &str, name: &str, content: &str) -> Result<()> {
        let req = self.http.post(self.url("/files/create")).json(&CreateFileRequest {
            file_path: parent,
            file_name: name,
            content,
        });
        self.send(req).await.map(drop)
    }

    pub async fn update_file(&self, path: &str, content: &str) -> Result<()> {
        let req = self.http.post(self.url("/files/update")).json(&UpdateFileRequest {
            file_name: path,
            content,
        });
        self.send(req).await.map(drop)
    }

    pub async fn create_folder(&self, parent: &str, name: &str) -> Result<()> {
        let req = self
            .http
            .post(self.url("/folders/create"))
            .json(&CreateFolderRequest {
                folder_path: parent,
                folder_name: name,
            });
        self.send(req).await.map(drop)
    }

    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        let req = self.http.post(self.url("/rename")).json(&RenameRequest {
            old_path,
            new_path,
        });
        self.send(req).await.map(drop)
    }

    pub async fn move_item(&self, source: &str, destination: &str) -> Result<()> {
        let req = self.http.post(self.url("/move")).json(&MoveRequest {
            source,
            destination,
        });
        self.send(req).await.map(drop)
    }

    pub async fn delete(&self, target: &str) -> Result<()> {
        let req = self
            .http
            .post(self.url("/delete"))
            .json(&DeleteRequest { target });
        self.send(req).await.map(drop)
    }

    /// Ship a whole zip archive; the server unpacks it under `target`.
    pub async fn upload_archive(&self, target: &str, name: &str, bytes: Vec<u8>) -> Result<()> {
        let part = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str("application/zip")
            .map_err(|e| VaultError::Transport(e.to_string()))?;
        let form = Form::new()
            .part("archive", part)
            .text("target", target.to_string());
        let req = self.http.post(self.url("/upload")).multipart(form);
        self.send(req).await.map(drop)
    }

    /// Ask the server to bundle a subtree as a zip archive.
    pub async fn export_archive(&self, target: &str) -> Result<Vec<u8>> {
        let req = self
            .http
            .get(self.url("/export"))
            .query(&[("target", target), ("type", "zip")]);
        let resp = self.send(req).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| VaultError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredential;

    struct NoCredential;

    impl CredentialProvider for NoCredential {
        fn token(&self) -> Option<String> {
            None
        }

        fn clear(&self) {}
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_network() {
        let client = ApiClient::new("http://localhost:1", Arc::new(NoCredential)).unwrap();
        let err = client.fetch_tree().await.unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let creds = Arc::new(StaticCredential::new("t"));
        let client = ApiClient::new("http://host/api/", creds).unwrap();
        assert_eq!(client.url("/tree"), "http://host/api/tree");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let creds = Arc::new(StaticCredential::new("t"));
        assert!(ApiClient::new("  ", creds).is_err());
    }
}
