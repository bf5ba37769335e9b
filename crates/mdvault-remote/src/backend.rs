//! Vault backend over the remote tree service.
//!
//! The server owns path layout: after a move it rebuilds child paths
//! itself, so the engine is told to relist instead of patching locally.

use async_trait::async_trait;

use mdvault_core::frontmatter::{self, FrontMatter};
use mdvault_core::item::{self, Item};
use mdvault_core::{NoteBody, Result, VaultBackend};

use crate::client::ApiClient;

pub struct RemoteStore {
    client: ApiClient,
}

impl RemoteStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VaultBackend for RemoteStore {
    async fn list_tree(&self) -> Result<Vec<Item>> {
        let nodes = self.client.fetch_tree().await?;
        Ok(nodes.into_iter().map(|n| n.into_item("")).collect())
    }

    async fn load_note_body(&self, path: &str) -> Result<NoteBody> {
        let raw = self.client.download_file(path).await?;
        let parsed = frontmatter::parse(&raw);
        Ok(NoteBody {
            content: parsed.body,
            tags: parsed.matter.tags,
        })
    }

    async fn create_note(&self, parent_path: &str, name: &str) -> Result<String> {
        let file_name = item::note_file_name(name);
        self.client.create_file(parent_path, &file_name, "").await?;
        Ok(item::join_path(parent_path, &file_name))
    }

    async fn create_folder(&self, parent_path: &str, name: &str) -> Result<String> {
        self.client.create_folder(parent_path, name).await?;
        Ok(item::join_path(parent_path, name))
    }

    async fn write_note_body(&self, path: &str, content: &str, tags: &[String]) -> Result<()> {
        let matter = FrontMatter::with_tags(tags.to_vec());
        let raw = frontmatter::serialize(&matter, content);
        self.client.update_file(path, &raw).await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.client.rename(old_path, new_path).await
    }

    async fn move_item(&self, source: &str, dest_parent: &str) -> Result<()> {
        self.client.move_item(source, dest_parent).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.client.delete(path).await
    }

    fn relist_after_move(&self) -> bool {
        true
    }

    async fn upload_archive(&self, target: &str, name: &str, bytes: Vec<u8>) -> Result<bool> {
        self.client.upload_archive(target, name, bytes).await?;
        Ok(true)
    }

    async fn export_archive(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(Some(self.client.export_archive(path).await?))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
