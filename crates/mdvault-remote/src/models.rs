//! Wire types for the remote tree service.

use serde::{Deserialize, Serialize};

use mdvault_core::item::{Folder, Item, Note};

/// One node of the server-side tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub children: Option<Vec<RemoteNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

impl RemoteNode {
    /// Convert a server node into a vault item under `parent_path`. The
    /// listing never carries bodies, so notes come back unloaded.
    pub fn into_item(self, parent_path: &str) -> Item {
        let path = mdvault_core::item::join_path(parent_path, &self.name);
        match self.kind {
            NodeKind::Folder => {
                let children = self
                    .children
                    .unwrap_or_default()
                    .into_iter()
                    .map(|child| child.into_item(&path))
                    .collect();
                Item::Folder(Folder::at_path(&path, children))
            }
            NodeKind::File => Item::Note(Note::at_path(&path, false)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest<'a> {
    /// Parent directory of the new file.
    pub file_path: &'a str,
    pub file_name: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest<'a> {
    /// Full path of the file being replaced.
    pub file_name: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest<'a> {
    pub folder_path: &'a str,
    pub folder_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest<'a> {
    pub old_path: &'a str,
    pub new_path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest<'a> {
    pub source: &'a str,
    pub destination: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest<'a> {
    pub target: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_listing_deserializes() {
        let json = r#"{
            "type": "folder",
            "name": "Work",
            "children": [
                { "type": "file", "name": "todo.md" }
            ]
        }"#;
        let node: RemoteNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind, NodeKind::Folder);

        let item = node.into_item("");
        let folder = item.as_folder().unwrap();
        assert_eq!(folder.id, "folder:Work");
        let note = folder.children[0].as_note().unwrap();
        assert_eq!(note.id, "note:Work/todo.md");
        assert!(!note.content_loaded);
    }

    #[test]
    fn test_request_field_casing() {
        let body = serde_json::to_string(&CreateFileRequest {
            file_path: "Work",
            file_name: "todo.md",
            content: "",
        })
        .unwrap();
        assert!(body.contains("\"filePath\":\"Work\""));
        assert!(body.contains("\"fileName\":\"todo.md\""));

        let body = serde_json::to_string(&CreateFolderRequest {
            folder_path: "",
            folder_name: "Work",
        })
        .unwrap();
        assert!(body.contains("\"folderPath\":\"\""));
        assert!(body.contains("\"folderName\":\"Work\""));

        let body = serde_json::to_string(&RenameRequest {
            old_path: "a.md",
            new_path: "b.md",
        })
        .unwrap();
        assert!(body.contains("\"oldPath\""));
        assert!(body.contains("\"newPath\""));
    }
}
