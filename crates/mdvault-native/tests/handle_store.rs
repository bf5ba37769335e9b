//! HandleStore behavior over a real (temporary) directory tree.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mdvault_core::{VaultBackend, VaultError};
use mdvault_native::{Access, FsDirHandle, HandleStore, PermissionGate};
use tempfile::TempDir;

fn store(dir: &TempDir) -> HandleStore {
    HandleStore::at_path(dir.path().to_path_buf())
}

fn write(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn exists(dir: &TempDir, rel: &str) -> bool {
    dir.path().join(rel).exists()
}

#[tokio::test]
async fn test_list_tree_skips_hidden_and_foreign_entries() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "Work/todo.md", "x");
    write(&tmp, "Work/photo.png", "x");
    write(&tmp, ".git/config", "x");
    write(&tmp, "top.md", "x");

    let items = store(&tmp).list_tree().await.unwrap();

    let mut ids: Vec<_> = items.iter().map(|i| i.id().to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["folder:Work", "note:top.md"]);

    let work = items
        .iter()
        .find_map(|i| i.as_folder())
        .expect("Work folder listed");
    assert_eq!(work.children.len(), 1);
    assert_eq!(work.children[0].id(), "note:Work/todo.md");
    // Bodies come from a later fetch.
    assert!(!work.children[0].as_note().unwrap().content_loaded);
}

#[tokio::test]
async fn test_create_write_load_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let store = store(&tmp);
    store.create_folder("", "Notes").await.unwrap();

    let path = store.create_note("Notes", "Daily").await.unwrap();
    assert_eq!(path, "Notes/Daily.md");
    store
        .write_note_body(&path, "# Today", &["log".to_string()])
        .await
        .unwrap();

    let body = store.load_note_body(&path).await.unwrap();
    assert_eq!(body.content, "# Today");
    assert_eq!(body.tags, vec!["log"]);

    let raw = std::fs::read_to_string(tmp.path().join("Notes/Daily.md")).unwrap();
    assert!(raw.starts_with("---\ntags: [\"log\"]\n---\n"));
}

#[tokio::test]
async fn test_create_note_conflict_on_taken_name() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a.md", "x");

    let err = store(&tmp).create_note("", "a").await.unwrap_err();
    assert!(matches!(err, VaultError::Conflict(_)));
}

#[tokio::test]
async fn test_rename_folder_relocates_subtree() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "Work/deep/todo.md", "body");

    store(&tmp).rename("Work", "Projects").await.unwrap();

    assert!(!exists(&tmp, "Work"));
    assert!(exists(&tmp, "Projects/deep/todo.md"));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("Projects/deep/todo.md")).unwrap(),
        "body"
    );
}

#[tokio::test]
async fn test_move_keeps_base_name() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a.md", "body");
    std::fs::create_dir(tmp.path().join("Dest")).unwrap();

    store(&tmp).move_item("a.md", "Dest").await.unwrap();

    assert!(!exists(&tmp, "a.md"));
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("Dest/a.md")).unwrap(),
        "body"
    );
}

#[tokio::test]
async fn test_delete_rejects_foreign_files() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "photo.png", "x");
    write(&tmp, "Work/todo.md", "x");
    let store = store(&tmp);

    let err = store.delete("photo.png").await.unwrap_err();
    assert!(matches!(err, VaultError::InvalidOperation(_)));
    assert!(exists(&tmp, "photo.png"));

    store.delete("Work").await.unwrap();
    assert!(!exists(&tmp, "Work"));
}

/// Gate that denies the first `denials` requests, then grants.
struct FlakyGate {
    denials: usize,
    seen: AtomicUsize,
}

impl FlakyGate {
    fn new(denials: usize) -> Self {
        Self {
            denials,
            seen: AtomicUsize::new(0),
        }
    }
}

impl PermissionGate for FlakyGate {
    fn request(&self, _access: Access) -> bool {
        self.seen.fetch_add(1, Ordering::SeqCst) >= self.denials
    }
}

fn gated_store(root: PathBuf, gate: Arc<FlakyGate>) -> HandleStore {
    HandleStore::new(Box::new(FsDirHandle::new(root)), gate)
}

#[tokio::test]
async fn test_denied_grant_is_retried_once() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "a.md", "x");

    let gate = Arc::new(FlakyGate::new(1));
    let store = gated_store(tmp.path().to_path_buf(), Arc::clone(&gate));
    assert!(store.list_tree().await.is_ok());
    assert_eq!(gate.seen.load(Ordering::SeqCst), 2);

    let gate = Arc::new(FlakyGate::new(2));
    let store = gated_store(tmp.path().to_path_buf(), Arc::clone(&gate));
    let err = store.list_tree().await.unwrap_err();
    assert!(matches!(err, VaultError::PermissionDenied(_)));
    assert_eq!(gate.seen.load(Ordering::SeqCst), 2);
}
