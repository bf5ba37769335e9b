//! Pure, backend-agnostic operations over the item tree.
//!
//! The engine owns the tree exclusively; these functions take `&mut Vec<Item>`
//! (or return removed items), so no other holder ever observes aliased
//! mutation. All operations recurse over folder children.

use std::cmp::Ordering;

use crate::item::{Folder, Item, folder_id, note_id};

/// Depth-first search for an item by id. Returns the item and its immediate
/// parent folder (`None` for root-level items).
pub fn find<'a>(items: &'a [Item], id: &str) -> Option<(&'a Item, Option<&'a Folder>)> {
    for item in items {
        if item.id() == id {
            return Some((item, None));
        }
        if let Item::Folder(folder) = item {
            if let Some(found) = find_under(folder, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_under<'a>(folder: &'a Folder, id: &str) -> Option<(&'a Item, Option<&'a Folder>)> {
    for child in &folder.children {
        if child.id() == id {
            return Some((child, Some(folder)));
        }
        if let Item::Folder(sub) = child {
            if let Some(found) = find_under(sub, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Whether an item with this id exists anywhere in the tree.
pub fn contains(items: &[Item], id: &str) -> bool {
    find(items, id).is_some()
}

/// Mutable depth-first lookup by id.
pub fn find_mut<'a>(items: &'a mut [Item], id: &str) -> Option<&'a mut Item> {
    for item in items.iter_mut() {
        if item.id() == id {
            return Some(item);
        }
        if let Item::Folder(folder) = item {
            if contains(&folder.children, id) {
                return find_mut(&mut folder.children, id);
            }
        }
    }
    None
}

/// Mutable lookup narrowed to folders.
pub fn find_folder_mut<'a>(items: &'a mut [Item], id: &str) -> Option<&'a mut Folder> {
    find_mut(items, id).and_then(Item::as_folder_mut)
}

/// Remove the first item matching `id` at any depth, short-circuiting at the
/// level where it is found.
pub fn remove_by_id(items: &mut Vec<Item>, id: &str) -> Option<Item> {
    if let Some(pos) = items.iter().position(|item| item.id() == id) {
        return Some(items.remove(pos));
    }
    for item in items.iter_mut() {
        if let Item::Folder(folder) = item {
            if let Some(removed) = remove_by_id(&mut folder.children, id) {
                return Some(removed);
            }
        }
    }
    None
}

/// Insert items into the folder matching `parent_id` (root when `None`),
/// re-sort that level, and flip the target folder open.
///
/// Returns false when the parent folder does not exist; the tree is left
/// unchanged in that case.
pub fn insert_into(items: &mut Vec<Item>, parent_id: Option<&str>, new_items: Vec<Item>) -> bool {
    match parent_id {
        None => {
            items.extend(new_items);
            sort_level(items);
            true
        }
        Some(id) => match find_folder_mut(items, id) {
            Some(folder) => {
                folder.children.extend(new_items);
                folder.open = true;
                sort_level(&mut folder.children);
                true
            }
            None => {
                tracing::debug!("insert target folder not found: {id}");
                false
            }
        },
    }
}

/// Replace the item matching `id` and re-sort its containing level, so a
/// renamed item takes its correct sorted position.
pub fn replace_and_resort(items: &mut Vec<Item>, id: &str, new_item: Item) -> bool {
    replace_at_level(items, id, new_item, true).is_none()
}

/// Replace the item matching `id` without re-sorting. For content/metadata
/// updates that do not change name or position.
pub fn update_in_place(items: &mut Vec<Item>, id: &str, new_item: Item) -> bool {
    replace_at_level(items, id, new_item, false).is_none()
}

/// Hands the replacement back out when no level contained `id`.
fn replace_at_level(
    items: &mut Vec<Item>,
    id: &str,
    mut new_item: Item,
    resort: bool,
) -> Option<Item> {
    if let Some(pos) = items.iter().position(|item| item.id() == id) {
        items[pos] = new_item;
        if resort {
            sort_level(items);
        }
        return None;
    }
    for item in items.iter_mut() {
        if let Item::Folder(folder) = item {
            match replace_at_level(&mut folder.children, id, new_item, resort) {
                None => return None,
                Some(back) => new_item = back,
            }
        }
    }
    Some(new_item)
}

/// Total order for one level: folders before notes, then case-insensitive
/// name order with a case-sensitive tiebreak so the order is deterministic.
pub fn sort_level(items: &mut [Item]) {
    items.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| compare_names(a.name(), b.name()))
    });
}

/// Re-establish the sort invariant at every level of the tree. Used after a
/// full backend re-list, which carries no ordering guarantee.
pub fn sort_deep(items: &mut [Item]) {
    sort_level(items);
    for item in items.iter_mut() {
        if let Item::Folder(folder) = item {
            sort_deep(&mut folder.children);
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Recursively rewrite path and id of a subtree after its ancestor's path
/// changed. Descendant paths are prefixed by the ancestor path, so a rename
/// or move is a whole-subtree transformation, never a single-node edit.
pub fn reprefix(item: &mut Item, old_prefix: &str, new_prefix: &str) {
    match item {
        Item::Note(note) => {
            note.path = swap_prefix(&note.path, old_prefix, new_prefix);
            note.id = note_id(&note.path);
        }
        Item::Folder(folder) => {
            folder.path = swap_prefix(&folder.path, old_prefix, new_prefix);
            folder.id = folder_id(&folder.path);
            for child in &mut folder.children {
                reprefix(child, old_prefix, new_prefix);
            }
        }
    }
}

fn swap_prefix(path: &str, old_prefix: &str, new_prefix: &str) -> String {
    if path == old_prefix {
        new_prefix.to_string()
    } else if let Some(rest) = path.strip_prefix(old_prefix).and_then(|r| r.strip_prefix('/')) {
        crate::item::join_path(new_prefix, rest)
    } else {
        path.to_string()
    }
}

/// Merge items into a level, folding folders with matching ids together
/// recursively instead of duplicating them. Used by archive import, which
/// synthesizes folders that may already exist in the tree.
pub fn merge_level(items: &mut Vec<Item>, incoming: Vec<Item>) {
    for item in incoming {
        match item {
            Item::Folder(folder) => {
                match find_local_folder(items, &folder.id) {
                    Some(existing) => merge_level(&mut existing.children, folder.children),
                    None => items.push(Item::Folder(folder)),
                }
            }
            note => items.push(note),
        }
    }
    sort_level(items);
}

fn find_local_folder<'a>(items: &'a mut [Item], id: &str) -> Option<&'a mut Folder> {
    items
        .iter_mut()
        .filter_map(Item::as_folder_mut)
        .find(|f| f.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Folder, Note};

    fn sample_tree() -> Vec<Item> {
        let todo = Item::Note(Note::new("Work", "Todo"));
        let notes = Item::Note(Note::new("Work", "Notes"));
        let work = Item::Folder(Folder {
            children: vec![todo, notes],
            ..Folder::new("", "Work")
        });
        let readme = Item::Note(Note::new("", "Readme"));
        let mut tree = vec![readme, work];
        sort_deep(&mut tree);
        tree
    }

    #[test]
    fn test_find_returns_item_and_parent() {
        let tree = sample_tree();
        let (item, parent) = find(&tree, "note:Work/Todo.md").unwrap();
        assert_eq!(item.name(), "Todo");
        assert_eq!(parent.unwrap().id, "folder:Work");

        let (_, parent) = find(&tree, "folder:Work").unwrap();
        assert!(parent.is_none());
    }

    #[test]
    fn test_find_after_insert() {
        let mut tree = sample_tree();
        let note = Item::Note(Note::new("Work", "Agenda"));
        let id = note.id().to_string();
        assert!(insert_into(&mut tree, Some("folder:Work"), vec![note.clone()]));
        let (found, _) = find(&tree, &id).unwrap();
        assert_eq!(found, &note);
    }

    #[test]
    fn test_insert_opens_target_folder_and_sorts() {
        let mut tree = sample_tree();
        assert!(!tree[0].as_folder().unwrap().open);
        insert_into(
            &mut tree,
            Some("folder:Work"),
            vec![Item::Note(Note::new("Work", "Agenda"))],
        );
        let work = tree[0].as_folder().unwrap();
        assert!(work.open);
        let names: Vec<_> = work.children.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Agenda", "Notes", "Todo"]);
    }

    #[test]
    fn test_insert_into_missing_parent_is_rejected() {
        let mut tree = sample_tree();
        let before = tree.clone();
        assert!(!insert_into(
            &mut tree,
            Some("folder:Nope"),
            vec![Item::Note(Note::new("Nope", "X"))],
        ));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_sort_folders_before_notes_case_insensitive() {
        let mut level = vec![
            Item::Note(Note::new("", "beta")),
            Item::Note(Note::new("", "Alpha")),
            Item::Folder(Folder::new("", "zoo")),
            Item::Folder(Folder::new("", "Attic")),
        ];
        sort_level(&mut level);
        let names: Vec<_> = level.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Attic", "zoo", "Alpha", "beta"]);
    }

    #[test]
    fn test_remove_by_id_at_depth() {
        let mut tree = sample_tree();
        let removed = remove_by_id(&mut tree, "note:Work/Todo.md").unwrap();
        assert_eq!(removed.name(), "Todo");
        assert!(find(&tree, "note:Work/Todo.md").is_none());
        // Siblings untouched.
        assert!(find(&tree, "note:Work/Notes.md").is_some());
    }

    #[test]
    fn test_replace_and_resort_moves_renamed_item() {
        let mut tree = sample_tree();
        let mut renamed = Note::new("Work", "Zzz");
        renamed.id = note_id("Work/Zzz.md");
        assert!(replace_and_resort(
            &mut tree,
            "note:Work/Notes.md",
            Item::Note(renamed),
        ));
        let work = tree.iter().find(|i| i.is_folder()).unwrap().as_folder().unwrap();
        let names: Vec<_> = work.children.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["Todo", "Zzz"]);
    }

    #[test]
    fn test_update_in_place_keeps_position() {
        let mut tree = sample_tree();
        let mut updated = Note::new("Work", "Notes");
        updated.content = "body".into();
        assert!(update_in_place(&mut tree, "note:Work/Notes.md", Item::Note(updated)));
        let work = tree.iter().find(|i| i.is_folder()).unwrap().as_folder().unwrap();
        assert_eq!(work.children[0].name(), "Notes");
        assert_eq!(work.children[0].as_note().unwrap().content, "body");
    }

    #[test]
    fn test_reprefix_rewrites_exactly_the_subtree() {
        let mut tree = sample_tree();
        let mut work = remove_by_id(&mut tree, "folder:Work").unwrap();
        work.set_name("Projects");
        reprefix(&mut work, "Work", "Projects");

        let folder = work.as_folder().unwrap();
        assert_eq!(folder.path, "Projects");
        assert_eq!(folder.id, "folder:Projects");
        let ids: Vec<_> = folder.children.iter().map(|c| c.id().to_string()).collect();
        assert_eq!(ids, vec!["note:Projects/Notes.md", "note:Projects/Todo.md"]);
        // Everything else about the descendants is untouched.
        for child in &folder.children {
            let note = child.as_note().unwrap();
            assert!(note.content.is_empty());
            assert!(note.content_loaded);
        }
    }

    #[test]
    fn test_reprefix_does_not_touch_lookalike_prefixes() {
        let mut note = Item::Note(Note::at_path("Workshop/a.md", true));
        reprefix(&mut note, "Work", "Projects");
        assert_eq!(note.path(), "Workshop/a.md");
    }

    #[test]
    fn test_merge_level_folds_existing_folders() {
        let mut tree = sample_tree();
        let incoming = vec![Item::Folder(Folder {
            children: vec![Item::Note(Note::new("Work", "Imported"))],
            ..Folder::new("", "Work")
        })];
        merge_level(&mut tree, incoming);

        let folders: Vec<_> = tree.iter().filter(|i| i.is_folder()).collect();
        assert_eq!(folders.len(), 1);
        assert!(find(&tree, "note:Work/Imported.md").is_some());
        assert!(find(&tree, "note:Work/Todo.md").is_some());
    }
}
