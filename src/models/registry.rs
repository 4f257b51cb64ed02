//! In-memory registry of laid-out items and the files behind them.
//!
//! Keeps three things in step:
//! - the items currently on the wall (`MediaItem`)
//! - the retained file list every layout rebuild recreates items from
//! - folder bookkeeping (folder name -> files it contributed)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::models::{FileKey, IngestFile, ItemId, MediaItem};

#[derive(Debug, Default)]
pub struct MediaRegistry {
    items: Vec<MediaItem>,
    files: Vec<Arc<IngestFile>>,
    known: HashSet<FileKey>,
    folder_order: Vec<String>,
    folders: HashMap<String, Vec<FileKey>>,
    next_id: u64,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next item id. Ids are never reused.
    pub fn allocate_id(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(self.next_id)
    }

    /// Records `files` under `folder`, dropping any whose `(name, size)` is
    /// already known. Returns the files that were actually new, in order.
    pub fn retain_new(&mut self, folder: &str, files: Vec<IngestFile>) -> Vec<Arc<IngestFile>> {
        if !self.folders.contains_key(folder) {
            self.folder_order.push(folder.to_string());
            self.folders.insert(folder.to_string(), Vec::new());
        }

        let mut fresh = Vec::new();
        for file in files {
            let key = file.key();
            if !self.known.insert(key.clone()) {
                debug!(name = %file.name, size = file.size, "Skipping duplicate file");
                continue;
            }
            if let Some(keys) = self.folders.get_mut(folder) {
                keys.push(key);
            }
            let file = Arc::new(file);
            self.files.push(Arc::clone(&file));
            fresh.push(file);
        }
        fresh
    }

    /// Forgets a folder and its files. Returns the removed keys, or `None`
    /// when the folder is unknown or contributed nothing.
    pub fn remove_folder(&mut self, folder: &str) -> Option<HashSet<FileKey>> {
        let keys = self.folders.get(folder)?;
        if keys.is_empty() {
            return None;
        }
        let keys: HashSet<FileKey> = self.folders.remove(folder)?.into_iter().collect();
        self.folder_order.retain(|f| f != folder);
        self.files.retain(|f| !keys.contains(&f.key()));
        for key in &keys {
            self.known.remove(key);
        }
        Some(keys)
    }

    pub fn push(&mut self, item: MediaItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [MediaItem] {
        &mut self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&MediaItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut MediaItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Removes and returns items whose file is in `keys`.
    pub fn take_items_for(&mut self, keys: &HashSet<FileKey>) -> Vec<MediaItem> {
        let (taken, kept) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| keys.contains(&item.file.key()));
        self.items = kept;
        taken
    }

    /// Removes and returns every item; files and folders stay.
    pub fn take_all_items(&mut self) -> Vec<MediaItem> {
        std::mem::take(&mut self.items)
    }

    pub fn files(&self) -> &[Arc<IngestFile>] {
        &self.files
    }

    pub fn folders(&self) -> impl Iterator<Item = (&str, usize)> {
        self.folder_order.iter().map(|name| {
            let count = self.folders.get(name).map_or(0, Vec::len);
            (name.as_str(), count)
        })
    }

    /// Forgets items, files and folders. The id counter keeps running.
    pub fn clear(&mut self) {
        self.items.clear();
        self.files.clear();
        self.known.clear();
        self.folder_order.clear();
        self.folders.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(name: &str, size: u64, folder: &str) -> IngestFile {
        IngestFile::new(name, size, Some("image/png"))
            .with_relative_path(format!("{folder}/{name}"))
    }

    #[test]
    fn test_dedup_by_name_and_size() {
        let mut registry = MediaRegistry::new();
        let fresh = registry.retain_new(
            "a",
            vec![make_file("x.png", 1, "a"), make_file("x.png", 1, "a"), make_file("x.png", 2, "a")],
        );
        assert_eq!(fresh.len(), 2);

        let again = registry.retain_new("b", vec![make_file("x.png", 2, "b")]);
        assert!(again.is_empty());
        assert_eq!(registry.files().len(), 2);
    }

    #[test]
    fn test_folder_bookkeeping() {
        let mut registry = MediaRegistry::new();
        registry.retain_new("a", vec![make_file("1.png", 1, "a"), make_file("2.png", 2, "a")]);
        registry.retain_new("b", vec![make_file("3.png", 3, "b")]);

        let folders: Vec<(&str, usize)> = registry.folders().collect();
        assert_eq!(folders, vec![("a", 2), ("b", 1)]);

        let removed = registry.remove_folder("a").unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(registry.files().len(), 1);
        assert!(registry.remove_folder("a").is_none());

        // Removed files can be ingested again.
        let fresh = registry.retain_new("c", vec![make_file("1.png", 1, "c")]);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn test_ids_survive_clear() {
        let mut registry = MediaRegistry::new();
        let first = registry.allocate_id();
        registry.clear();
        let second = registry.allocate_id();
        assert!(second > first);
    }
}
