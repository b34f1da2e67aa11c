//! Nested directory/file map built from a structure block.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Children of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirListing {
    /// Names of child directories
    pub subdirectories: BTreeSet<String>,

    /// Names of child files
    pub files: BTreeSet<String>,
}

impl DirListing {
    /// Check if the directory has no children.
    pub fn is_empty(&self) -> bool {
        self.subdirectories.is_empty() && self.files.is_empty()
    }
}

/// Mapping from slash-separated directory path to its children.
///
/// Keys start with the root folder name (`project`, `project/b`, ...).
/// Every key other than the root is listed in its parent's
/// `subdirectories`, and inserting an existing path is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedTree {
    root: String,
    directories: BTreeMap<String, DirListing>,
}

impl MaterializedTree {
    /// Create a tree containing only the root directory.
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut directories = BTreeMap::new();
        directories.insert(root.clone(), DirListing::default());
        Self { root, directories }
    }

    /// Root folder name.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Register `name` as a child directory of `parent`, returning the new key.
    ///
    /// The parent is created first if it is missing, so the reachability
    /// invariant holds even for out-of-order inserts.
    pub fn add_directory(&mut self, parent: &str, name: &str) -> String {
        self.ensure_directory(parent);
        let key = join_key(parent, name);
        if let Some(listing) = self.directories.get_mut(parent) {
            listing.subdirectories.insert(name.to_string());
        }
        self.directories.entry(key.clone()).or_default();
        key
    }

    /// Register `name` as a file inside `parent`.
    pub fn add_file(&mut self, parent: &str, name: &str) {
        self.ensure_directory(parent);
        if let Some(listing) = self.directories.get_mut(parent) {
            listing.files.insert(name.to_string());
        }
    }

    fn ensure_directory(&mut self, key: &str) {
        if self.directories.contains_key(key) {
            return;
        }
        match key.rsplit_once('/') {
            Some((parent, name)) => {
                self.add_directory(parent, name);
            }
            None => {
                self.directories.entry(key.to_string()).or_default();
            }
        }
    }

    /// Listing for a directory key.
    pub fn get(&self, key: &str) -> Option<&DirListing> {
        self.directories.get(key)
    }

    /// All directory keys in sorted order.
    pub fn directory_keys(&self) -> impl Iterator<Item = &str> {
        self.directories.keys().map(String::as_str)
    }

    /// All directories with their listings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirListing)> {
        self.directories.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Full slash paths (root included) of every listed file.
    pub fn file_paths(&self) -> Vec<String> {
        self.directories
            .iter()
            .flat_map(|(dir, listing)| listing.files.iter().map(move |f| join_key(dir, f)))
            .collect()
    }

    /// Check whether a root-relative path (e.g. `b/d.py`) is a listed file.
    pub fn contains_file(&self, relative: &str) -> bool {
        let full = join_key(&self.root, relative);
        match full.rsplit_once('/') {
            Some((dir, name)) => self
                .directories
                .get(dir)
                .is_some_and(|listing| listing.files.contains(name)),
            None => false,
        }
    }

    /// Number of directories, root included.
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    /// Number of listed files.
    pub fn file_count(&self) -> usize {
        self.directories.values().map(|l| l.files.len()).sum()
    }
}

fn join_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
