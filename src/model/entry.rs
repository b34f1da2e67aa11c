//! Structure entries read from a tree diagram.

use serde::{Deserialize, Serialize};

use crate::parser::ErrorMode;

/// One line of a tree diagram after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEntry {
    /// Nesting depth (the root is level 0)
    pub level: usize,

    /// Entry name without the trailing slash
    pub name: String,

    /// Whether the entry is a directory
    pub is_directory: bool,
}

impl StructureEntry {
    /// Create a directory entry.
    pub fn directory(level: usize, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
            is_directory: true,
        }
    }

    /// Create a file entry.
    pub fn file(level: usize, name: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
            is_directory: false,
        }
    }
}

/// Kind of a tree diagram entry, inferred from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// A file leaf
    File,
    /// A directory
    Directory,
}

/// Classify a tree diagram name as a file or a directory.
///
/// In [`ErrorMode::Strict`] a name containing a `.` must not end with
/// `/` (file) and a name without a `.` must end with `/` (directory);
/// anything else is rejected with `None`. [`ErrorMode::Lenient`] trusts
/// the trailing slash alone, which admits dotted directory names such
/// as `.github/` and extension-less files such as `Makefile`.
///
/// An empty name, a bare `/`, or a name carrying `..` is always rejected.
pub fn classify_name(segment: &str, mode: ErrorMode) -> Option<EntryKind> {
    let segment = segment.trim();
    let bare = segment.trim_end_matches('/');
    if bare.is_empty() || bare.split('/').any(|part| part == ".." || part.is_empty()) {
        return None;
    }

    let has_slash = segment.ends_with('/');
    let has_dot = bare.contains('.');

    match mode {
        ErrorMode::Strict => match (has_dot, has_slash) {
            (true, false) => Some(EntryKind::File),
            (false, true) => Some(EntryKind::Directory),
            _ => None,
        },
        ErrorMode::Lenient => Some(if has_slash {
            EntryKind::Directory
        } else {
            EntryKind::File
        }),
    }
}

/// A validated tree diagram found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureBlock {
    /// Entries in pre-order; the first is the level-0 root directory
    pub entries: Vec<StructureEntry>,

    /// The raw diagram lines, root declaration first
    pub lines: Vec<String>,

    /// 0-indexed line of the root declaration in the document
    pub start_line: usize,

    /// 0-indexed line of the closing `└` entry in the document
    pub end_line: usize,
}

impl StructureBlock {
    /// Root directory name.
    pub fn root(&self) -> &str {
        self.entries.first().map(|e| e.name.as_str()).unwrap_or("")
    }

    /// The diagram as plain text.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of directory entries, root included.
    pub fn directory_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_directory).count()
    }

    /// Number of file entries.
    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_directory).count()
    }
}
