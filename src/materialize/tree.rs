//! Structure entries to directories and placeholder files.

use crate::error::{Error, Result};
use crate::model::{comment_line, MaterializedTree, StructureBlock, StructureEntry};
use crate::sink::LogSink;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// What to write into listed files that receive no extracted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// Zero-length file
    #[default]
    Empty,
    /// One comment line naming the file, in the file's comment syntax
    Marker,
}

impl PlaceholderStyle {
    /// Placeholder content for a file at `path` (slash-separated, root included).
    pub fn content(&self, path: &str) -> String {
        match self {
            PlaceholderStyle::Empty => String::new(),
            PlaceholderStyle::Marker => {
                let name = path.rsplit('/').next().unwrap_or(path);
                let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
                format!("{}\n", comment_line(ext, &format!("This file represents: {}", path)))
            }
        }
    }
}

/// Filesystem effects of one realize call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizeStats {
    /// Directories that did not exist before
    pub directories_created: usize,
    /// Placeholder files written
    pub placeholders_written: usize,
    /// Listed files left alone because they already existed
    pub existing_files: usize,
}

/// Builds a [`MaterializedTree`] and realizes it on disk.
pub struct TreeMaterializer<'a> {
    placeholder: PlaceholderStyle,
    sink: &'a dyn LogSink,
}

impl<'a> TreeMaterializer<'a> {
    /// Create a materializer.
    pub fn new(placeholder: PlaceholderStyle, sink: &'a dyn LogSink) -> Self {
        Self { placeholder, sink }
    }

    /// Build the nested map for a scanned block.
    pub fn materialize_block(&self, block: &StructureBlock) -> Result<MaterializedTree> {
        self.materialize(&block.entries)
    }

    /// Build the nested map from a pre-order entry list.
    ///
    /// The first entry must be the level-0 root directory and no entry may
    /// sit more than one level below its predecessor's directory.
    pub fn materialize(&self, entries: &[StructureEntry]) -> Result<MaterializedTree> {
        let root = match entries.first() {
            Some(e) if e.level == 0 && e.is_directory => e,
            _ => {
                return Err(Error::StructureInvalid {
                    line: 1,
                    reason: "first entry must be the root directory".into(),
                })
            }
        };

        let mut tree = MaterializedTree::new(root.name.clone());
        let mut stack = vec![root.name.clone()];

        for (index, entry) in entries.iter().enumerate().skip(1) {
            if entry.level == 0 || entry.level > stack.len() {
                return Err(Error::StructureInvalid {
                    line: index + 1,
                    reason: format!("'{}' has no parent directory at level {}", entry.name, entry.level),
                });
            }
            stack.truncate(entry.level);
            let parent = stack[entry.level - 1].clone();

            if entry.is_directory {
                let key = tree.add_directory(&parent, &entry.name);
                stack.push(key);
            } else {
                tree.add_file(&parent, &entry.name);
            }
        }

        self.sink.debug(&format!(
            "Materialized '{}': {} directories, {} files",
            tree.root(),
            tree.directory_count(),
            tree.file_count()
        ));
        Ok(tree)
    }

    /// Create every directory and a placeholder for every listed file.
    pub fn realize(&self, tree: &MaterializedTree, target: &Path) -> Result<RealizeStats> {
        self.realize_except(tree, target, &HashSet::new())
    }

    /// Like [`realize`](Self::realize), skipping placeholders for `supplied`
    /// file paths (slash-separated, root included).
    ///
    /// Existing directories and files are never modified, so calling this
    /// repeatedly is a no-op after the first call.
    pub fn realize_except(
        &self,
        tree: &MaterializedTree,
        target: &Path,
        supplied: &HashSet<String>,
    ) -> Result<RealizeStats> {
        let mut stats = RealizeStats::default();

        for key in tree.directory_keys() {
            let dir = target.join(key);
            if dir.is_dir() {
                continue;
            }
            std::fs::create_dir_all(&dir).map_err(|source| Error::WriteFailure {
                path: dir.clone(),
                source,
            })?;
            stats.directories_created += 1;
        }

        for file in tree.file_paths() {
            if supplied.contains(&file) {
                continue;
            }
            let path = target.join(&file);
            if path.exists() {
                stats.existing_files += 1;
                continue;
            }
            std::fs::write(&path, self.placeholder.content(&file))
                .map_err(|source| Error::WriteFailure {
                    path: path.clone(),
                    source,
                })?;
            stats.placeholders_written += 1;
        }

        self.sink.debug(&format!(
            "Realized '{}' under {}: {} directories created, {} placeholders",
            tree.root(),
            target.display(),
            stats.directories_created,
            stats.placeholders_written
        ));
        Ok(stats)
    }
}
