//! Document model types for project reconstruction.
//!
//! This module defines the intermediate representation that bridges
//! document scanning and filesystem synthesis: the line buffer every
//! parser walks, the flat structure entries read from a tree diagram,
//! the correlated code blocks, and the nested tree they materialize into.

mod block;
mod buffer;
mod entry;
mod path;
mod tree;

pub use block::{CodeBlock, DiscardReason, DiscardedBlock};
pub use buffer::LineBuffer;
pub use entry::{classify_name, EntryKind, StructureBlock, StructureEntry};
pub use path::{comment_line, comment_prefix, normalize_relative_path};
pub use tree::{DirListing, MaterializedTree};
