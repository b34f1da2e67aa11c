//! Filesystem synthesis.

mod allocator;
mod tree;

pub use allocator::{OutputDirectoryAllocator, DEFAULT_MAX_ATTEMPTS};
pub use tree::{PlaceholderStyle, RealizeStats, TreeMaterializer};
