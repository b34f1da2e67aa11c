//! # unfold
//!
//! Rebuild a project tree on disk from a single text document.
//!
//! Transcripts and markdown reports often carry a project layout drawn as
//! an ASCII tree, followed by fenced code blocks each introduced by a
//! heading naming the file. This library finds the diagram, recreates its
//! directories and files, and fills the files with the matching code.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> unfold::Result<()> {
//!     // Rebuild every .md document in ./transcripts under ./code (or code_1, ...)
//!     let report = unfold::reconstruct("transcripts", "code")?;
//!     println!("{}", report.stats.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Input shape
//!
//! ````text
//! project/
//! ├── a.py
//! ├── b/
//! └── c.py
//!
//! ## project/a.py
//! ```python
//! print("a")
//! ```
//! ````
//!
//! ## Features
//!
//! - **Structure detection**: tree diagrams with `│ ├ └` glyphs, validated before use
//! - **Path correlation**: fences matched to the nearest `## dir/file.ext` heading
//! - **Step-driven parsing**: run to completion or one line at a time
//! - **Safe output**: fresh output directories, no path escapes, no overwrites of existing trees
//! - **Injected logging**: every component reports through a [`LogSink`](sink::LogSink)

pub mod detect;
pub mod error;
pub mod materialize;
pub mod model;
pub mod parser;
pub mod reconstruct;
pub mod sink;

// Re-export commonly used types
pub use detect::{decode_bytes, read_document, TextEncoding};
pub use error::{Error, Result};
pub use materialize::{OutputDirectoryAllocator, PlaceholderStyle, TreeMaterializer};
pub use model::{
    CodeBlock, DiscardReason, DiscardedBlock, LineBuffer, MaterializedTree, StructureBlock,
    StructureEntry,
};
pub use parser::{
    CodeBlockParser, ErrorMode, FenceMatch, ParseOptions, ScanOutcome, StepResult,
    StructureScanner,
};
pub use reconstruct::{
    discover_documents, CancelToken, ReconstructOptions, ReconstructReport, ReconstructStats,
    Reconstructor, UnlistedPolicy,
};
pub use sink::{LogCrateSink, LogSink, MemorySink, NullSink, Severity};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Find the first structure diagram in a text.
///
/// # Example
///
/// ```
/// let text = "project/\n├── a.py\n├── b/\n└── c.py";
/// let block = unfold::scan_structure(text).into_result()?;
/// assert_eq!(block.root(), "project");
/// assert_eq!(block.entries.len(), 4);
/// # Ok::<(), unfold::Error>(())
/// ```
pub fn scan_structure(text: &str) -> ScanOutcome {
    let options = ParseOptions::default();
    StructureScanner::new(&options, &LogCrateSink).scan(&LineBuffer::new(text))
}

/// Extract all correlated code blocks from a text.
///
/// # Example
///
/// ```
/// let text = "## src/app.py\n```python\nprint(1)\n```";
/// let blocks = unfold::extract_code_blocks(text)?;
/// assert_eq!(blocks[0].path, "src/app.py");
/// assert_eq!(blocks[0].content, "print(1)");
/// # Ok::<(), unfold::Error>(())
/// ```
pub fn extract_code_blocks(text: &str) -> Result<Vec<CodeBlock>> {
    extract_code_blocks_with_options(text, &ParseOptions::default())
}

/// Extract correlated code blocks with custom options.
pub fn extract_code_blocks_with_options(text: &str, options: &ParseOptions) -> Result<Vec<CodeBlock>> {
    let parser = CodeBlockParser::new(text, options, &LogCrateSink)?;
    Ok(parser.collect())
}

/// Read a document and scan it for a structure diagram.
pub fn scan_file<P: AsRef<Path>>(path: P) -> Result<ScanOutcome> {
    let (text, _) = read_document(path, &TextEncoding::DEFAULT_ORDER)?;
    Ok(scan_structure(&text))
}

/// Rebuild every `.md` document in `input` (a directory or a file) under `output`.
///
/// Each document with something to write gets its own fresh directory:
/// `output`, then `output_1`, `output_2`, ...
///
/// # Example
///
/// ```no_run
/// let report = unfold::reconstruct("chat.md", "rebuilt").unwrap();
/// for doc in &report.documents {
///     println!("{} -> {:?}", doc.path.display(), doc.output);
/// }
/// ```
pub fn reconstruct<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<ReconstructReport> {
    Unfold::new().with_output(output.as_ref()).run(input)
}

/// Builder for reconstruction runs.
///
/// # Example
///
/// ```no_run
/// use unfold::{PlaceholderStyle, Unfold};
///
/// let report = Unfold::new()
///     .with_file_types(["md", "txt"])
///     .with_output("rebuilt")
///     .with_placeholder(PlaceholderStyle::Marker)
///     .recursive()
///     .lenient()
///     .run("transcripts")?;
/// # Ok::<(), unfold::Error>(())
/// ```
pub struct Unfold {
    options: ReconstructOptions,
    sink: Option<Arc<dyn LogSink>>,
}

impl Unfold {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            options: ReconstructOptions::default(),
            sink: None,
        }
    }

    /// Start from existing options.
    pub fn with_options(mut self, options: ReconstructOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable lenient name heuristics.
    pub fn lenient(mut self) -> Self {
        self.options.parse = self.options.parse.lenient();
        self
    }

    /// Search input directories recursively.
    pub fn recursive(mut self) -> Self {
        self.options.recursive = true;
        self
    }

    /// Set the document extensions to process.
    pub fn with_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.with_file_types(types);
        self
    }

    /// Set the output base path.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.options.output_root = output.into();
        self
    }

    /// Set the heading lookback window.
    pub fn with_lookback(mut self, lines: usize) -> Self {
        self.options.parse = self.options.parse.with_lookback(lines);
        self
    }

    /// Set placeholder style.
    pub fn with_placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.options.placeholder = style;
        self
    }

    /// Drop blocks whose path is not in the diagram.
    pub fn reject_unlisted(mut self) -> Self {
        self.options.unlisted = UnlistedPolicy::Reject;
        self
    }

    /// Set the log sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Current options.
    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// Build the reconstructor.
    pub fn build(self) -> Result<Reconstructor> {
        let reconstructor = Reconstructor::new(self.options)?;
        Ok(match self.sink {
            Some(sink) => reconstructor.with_sink(sink),
            None => reconstructor,
        })
    }

    /// Process a directory or a single document.
    pub fn run<P: AsRef<Path>>(self, input: P) -> Result<ReconstructReport> {
        self.build()?.run_dir(input)
    }
}

impl Default for Unfold {
    fn default() -> Self {
        Self::new()
    }
}
