//! Error types for unfold library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for unfold operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while rebuilding a project from a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input directory or document does not exist.
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The document could not be decoded with any configured encoding.
    #[error("Cannot decode {} (tried {tried})", path.display())]
    DecodeFailure {
        /// Document path
        path: PathBuf,
        /// Comma-separated list of attempted encodings
        tried: String,
    },

    /// No tree diagram was found in the document.
    #[error("No structure diagram found")]
    StructureNotFound,

    /// Tree-like lines were found but failed validation.
    #[error("Invalid structure diagram at line {line}: {reason}")]
    StructureInvalid {
        /// 1-indexed line of the offending entry
        line: usize,
        /// Why the block was rejected
        reason: String,
    },

    /// A fence was opened but never closed.
    #[error("Unterminated code block for {path} starting at line {line}")]
    UnterminatedBlock {
        /// Path the block was correlated with
        path: String,
        /// 1-indexed line of the opening fence
        line: usize,
    },

    /// A fence had no path-bearing heading within the lookback window.
    #[error("No path heading for code block at line {line}")]
    UnresolvedPath {
        /// 1-indexed line of the opening fence
        line: usize,
    },

    /// A path escapes the output directory or is otherwise unusable.
    #[error("Unsafe path: {0}")]
    UnsafePath(String),

    /// Writing an extracted file failed.
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailure {
        /// Target path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A fresh output directory could not be created.
    #[error("Cannot allocate output directory {}: {source}", path.display())]
    OutputAllocation {
        /// Requested or probed directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration is malformed or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error aborts a whole batch run rather than a single document or block.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InputNotFound(_) | Error::OutputAllocation { .. } | Error::Config(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
