//! Code blocks correlated with a path heading.

use serde::{Deserialize, Serialize};

/// A fenced code region together with the relative path it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Relative, slash-separated target path (never empty)
    pub path: String,

    /// Language tag from the opening fence (may be empty)
    pub language: String,

    /// Lines between the fences, joined with `\n`
    pub content: String,

    /// 0-indexed line of the opening fence
    pub start_line: usize,
}

impl CodeBlock {
    /// Create a new code block.
    pub fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            content: content.into(),
            start_line: 0,
        }
    }

    /// Set the opening fence line.
    pub fn at_line(mut self, line: usize) -> Self {
        self.start_line = line;
        self
    }

    /// Number of content lines.
    pub fn line_count(&self) -> usize {
        if self.content.is_empty() {
            0
        } else {
            self.content.lines().count()
        }
    }
}

/// Why a fence occurrence produced no code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DiscardReason {
    /// No path-bearing heading within the lookback window
    UnresolvedPath,
    /// End of input reached before the closing fence
    Unterminated {
        /// Path the block was correlated with
        path: String,
    },
    /// The correlated path escapes the output root
    UnsafePath {
        /// The offending path text
        path: String,
    },
    /// The path is not part of the detected structure and unlisted paths are rejected
    Unlisted {
        /// The rejected path
        path: String,
    },
}

impl DiscardReason {
    /// Short machine-friendly label.
    pub fn label(&self) -> &'static str {
        match self {
            DiscardReason::UnresolvedPath => "unresolved_path",
            DiscardReason::Unterminated { .. } => "unterminated",
            DiscardReason::UnsafePath { .. } => "unsafe_path",
            DiscardReason::Unlisted { .. } => "unlisted",
        }
    }
}

impl std::fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscardReason::UnresolvedPath => write!(f, "no path heading within lookback window"),
            DiscardReason::Unterminated { path } => write!(f, "unterminated block for {}", path),
            DiscardReason::UnsafePath { path } => write!(f, "unsafe path {}", path),
            DiscardReason::Unlisted { path } => write!(f, "{} is not in the structure", path),
        }
    }
}

/// A fence occurrence dropped from the result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardedBlock {
    /// 0-indexed line of the opening fence
    pub line: usize,

    /// Why it was dropped
    #[serde(flatten)]
    pub reason: DiscardReason,
}
