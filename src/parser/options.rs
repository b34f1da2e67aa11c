//! Parsing options and configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options for scanning structure diagrams and extracting code blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Error handling mode for file/directory name heuristics
    pub error_mode: ErrorMode,

    /// Line prefix that opens a code fence
    pub start_marker: String,

    /// Line that closes a code fence
    pub end_marker: String,

    /// How closing fences are recognized
    pub fence_match: FenceMatch,

    /// Lines above a fence searched for a path heading
    pub lookback_lines: usize,

    /// One nesting level in a tree diagram
    pub indentation_unit: String,

    /// Lines above a diagram body searched for the root declaration
    pub root_lookback: usize,

    /// Shortest accepted heading file extension
    pub min_extension_len: usize,

    /// Longest accepted heading file extension
    pub max_extension_len: usize,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (relaxed name heuristics).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set both fence markers.
    pub fn with_markers(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_marker = start.into();
        self.end_marker = end.into();
        self
    }

    /// Set the opening fence marker.
    pub fn with_start_marker(mut self, marker: impl Into<String>) -> Self {
        self.start_marker = marker.into();
        self
    }

    /// Set the closing fence marker.
    pub fn with_end_marker(mut self, marker: impl Into<String>) -> Self {
        self.end_marker = marker.into();
        self
    }

    /// Set fence matching mode.
    pub fn with_fence_match(mut self, mode: FenceMatch) -> Self {
        self.fence_match = mode;
        self
    }

    /// Set the heading lookback window.
    pub fn with_lookback(mut self, lines: usize) -> Self {
        self.lookback_lines = lines;
        self
    }

    /// Set the tree diagram indentation unit.
    pub fn with_indentation_unit(mut self, unit: impl Into<String>) -> Self {
        self.indentation_unit = unit.into();
        self
    }

    /// Set the root declaration walk-back window.
    pub fn with_root_lookback(mut self, lines: usize) -> Self {
        self.root_lookback = lines;
        self
    }

    /// Set accepted heading extension lengths.
    pub fn with_extension_len(mut self, min: usize, max: usize) -> Self {
        self.min_extension_len = min;
        self.max_extension_len = max;
        self
    }

    /// Check option consistency.
    pub fn validate(&self) -> Result<()> {
        if self.start_marker.is_empty() || self.end_marker.is_empty() {
            return Err(Error::Config("fence markers must not be empty".into()));
        }
        if self.lookback_lines == 0 {
            return Err(Error::Config("lookback_lines must be at least 1".into()));
        }
        if self.indentation_unit.is_empty() {
            return Err(Error::Config("indentation_unit must not be empty".into()));
        }
        if self.min_extension_len == 0 || self.min_extension_len > self.max_extension_len {
            return Err(Error::Config(format!(
                "invalid extension length bounds {}..={}",
                self.min_extension_len, self.max_extension_len
            )));
        }
        Ok(())
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            start_marker: "```".to_string(),
            end_marker: "```".to_string(),
            fence_match: FenceMatch::Exact,
            lookback_lines: 3,
            indentation_unit: "│   ".to_string(),
            root_lookback: 2,
            min_extension_len: 1,
            max_extension_len: 3,
        }
    }
}

/// Error handling mode for entry name heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Dotted names are files, undotted names must end with `/`
    #[default]
    Strict,
    /// Trust the trailing slash alone
    Lenient,
}

/// How a closing fence line is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FenceMatch {
    /// The line, minus trailing whitespace, equals the end marker
    #[default]
    Exact,
    /// The line starts with the end marker
    Prefix,
}

impl FenceMatch {
    /// Check whether `line` closes a fence delimited by `marker`.
    pub fn closes(&self, line: &str, marker: &str) -> bool {
        match self {
            FenceMatch::Exact => line.trim_end() == marker,
            FenceMatch::Prefix => line.starts_with(marker),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .lenient()
            .with_markers("~~~", "~~~")
            .with_lookback(5)
            .with_fence_match(FenceMatch::Prefix);

        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert_eq!(options.start_marker, "~~~");
        assert_eq!(options.lookback_lines, 5);
        assert_eq!(options.fence_match, FenceMatch::Prefix);
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert_eq!(options.start_marker, "```");
        assert_eq!(options.lookback_lines, 3);
        assert_eq!(options.indentation_unit, "│   ");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(ParseOptions::new().with_lookback(0).validate().is_err());
        assert!(ParseOptions::new().with_start_marker("").validate().is_err());
        assert!(ParseOptions::new().with_extension_len(4, 2).validate().is_err());
        assert!(ParseOptions::new().with_indentation_unit("").validate().is_err());
    }

    #[test]
    fn test_fence_match() {
        assert!(FenceMatch::Exact.closes("```  ", "```"));
        assert!(!FenceMatch::Exact.closes("```python", "```"));
        assert!(FenceMatch::Prefix.closes("```python", "```"));
    }

    #[test]
    fn test_partial_json() {
        let options: ParseOptions =
            serde_json::from_str(r#"{"lookback_lines": 2, "error_mode": "lenient"}"#).unwrap();
        assert_eq!(options.lookback_lines, 2);
        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert_eq!(options.end_marker, "```");
    }
}
