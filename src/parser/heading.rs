//! Path-bearing heading recognition.

use super::options::ParseOptions;
use crate::error::{Error, Result};
use regex::Regex;

/// Matches level-2 headings that name a file, such as `## src/app.py`.
///
/// The heading text must contain a `/` and end with a short alphabetic
/// extension; the path may be wrapped in backticks.
#[derive(Debug, Clone)]
pub struct PathHeadingMatcher {
    pattern: Regex,
}

impl PathHeadingMatcher {
    /// Build a matcher for the configured extension length bounds.
    pub fn new(options: &ParseOptions) -> Result<Self> {
        let pattern = format!(
            r"^##\s+`?(.*?/.*?\.[A-Za-z]{{{},{}}})`?\s*$",
            options.min_extension_len, options.max_extension_len
        );
        let pattern = Regex::new(&pattern).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { pattern })
    }

    /// Extract the raw path from a heading line.
    pub fn match_line<'l>(&self, line: &'l str) -> Option<&'l str> {
        self.pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }

    /// Check whether a line is a path-bearing heading.
    pub fn is_heading(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}
