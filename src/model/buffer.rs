//! Line buffer with a movable cursor.

/// A document's text as an indexable sequence of lines.
///
/// Line terminators (`\r\n`, `\r`, `\n`) are normalized before splitting,
/// so lines never carry trailing carriage returns. The cursor always
/// satisfies `0 <= cursor <= len()`; `cursor == len()` means the end of
/// the buffer has been reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    lines: Vec<String>,
    cursor: usize,
}

impl LineBuffer {
    /// Create a buffer from raw document text.
    pub fn new(text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let lines = if normalized.is_empty() {
            Vec::new()
        } else {
            normalized.split('\n').map(str::to_string).collect()
        };
        Self { lines, cursor: 0 }
    }

    /// Create a buffer from already split lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            cursor: 0,
        }
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the buffer has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Get a line by 0-indexed position.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Current cursor position (0-indexed).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The line under the cursor, or `None` at the end.
    pub fn current(&self) -> Option<&str> {
        self.line(self.cursor)
    }

    /// Check if the cursor reached the end.
    pub fn at_end(&self) -> bool {
        self.cursor >= self.lines.len()
    }

    /// Move the cursor forward, stopping at the end.
    pub fn advance(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_add(n).min(self.lines.len());
    }

    /// Place the cursor, clamped to `0..=len()`.
    pub fn seek(&mut self, position: usize) {
        self.cursor = position.min(self.lines.len());
    }

    /// Move the cursor back to the first line.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Lines from the cursor to the end.
    pub fn remaining(&self) -> &[String] {
        &self.lines[self.cursor..]
    }
}

impl From<&str> for LineBuffer {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for LineBuffer {
    fn from(text: String) -> Self {
        Self::new(&text)
    }
}
