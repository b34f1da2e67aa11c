//! Step-driven code block extraction.
//!
//! The parser walks a [`LineBuffer`] one line per step. Each fence is
//! correlated with the nearest path-bearing heading in the few lines
//! above it; fences without one are skipped, never guessed.
//!
//! # Example
//!
//! ```
//! use unfold::parser::{CodeBlockParser, ParseOptions, StepResult};
//! use unfold::sink::NullSink;
//!
//! let text = "## src/app.py\n```python\nprint(1)\n```";
//! let options = ParseOptions::default();
//! let mut parser = CodeBlockParser::new(text, &options, &NullSink)?;
//!
//! loop {
//!     match parser.step() {
//!         StepResult::BlockEmitted(block) => assert_eq!(block.path, "src/app.py"),
//!         StepResult::Continue => {}
//!         StepResult::Done => break,
//!     }
//! }
//! # Ok::<(), unfold::Error>(())
//! ```

use super::heading::PathHeadingMatcher;
use super::options::ParseOptions;
use crate::error::{Error, Result};
use crate::model::{normalize_relative_path, CodeBlock, DiscardReason, DiscardedBlock, LineBuffer};
use crate::sink::LogSink;

/// Outcome of a single parser step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// One line consumed, nothing emitted
    Continue,
    /// A closing fence completed a block
    BlockEmitted(CodeBlock),
    /// The buffer is exhausted
    Done,
}

/// Externally visible parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Looking for the next fence
    Scan,
    /// Accumulating the body of a correlated fence
    Capture,
    /// Passing over the body of an uncorrelated fence
    Skip,
    /// All lines consumed
    Done,
}

#[derive(Debug, Clone)]
enum State {
    Scan,
    Capture {
        path: String,
        language: String,
        start_line: usize,
        lines: Vec<String>,
    },
    Skip,
    Done,
}

/// Resumable code block extractor over one document.
pub struct CodeBlockParser<'a> {
    buffer: LineBuffer,
    options: &'a ParseOptions,
    headings: PathHeadingMatcher,
    sink: &'a dyn LogSink,
    state: State,
    /// Lines before this index are no longer eligible for correlation
    floor: usize,
    blocks: Vec<CodeBlock>,
    discards: Vec<DiscardedBlock>,
}

impl<'a> CodeBlockParser<'a> {
    /// Create a parser that owns `buffer`.
    pub fn new(
        buffer: impl Into<LineBuffer>,
        options: &'a ParseOptions,
        sink: &'a dyn LogSink,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            buffer: buffer.into(),
            options,
            headings: PathHeadingMatcher::new(options)?,
            sink,
            state: State::Scan,
            floor: 0,
            blocks: Vec::new(),
            discards: Vec::new(),
        })
    }

    /// Current state.
    pub fn state(&self) -> ParserState {
        match self.state {
            State::Scan => ParserState::Scan,
            State::Capture { .. } => ParserState::Capture,
            State::Skip => ParserState::Skip,
            State::Done => ParserState::Done,
        }
    }

    /// Check if parsing is complete.
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Cursor position (0-indexed line).
    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    /// Blocks emitted so far.
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Fence occurrences dropped so far.
    pub fn discards(&self) -> &[DiscardedBlock] {
        &self.discards
    }

    /// Consume the parser, returning emitted and dropped blocks.
    pub fn into_parts(self) -> (Vec<CodeBlock>, Vec<DiscardedBlock>) {
        (self.blocks, self.discards)
    }

    /// Step until the buffer is exhausted.
    pub fn run_to_completion(&mut self) -> &[CodeBlock] {
        while self.step() != StepResult::Done {}
        &self.blocks
    }

    /// Advance by exactly one unit of work.
    pub fn step(&mut self) -> StepResult {
        if matches!(self.state, State::Done) {
            return StepResult::Done;
        }

        let cursor = self.buffer.cursor();
        let Some(line) = self.buffer.current().map(str::to_string) else {
            self.finish();
            return StepResult::Done;
        };

        match std::mem::replace(&mut self.state, State::Scan) {
            State::Scan => self.scan_line(cursor, &line),
            State::Capture {
                path,
                language,
                start_line,
                mut lines,
            } => {
                if self.options.fence_match.closes(&line, &self.options.end_marker) {
                    let block = CodeBlock {
                        path,
                        language,
                        content: lines.join("\n"),
                        start_line,
                    };
                    self.sink.debug(&format!(
                        "Extracted {} ({} lines) at line {}",
                        block.path,
                        block.line_count(),
                        start_line + 1
                    ));
                    self.floor = cursor + 1;
                    self.blocks.push(block.clone());
                    self.buffer.advance(1);
                    return StepResult::BlockEmitted(block);
                }
                lines.push(line);
                self.state = State::Capture {
                    path,
                    language,
                    start_line,
                    lines,
                };
            }
            State::Skip => {
                if self.options.fence_match.closes(&line, &self.options.end_marker) {
                    self.floor = cursor + 1;
                } else {
                    self.state = State::Skip;
                }
            }
            State::Done => {
                self.state = State::Done;
                return StepResult::Done;
            }
        }

        self.buffer.advance(1);
        StepResult::Continue
    }

    fn scan_line(&mut self, cursor: usize, line: &str) {
        if let Some(rest) = line.strip_prefix(self.options.start_marker.as_str()) {
            let language = rest.trim().to_string();
            self.open_fence(cursor, language);
        } else if self.headings.is_heading(line) {
            self.sink
                .debug(&format!("Path heading at line {}: {}", cursor + 1, line.trim()));
        }
    }

    fn open_fence(&mut self, cursor: usize, language: String) {
        let Some((heading_line, raw_path)) = self.correlate(cursor) else {
            self.discard(cursor, DiscardReason::UnresolvedPath);
            self.state = State::Skip;
            return;
        };

        self.floor = heading_line + 1;
        match normalize_relative_path(&raw_path) {
            Some(path) => {
                self.sink.debug(&format!(
                    "Code block at line {} correlated with {} (language '{}')",
                    cursor + 1,
                    path,
                    language
                ));
                self.state = State::Capture {
                    path,
                    language,
                    start_line: cursor,
                    lines: Vec::new(),
                };
            }
            None => {
                self.discard(cursor, DiscardReason::UnsafePath { path: raw_path });
                self.state = State::Skip;
            }
        }
    }

    /// Nearest eligible heading within the lookback window above `fence_line`.
    fn correlate(&self, fence_line: usize) -> Option<(usize, String)> {
        let window_start = fence_line
            .saturating_sub(self.options.lookback_lines)
            .max(self.floor);
        (window_start..fence_line).rev().find_map(|i| {
            let line = self.buffer.line(i)?;
            self.headings
                .match_line(line)
                .map(|path| (i, path.to_string()))
        })
    }

    fn finish(&mut self) {
        if let State::Capture {
            path, start_line, ..
        } = std::mem::replace(&mut self.state, State::Done)
        {
            self.discard(start_line, DiscardReason::Unterminated { path });
        }
        self.state = State::Done;
        self.sink.debug(&format!(
            "Code block extraction complete: {} extracted, {} discarded",
            self.blocks.len(),
            self.discards.len()
        ));
    }

    fn discard(&mut self, line: usize, reason: DiscardReason) {
        let error = match &reason {
            DiscardReason::UnresolvedPath => Error::UnresolvedPath { line: line + 1 },
            DiscardReason::Unterminated { path } => Error::UnterminatedBlock {
                path: path.clone(),
                line: line + 1,
            },
            DiscardReason::UnsafePath { path } => Error::UnsafePath(path.clone()),
            DiscardReason::Unlisted { path } => {
                Error::Other(format!("{} is not listed in the structure", path))
            }
        };
        self.sink.warning(&format!("Discarded code block: {}", error));
        self.discards.push(DiscardedBlock { line, reason });
    }
}

impl Iterator for CodeBlockParser<'_> {
    type Item = CodeBlock;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.step() {
                StepResult::Continue => continue,
                StepResult::BlockEmitted(block) => return Some(block),
                StepResult::Done => return None,
            }
        }
    }
}
