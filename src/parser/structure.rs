//! Tree diagram detection and validation.
//!
//! A structure block is a root declaration (`project/`) followed by a run
//! of box-drawing lines:
//!
//! ```text
//! project/
//! ├── a.py
//! ├── b/
//! │   └── d.py
//! └── c.py
//! ```
//!
//! The scanner locates the first run of at least three glyph lines, walks
//! back to the root declaration, stops at the first line that begins with
//! the last-sibling glyph, and then validates every entry. A block that
//! fails any rule is rejected as a whole.

use super::options::ParseOptions;
use crate::error::{Error, Result};
use crate::model::{classify_name, EntryKind, LineBuffer, StructureBlock, StructureEntry};
use crate::sink::{LogSink, Severity};

const VERTICAL: char = '│';
const BRANCH: char = '├';
const LAST_BRANCH: char = '└';
const HORIZONTAL: char = '─';
const NBSP: char = '\u{a0}';

/// Minimum number of consecutive glyph lines that count as a diagram body.
pub const MIN_GLYPH_RUN: usize = 3;

/// Result of scanning one document for a structure block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A valid block was found
    Found(StructureBlock),
    /// No candidate diagram exists
    NotFound,
    /// A candidate was found but failed validation
    Invalid {
        /// 1-indexed document line that broke a rule
        line: usize,
        /// Description of the violated rule
        reason: String,
    },
}

impl ScanOutcome {
    /// The block, if one was found.
    pub fn found(&self) -> Option<&StructureBlock> {
        match self {
            ScanOutcome::Found(block) => Some(block),
            _ => None,
        }
    }

    /// Convert into a result, mapping absence and rejection to errors.
    pub fn into_result(self) -> Result<StructureBlock> {
        match self {
            ScanOutcome::Found(block) => Ok(block),
            ScanOutcome::NotFound => Err(Error::StructureNotFound),
            ScanOutcome::Invalid { line, reason } => Err(Error::StructureInvalid { line, reason }),
        }
    }
}

/// Finds and validates tree diagrams.
pub struct StructureScanner<'a> {
    options: &'a ParseOptions,
    sink: &'a dyn LogSink,
}

impl<'a> StructureScanner<'a> {
    /// Create a scanner.
    pub fn new(options: &'a ParseOptions, sink: &'a dyn LogSink) -> Self {
        Self { options, sink }
    }

    /// Scan a buffer for its first structure block.
    ///
    /// The buffer is only read; its cursor is left untouched.
    pub fn scan(&self, buffer: &LineBuffer) -> ScanOutcome {
        let outcome = self.scan_lines(buffer.lines());
        match &outcome {
            ScanOutcome::Found(block) => self.sink.log(
                &format!(
                    "Found structure '{}' at line {} ({} directories, {} files)",
                    block.root(),
                    block.start_line + 1,
                    block.directory_count(),
                    block.file_count()
                ),
                Severity::Info,
                true,
            ),
            ScanOutcome::NotFound => self.sink.info("No structure diagram found"),
            ScanOutcome::Invalid { line, reason } => self.sink.warning(&format!(
                "Rejected structure diagram at line {}: {}",
                line, reason
            )),
        }
        outcome
    }

    fn scan_lines(&self, lines: &[String]) -> ScanOutcome {
        let Some(body_start) = find_glyph_run(lines) else {
            return ScanOutcome::NotFound;
        };
        self.sink
            .debug(&format!("Glyph run starts at line {}", body_start + 1));

        let Some((root_line, root_text)) = self.find_root(lines, body_start) else {
            self.sink.debug("No root declaration above glyph run");
            return ScanOutcome::NotFound;
        };

        let Some(end_line) = find_terminator(lines, body_start) else {
            self.sink.debug("Glyph run has no closing entry");
            return ScanOutcome::NotFound;
        };

        match self.validate(lines, root_line, &root_text, body_start, end_line) {
            Ok(block) => ScanOutcome::Found(block),
            Err((line, reason)) => ScanOutcome::Invalid {
                line: line + 1,
                reason,
            },
        }
    }

    /// Walk back from the body looking for a bare `name/` line.
    fn find_root(&self, lines: &[String], body_start: usize) -> Option<(usize, String)> {
        let window_start = body_start.saturating_sub(self.options.root_lookback);
        (window_start..body_start)
            .rev()
            .find_map(|i| root_declaration(&lines[i]).map(|name| (i, name)))
    }

    fn validate(
        &self,
        lines: &[String],
        root_line: usize,
        root_text: &str,
        body_start: usize,
        end_line: usize,
    ) -> std::result::Result<StructureBlock, (usize, String)> {
        let block_len = 1 + end_line - body_start + 1;
        if block_len < MIN_GLYPH_RUN {
            return Err((end_line, format!("block has only {} lines", block_len)));
        }

        let root_name = match classify_name(root_text, self.options.error_mode) {
            Some(EntryKind::Directory) => root_text.trim_end_matches('/').to_string(),
            _ => return Err((root_line, format!("'{}' is not a directory name", root_text))),
        };

        let body = &lines[body_start..=end_line];
        let base_indent = common_indent(body);
        let unit: Vec<char> = self.options.indentation_unit.chars().collect();

        let mut entries = vec![StructureEntry::directory(0, root_name.clone())];
        let mut block_lines = vec![format!("{}/", root_name)];

        for (offset, raw) in body.iter().enumerate() {
            let index = body_start + offset;
            let is_last = index == end_line;
            let line: String = raw.chars().map(|c| if c == NBSP { ' ' } else { c }).collect();
            let trimmed = line.trim_start();
            block_lines.push(raw.trim_end().to_string());

            if is_last {
                if !trimmed.starts_with(LAST_BRANCH) {
                    return Err((index, "closing entry must start with '└'".into()));
                }
            } else if !trimmed.starts_with(VERTICAL) && !trimmed.starts_with(BRANCH) {
                return Err((index, "entry must start with '│' or '├'".into()));
            }

            if is_spacer(trimmed) {
                continue;
            }

            let indented: String = line.chars().skip(base_indent).collect();
            let (prefix, segment) = split_branch(&indented)
                .ok_or_else(|| (index, "missing branch marker".to_string()))?;

            let depth = indentation_depth(prefix, &unit)
                .ok_or_else(|| (index, "irregular indentation".to_string()))?;
            let level = depth + 1;

            let name_text = strip_comment(segment);
            let kind = classify_name(name_text, self.options.error_mode).ok_or_else(|| {
                (
                    index,
                    format!("cannot tell whether '{}' is a file or a directory", name_text),
                )
            })?;

            if let Some(prev) = entries.last() {
                if level > prev.level + 1 {
                    return Err((
                        index,
                        format!("level jumps from {} to {}", prev.level, level),
                    ));
                }
                if level == prev.level + 1 && !prev.is_directory {
                    return Err((index, format!("'{}' is nested under file '{}'", name_text, prev.name)));
                }
            }

            let name = name_text.trim_end_matches('/').to_string();
            entries.push(match kind {
                EntryKind::Directory => StructureEntry::directory(level, name),
                EntryKind::File => StructureEntry::file(level, name),
            });
        }

        Ok(StructureBlock {
            entries,
            lines: block_lines,
            start_line: root_line,
            end_line,
        })
    }
}

fn is_glyph_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with(VERTICAL) || trimmed.starts_with(BRANCH) || trimmed.starts_with(LAST_BRANCH)
}

/// Index of the first line of the first run of glyph lines long enough to be a diagram.
fn find_glyph_run(lines: &[String]) -> Option<usize> {
    let mut run_start = 0;
    let mut run_len = 0;
    for (i, line) in lines.iter().enumerate() {
        if is_glyph_line(line) {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len >= MIN_GLYPH_RUN {
                return Some(run_start);
            }
        } else {
            run_len = 0;
        }
    }
    None
}

/// First last-sibling line within the contiguous glyph run.
fn find_terminator(lines: &[String], body_start: usize) -> Option<usize> {
    lines[body_start..]
        .iter()
        .take_while(|line| is_glyph_line(line))
        .position(|line| line.trim_start().starts_with(LAST_BRANCH))
        .map(|offset| body_start + offset)
}

/// Parse a root declaration line (`project/` or `## project/`).
fn root_declaration(line: &str) -> Option<String> {
    let text = line.trim().trim_start_matches('#').trim();
    if text.len() < 2 || !text.ends_with('/') || text.starts_with('`') {
        return None;
    }
    if text.chars().any(|c| c.is_whitespace() || matches!(c, VERTICAL | BRANCH | LAST_BRANCH | HORIZONTAL)) {
        return None;
    }
    Some(text.to_string())
}

fn is_spacer(trimmed: &str) -> bool {
    trimmed.chars().all(|c| c == VERTICAL || c.is_whitespace())
}

/// Smallest leading-whitespace width across the non-spacer lines.
fn common_indent(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|l| !is_spacer(l.trim_start()))
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0)
}

/// Split a line into the indentation before its branch glyph and the entry text after the marker.
fn split_branch(line: &str) -> Option<(&str, &str)> {
    let (pos, glyph) = line
        .char_indices()
        .find(|(_, c)| *c == BRANCH || *c == LAST_BRANCH)?;
    let prefix = &line[..pos];
    let after = &line[pos + glyph.len_utf8()..];
    let rest = after.trim_start_matches(HORIZONTAL);
    if rest.len() == after.len() {
        return None;
    }
    Some((prefix, rest.trim()))
}

/// Count indentation units, where each unit is either the configured
/// string or a blank run of the same width.
fn indentation_depth(prefix: &str, unit: &[char]) -> Option<usize> {
    let chars: Vec<char> = prefix.chars().collect();
    let width = unit.len();
    let mut depth = 0;
    for chunk in chars.chunks(width) {
        let blank = chunk.iter().all(|c| c.is_whitespace());
        if chunk.len() < width {
            // trailing padding narrower than one unit
            return blank.then_some(depth);
        }
        if blank || chunk == unit {
            depth += 1;
        } else {
            return None;
        }
    }
    Some(depth)
}

/// Drop a trailing `# comment` annotation.
fn strip_comment(segment: &str) -> &str {
    let cut = segment
        .char_indices()
        .find(|(i, c)| *c == '#' && *i > 0 && segment[..*i].ends_with(char::is_whitespace))
        .map(|(i, _)| i)
        .unwrap_or(segment.len());
    segment[..cut].trim()
}
