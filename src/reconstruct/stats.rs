//! Run statistics and reports.

use crate::detect::TextEncoding;
use crate::error::Result;
use crate::model::{DiscardReason, DiscardedBlock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Counters accumulated across a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructStats {
    /// Documents read and processed
    pub documents_scanned: usize,

    /// Documents skipped by the extension filter
    pub documents_skipped: usize,

    /// Documents no encoding could decode
    pub decode_failures: usize,

    /// Valid structure diagrams found
    pub structures_found: usize,

    /// Diagram candidates rejected by validation
    pub structures_invalid: usize,

    /// Code blocks written to disk
    pub code_blocks_written: usize,

    /// Written blocks whose path was listed in the diagram
    pub blocks_matched: usize,

    /// Written blocks whose path was not listed in the diagram
    pub blocks_unlisted: usize,

    /// Fences without a path heading
    pub blocks_unresolved: usize,

    /// Fences never closed
    pub blocks_unterminated: usize,

    /// Blocks with a path escaping the output root
    pub blocks_unsafe: usize,

    /// Unlisted blocks dropped by policy
    pub blocks_rejected: usize,

    /// Files that failed to write
    pub write_failures: usize,

    /// Placeholder files created
    pub placeholders_written: usize,

    /// Directories created by tree realization
    pub directories_created: usize,

    /// Whether the run stopped early
    pub cancelled: bool,
}

impl ReconstructStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one discarded fence.
    pub fn add_discard(&mut self, reason: &DiscardReason) {
        match reason {
            DiscardReason::UnresolvedPath => self.blocks_unresolved += 1,
            DiscardReason::Unterminated { .. } => self.blocks_unterminated += 1,
            DiscardReason::UnsafePath { .. } => self.blocks_unsafe += 1,
            DiscardReason::Unlisted { .. } => self.blocks_rejected += 1,
        }
    }

    /// Total fences that produced no file.
    pub fn blocks_discarded(&self) -> usize {
        self.blocks_unresolved + self.blocks_unterminated + self.blocks_unsafe + self.blocks_rejected
    }

    /// Merge statistics from another run or document.
    pub fn merge(&mut self, other: &ReconstructStats) {
        self.documents_scanned += other.documents_scanned;
        self.documents_skipped += other.documents_skipped;
        self.decode_failures += other.decode_failures;
        self.structures_found += other.structures_found;
        self.structures_invalid += other.structures_invalid;
        self.code_blocks_written += other.code_blocks_written;
        self.blocks_matched += other.blocks_matched;
        self.blocks_unlisted += other.blocks_unlisted;
        self.blocks_unresolved += other.blocks_unresolved;
        self.blocks_unterminated += other.blocks_unterminated;
        self.blocks_unsafe += other.blocks_unsafe;
        self.blocks_rejected += other.blocks_rejected;
        self.write_failures += other.write_failures;
        self.placeholders_written += other.placeholders_written;
        self.directories_created += other.directories_created;
        self.cancelled |= other.cancelled;
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} documents scanned, {} structures found, {} code blocks written ({} unlisted), {} discarded",
            self.documents_scanned,
            self.structures_found,
            self.code_blocks_written,
            self.blocks_unlisted,
            self.blocks_discarded()
        )
    }
}

/// How structure scanning ended for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StructureStatus {
    /// A diagram rooted at `root` was realized
    Found {
        /// Root folder name
        root: String,
    },
    /// No diagram present
    NotFound,
    /// A diagram candidate was rejected
    Invalid {
        /// 1-indexed line
        line: usize,
        /// Rejection reason
        reason: String,
    },
}

/// Result of processing one input document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    /// Input path
    pub path: PathBuf,

    /// Encoding that decoded the document
    pub encoding: Option<TextEncoding>,

    /// Structure scan result
    pub structure: StructureStatus,

    /// Allocated output location, if anything was written
    pub output: Option<PathBuf>,

    /// Files written from code blocks, relative to the output location
    pub written: Vec<String>,

    /// Fences that produced no file
    pub discarded: Vec<DiscardedBlock>,

    /// Error that stopped this document, if any
    pub error: Option<String>,

    /// Counters for this document alone
    pub stats: ReconstructStats,
}

impl DocumentOutcome {
    /// Create an outcome for a document about to be processed.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: None,
            structure: StructureStatus::NotFound,
            output: None,
            written: Vec::new(),
            discarded: Vec::new(),
            error: None,
            stats: ReconstructStats::default(),
        }
    }
}

/// Full record of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconstructReport {
    /// Run start time
    pub started_at: DateTime<Utc>,

    /// Run end time
    pub finished_at: DateTime<Utc>,

    /// Requested output base path
    pub output_root: PathBuf,

    /// Aggregate counters
    pub stats: ReconstructStats,

    /// Per-document outcomes in processing order
    pub documents: Vec<DocumentOutcome>,
}

impl ReconstructReport {
    /// Start a report now.
    pub fn start(output_root: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            output_root: output_root.into(),
            stats: ReconstructStats::default(),
            documents: Vec::new(),
        }
    }

    /// Record a finished document.
    pub fn push(&mut self, outcome: DocumentOutcome) {
        self.stats.merge(&outcome.stats);
        self.documents.push(outcome);
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Output locations that received files.
    pub fn outputs(&self) -> Vec<&PathBuf> {
        self.documents.iter().filter_map(|d| d.output.as_ref()).collect()
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut a = ReconstructStats {
            documents_scanned: 1,
            code_blocks_written: 2,
            ..Default::default()
        };
        let b = ReconstructStats {
            documents_scanned: 2,
            code_blocks_written: 3,
            blocks_unresolved: 1,
            cancelled: true,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.documents_scanned, 3);
        assert_eq!(a.code_blocks_written, 5);
        assert_eq!(a.blocks_discarded(), 1);
        assert!(a.cancelled);
    }

    #[test]
    fn test_add_discard() {
        let mut stats = ReconstructStats::new();
        stats.add_discard(&DiscardReason::UnresolvedPath);
        stats.add_discard(&DiscardReason::Unterminated { path: "a/b.py".into() });
        stats.add_discard(&DiscardReason::Unlisted { path: "x/y.py".into() });
        assert_eq!(stats.blocks_unresolved, 1);
        assert_eq!(stats.blocks_unterminated, 1);
        assert_eq!(stats.blocks_rejected, 1);
        assert_eq!(stats.blocks_discarded(), 3);
    }

    #[test]
    fn test_report_json() {
        let mut report = ReconstructReport::start("code");
        let mut outcome = DocumentOutcome::new("chat.md");
        outcome.stats.documents_scanned = 1;
        outcome.structure = StructureStatus::Found {
            root: "project".into(),
        };
        report.push(outcome);
        report.finish();

        assert_eq!(report.stats.documents_scanned, 1);
        assert!(report.duration() >= chrono::Duration::zero());

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["documents"][0]["structure"]["status"], "found");
        assert_eq!(value["stats"]["documents_scanned"], 1);
    }

    #[test]
    fn test_summary() {
        let stats = ReconstructStats {
            documents_scanned: 2,
            structures_found: 1,
            code_blocks_written: 4,
            ..Default::default()
        };
        assert!(stats.summary().starts_with("2 documents scanned, 1 structures found"));
    }
}
