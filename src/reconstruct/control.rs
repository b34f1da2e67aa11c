//! Cancellation, progress reporting, and step observation.

use crate::model::CodeBlock;
use crate::parser::{ParserState, StepResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a run and its driver.
///
/// The run checks it before each document and after each written block.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Per-document progress notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A run is starting over `total` documents.
    RunStarted {
        /// Number of candidate documents
        total: usize,
    },

    /// A document is about to be processed.
    DocumentStarted {
        /// 0-indexed position in the run
        index: usize,
        /// Number of candidate documents
        total: usize,
        /// Document path
        path: PathBuf,
    },

    /// A document has been processed.
    DocumentFinished {
        /// 0-indexed position in the run
        index: usize,
        /// Number of candidate documents
        total: usize,
        /// Document path
        path: PathBuf,
        /// Files written from code blocks
        blocks_written: usize,
    },

    /// The run has ended (normally or by cancellation).
    RunFinished {
        /// Whether the run was cancelled
        cancelled: bool,
    },
}

/// Progress callback installed on a reconstructor.
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// What an observer wants after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
    /// Keep stepping
    Continue,
    /// Stop the whole run
    Cancel,
}

/// One parser step as seen by an observer.
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    /// Document being parsed
    pub document: &'a Path,
    /// 0-indexed line the step consumed
    pub line: usize,
    /// Text of that line, if any
    pub text: Option<&'a str>,
    /// Total lines in the document
    pub line_count: usize,
    /// Parser state after the step
    pub state: ParserState,
    /// Block completed by this step, if any
    pub emitted: Option<&'a CodeBlock>,
}

impl StepView<'_> {
    pub(crate) fn done(&self) -> bool {
        self.state == ParserState::Done
    }
}

/// Drives code block extraction one step at a time.
///
/// The reconstructor calls [`on_step`](StepObserver::on_step) after every
/// parser step; returning [`StepControl::Cancel`] stops the run before
/// anything further is written.
pub trait StepObserver {
    /// Inspect a completed step.
    fn on_step(&mut self, step: &StepView<'_>) -> StepControl;
}

impl<F> StepObserver for F
where
    F: FnMut(&StepView<'_>) -> StepControl,
{
    fn on_step(&mut self, step: &StepView<'_>) -> StepControl {
        self(step)
    }
}

/// Observer that never intervenes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunToCompletion;

impl StepObserver for RunToCompletion {
    fn on_step(&mut self, _step: &StepView<'_>) -> StepControl {
        StepControl::Continue
    }
}

pub(crate) fn emitted(result: &StepResult) -> Option<&CodeBlock> {
    match result {
        StepResult::BlockEmitted(block) => Some(block),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }

    struct StopAtLine(usize, usize);

    impl StepObserver for StopAtLine {
        fn on_step(&mut self, step: &StepView<'_>) -> StepControl {
            self.1 += 1;
            if step.line >= self.0 {
                StepControl::Cancel
            } else {
                StepControl::Continue
            }
        }
    }

    #[test]
    fn test_observer_cancels() {
        let mut observer = StopAtLine(2, 0);
        let mut view = StepView {
            document: Path::new("a.md"),
            line: 1,
            text: Some("x"),
            line_count: 3,
            state: ParserState::Scan,
            emitted: None,
        };
        assert_eq!(observer.on_step(&view), StepControl::Continue);
        view.line = 2;
        assert_eq!(observer.on_step(&view), StepControl::Cancel);
        assert_eq!(observer.1, 2);
        assert_eq!(RunToCompletion.on_step(&view), StepControl::Continue);
    }
}
