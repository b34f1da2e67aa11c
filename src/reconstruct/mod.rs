//! Document-to-filesystem reconstruction.
//!
//! [`Reconstructor`] ties the pieces together for each input document:
//! decode, scan for a structure diagram, extract correlated code blocks,
//! allocate a fresh output directory, realize the tree, and write code.
//!
//! # Example
//!
//! ```no_run
//! use unfold::reconstruct::{ReconstructOptions, Reconstructor};
//!
//! fn main() -> unfold::Result<()> {
//!     let options = ReconstructOptions::new()
//!         .with_file_types(["md", "txt"])
//!         .with_output_root("rebuilt");
//!     let report = Reconstructor::new(options)?.run_dir("transcripts")?;
//!     println!("{}", report.stats.summary());
//!     Ok(())
//! }
//! ```

mod control;
mod options;
mod stats;

pub use control::{
    CancelToken, ProgressCallback, ProgressEvent, RunToCompletion, StepControl, StepObserver,
    StepView,
};
pub use options::{ReconstructOptions, UnlistedPolicy, STRUCTURE_FILE_NAME};
pub use stats::{DocumentOutcome, ReconstructReport, ReconstructStats, StructureStatus};

use crate::detect::{has_selected_extension, read_document};
use crate::error::{Error, Result};
use crate::materialize::{OutputDirectoryAllocator, TreeMaterializer};
use crate::model::{
    comment_line, CodeBlock, DiscardReason, DiscardedBlock, LineBuffer, MaterializedTree,
    StructureBlock,
};
use crate::parser::{CodeBlockParser, ScanOutcome, StructureScanner};
use crate::sink::{LogCrateSink, LogSink, Severity};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// List the documents in `input` carrying one of `file_types`, sorted by path.
///
/// A file path is returned as-is. Subdirectories are searched only when
/// `recursive` is set; symbolic links are never followed.
pub fn discover_documents<P, S>(input: P, file_types: &[S], recursive: bool) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let input = input.as_ref();
    if !input.exists() {
        return Err(Error::InputNotFound(input.to_path_buf()));
    }
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let walker = WalkDir::new(input)
        .follow_links(false)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && has_selected_extension(entry.path(), file_types) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Rebuilds project trees from documents.
pub struct Reconstructor {
    options: ReconstructOptions,
    sink: Arc<dyn LogSink>,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl Reconstructor {
    /// Create a reconstructor logging through the `log` facade.
    pub fn new(options: ReconstructOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            sink: Arc::new(LogCrateSink),
            cancel: CancelToken::new(),
            progress: None,
        })
    }

    /// Set the log sink.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Install a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Run options.
    pub fn options(&self) -> &ReconstructOptions {
        &self.options
    }

    /// A handle to this run's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Discover documents under `input` and process them.
    pub fn run_dir<P: AsRef<Path>>(&self, input: P) -> Result<ReconstructReport> {
        let documents = discover_documents(
            input.as_ref(),
            &self.options.file_types,
            self.options.recursive,
        )?;
        self.sink.info(&format!(
            "Found {} candidate documents in {}",
            documents.len(),
            input.as_ref().display()
        ));
        self.run(&documents)
    }

    /// Process documents in order, running each parser to completion.
    pub fn run<P: AsRef<Path>>(&self, documents: &[P]) -> Result<ReconstructReport> {
        self.run_with_observer(documents, &mut RunToCompletion)
    }

    /// Process documents in order, reporting every parser step to `observer`.
    ///
    /// Per-document and per-block failures are logged and counted; only
    /// fatal errors (see [`Error::is_fatal`]) abort the run.
    pub fn run_with_observer<P: AsRef<Path>>(
        &self,
        documents: &[P],
        observer: &mut dyn StepObserver,
    ) -> Result<ReconstructReport> {
        let total = documents.len();
        let mut report = ReconstructReport::start(&self.options.output_root);
        self.emit(ProgressEvent::RunStarted { total });

        for (index, document) in documents.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.stats.cancelled = true;
                break;
            }

            let path = document.as_ref();
            if !has_selected_extension(path, &self.options.file_types) {
                self.sink
                    .debug(&format!("Skipping {} (extension not selected)", path.display()));
                report.stats.documents_skipped += 1;
                continue;
            }

            self.emit(ProgressEvent::DocumentStarted {
                index,
                total,
                path: path.to_path_buf(),
            });
            let outcome = match self.process_document(path, observer) {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.sink
                        .error(&format!("Skipping {}: {}", path.display(), e));
                    let mut outcome = DocumentOutcome::new(path);
                    outcome.error = Some(e.to_string());
                    outcome
                }
            };
            self.emit(ProgressEvent::DocumentFinished {
                index,
                total,
                path: path.to_path_buf(),
                blocks_written: outcome.stats.code_blocks_written,
            });
            report.push(outcome);
        }

        if self.cancel.is_cancelled() {
            report.stats.cancelled = true;
            self.sink.log("Run cancelled", Severity::Warning, true);
        }
        report.finish();
        self.sink.log(
            &format!("Finished: {}", report.stats.summary()),
            Severity::Info,
            true,
        );
        self.emit(ProgressEvent::RunFinished {
            cancelled: report.stats.cancelled,
        });
        Ok(report)
    }

    /// Run on a blocking worker thread.
    #[cfg(feature = "async")]
    pub async fn run_async(self, documents: Vec<PathBuf>) -> Result<ReconstructReport> {
        tokio::task::spawn_blocking(move || self.run(&documents))
            .await
            .map_err(|e| Error::Other(format!("reconstruction task failed: {}", e)))?
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.progress {
            callback(&event);
        }
    }

    fn process_document(
        &self,
        path: &Path,
        observer: &mut dyn StepObserver,
    ) -> Result<DocumentOutcome> {
        let mut outcome = DocumentOutcome::new(path);
        self.sink
            .log(&format!("Processing {}", path.display()), Severity::Info, true);

        let text = match read_document(path, &self.options.encodings) {
            Ok((text, encoding)) => {
                outcome.encoding = Some(encoding);
                text
            }
            Err(e) => {
                if matches!(e, Error::DecodeFailure { .. }) {
                    outcome.stats.decode_failures += 1;
                }
                self.sink.error(&format!("Skipping document: {}", e));
                outcome.error = Some(e.to_string());
                return Ok(outcome);
            }
        };
        outcome.stats.documents_scanned += 1;

        let buffer = LineBuffer::new(&text);
        let sink: &dyn LogSink = &*self.sink;
        let materializer = TreeMaterializer::new(self.options.placeholder, sink);

        let structure = match StructureScanner::new(&self.options.parse, sink).scan(&buffer) {
            ScanOutcome::Found(block) => match materializer.materialize_block(&block) {
                Ok(tree) => {
                    outcome.stats.structures_found += 1;
                    outcome.structure = StructureStatus::Found {
                        root: tree.root().to_string(),
                    };
                    Some((block, tree))
                }
                Err(e) => {
                    outcome.stats.structures_invalid += 1;
                    self.sink.warning(&format!("Rejected structure diagram: {}", e));
                    outcome.structure = match e {
                        Error::StructureInvalid { line, reason } => StructureStatus::Invalid {
                            line: block.start_line + line,
                            reason,
                        },
                        other => StructureStatus::Invalid {
                            line: block.start_line + 1,
                            reason: other.to_string(),
                        },
                    };
                    None
                }
            },
            ScanOutcome::NotFound => None,
            ScanOutcome::Invalid { line, reason } => {
                outcome.stats.structures_invalid += 1;
                outcome.structure = StructureStatus::Invalid { line, reason };
                None
            }
        };

        let Some((blocks, discards)) = self.extract_blocks(path, buffer, observer)? else {
            return Ok(outcome);
        };
        for discard in &discards {
            outcome.stats.add_discard(&discard.reason);
        }
        outcome.discarded = discards;

        let tree = structure.as_ref().map(|(_, tree)| tree);
        let planned = self.plan_writes(blocks, tree, &mut outcome);

        if structure.is_none() && planned.is_empty() {
            self.sink
                .info(&format!("Nothing to write for {}", path.display()));
            return Ok(outcome);
        }

        let location = OutputDirectoryAllocator::new().allocate(&self.options.output_root)?;
        self.sink.log(
            &format!("Writing {} into {}", path.display(), location.display()),
            Severity::Info,
            true,
        );
        outcome.output = Some(location.clone());

        if let Some((block, tree)) = &structure {
            self.write_structure(&location, block, tree, &planned, &materializer, &mut outcome);
        }
        self.write_blocks(&location, &planned, &mut outcome);

        self.sink.log(
            &format!(
                "{}: {} code blocks written, {} discarded",
                path.display(),
                outcome.stats.code_blocks_written,
                outcome.stats.blocks_discarded()
            ),
            Severity::Info,
            true,
        );
        Ok(outcome)
    }

    /// Step the parser over the whole buffer. Returns `None` if the observer cancelled.
    fn extract_blocks(
        &self,
        path: &Path,
        buffer: LineBuffer,
        observer: &mut dyn StepObserver,
    ) -> Result<Option<(Vec<CodeBlock>, Vec<DiscardedBlock>)>> {
        let mut parser = CodeBlockParser::new(buffer, &self.options.parse, &*self.sink)?;
        let line_count = parser.buffer().len();

        loop {
            let line = parser.cursor();
            let result = parser.step();
            let view = StepView {
                document: path,
                line,
                text: parser.buffer().line(line),
                line_count,
                state: parser.state(),
                emitted: control::emitted(&result),
            };
            if observer.on_step(&view) == StepControl::Cancel {
                self.sink.warning(&format!(
                    "Stepping cancelled at line {} of {}",
                    line + 1,
                    path.display()
                ));
                self.cancel.cancel();
                return Ok(None);
            }
            if view.done() {
                break;
            }
        }
        Ok(Some(parser.into_parts()))
    }

    /// Resolve each block to a path under its output location, applying the unlisted policy.
    fn plan_writes(
        &self,
        blocks: Vec<CodeBlock>,
        tree: Option<&MaterializedTree>,
        outcome: &mut DocumentOutcome,
    ) -> Vec<PlannedWrite> {
        let mut planned = Vec::with_capacity(blocks.len());
        for block in blocks {
            let (relative, listed) = match tree {
                Some(tree) => {
                    let root = tree.root();
                    let inner = block
                        .path
                        .strip_prefix(root)
                        .and_then(|rest| rest.strip_prefix('/'))
                        .unwrap_or(&block.path)
                        .to_string();
                    let listed = tree.contains_file(&inner);
                    (format!("{}/{}", root, inner), listed)
                }
                None => (block.path.clone(), false),
            };

            if !listed && tree.is_some() && self.options.unlisted == UnlistedPolicy::Reject {
                let reason = DiscardReason::Unlisted {
                    path: block.path.clone(),
                };
                self.sink
                    .warning(&format!("Discarded code block at line {}: {}", block.start_line + 1, reason));
                outcome.stats.add_discard(&reason);
                outcome.discarded.push(DiscardedBlock {
                    line: block.start_line,
                    reason,
                });
                continue;
            }

            planned.push(PlannedWrite {
                relative,
                listed,
                block,
            });
        }
        planned
    }

    fn write_structure(
        &self,
        location: &Path,
        block: &StructureBlock,
        tree: &MaterializedTree,
        planned: &[PlannedWrite],
        materializer: &TreeMaterializer<'_>,
        outcome: &mut DocumentOutcome,
    ) {
        let description = location.join(&self.options.structure_file);
        if let Err(source) = std::fs::write(&description, format!("{}\n", block.text())) {
            self.report_write_failure(description, source, outcome);
        }

        let supplied: HashSet<String> = planned.iter().map(|w| w.relative.clone()).collect();
        match materializer.realize_except(tree, location, &supplied) {
            Ok(stats) => {
                outcome.stats.directories_created += stats.directories_created;
                outcome.stats.placeholders_written += stats.placeholders_written;
            }
            Err(e) => {
                outcome.stats.write_failures += 1;
                self.sink.error(&e.to_string());
            }
        }
    }

    fn write_blocks(&self, location: &Path, planned: &[PlannedWrite], outcome: &mut DocumentOutcome) {
        for (index, write) in planned.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.stats.cancelled = true;
                self.fill_placeholders(location, &planned[index..], outcome);
                return;
            }

            let target = location.join(&write.relative);
            let content = if self.options.annotate {
                annotated(&write.block)
            } else {
                write.block.content.clone()
            };

            let result = match target.parent() {
                Some(parent) => std::fs::create_dir_all(parent),
                None => Ok(()),
            }
            .and_then(|()| std::fs::write(&target, content));

            match result {
                Ok(()) => {
                    outcome.stats.code_blocks_written += 1;
                    if write.listed {
                        outcome.stats.blocks_matched += 1;
                    } else {
                        outcome.stats.blocks_unlisted += 1;
                        self.sink.info(&format!(
                            "{} is not listed in the structure; created on demand",
                            write.relative
                        ));
                    }
                    self.sink.debug(&format!("Wrote {}", target.display()));
                    outcome.written.push(write.relative.clone());
                }
                Err(source) => self.report_write_failure(target, source, outcome),
            }
        }
    }

    /// Write placeholders for listed files whose blocks were never written.
    fn fill_placeholders(&self, location: &Path, skipped: &[PlannedWrite], outcome: &mut DocumentOutcome) {
        for write in skipped.iter().filter(|w| w.listed) {
            let target = location.join(&write.relative);
            if target.exists() {
                continue;
            }
            match std::fs::write(&target, self.options.placeholder.content(&write.relative)) {
                Ok(()) => outcome.stats.placeholders_written += 1,
                Err(source) => self.report_write_failure(target, source, outcome),
            }
        }
    }

    fn report_write_failure(&self, path: PathBuf, source: std::io::Error, outcome: &mut DocumentOutcome) {
        outcome.stats.write_failures += 1;
        self.sink
            .error(&Error::WriteFailure { path, source }.to_string());
    }
}

/// A code block with its resolved destination.
struct PlannedWrite {
    /// Slash path relative to the output location
    relative: String,
    /// Whether the diagram lists this file
    listed: bool,
    block: CodeBlock,
}

fn annotated(block: &CodeBlock) -> String {
    let name = block.path.rsplit('/').next().unwrap_or(&block.path);
    let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    format!(
        "{}\n{}\n\n{}",
        comment_line(ext, &format!("File: {}", block.path)),
        comment_line(ext, &format!("Language: {}", block.language)),
        block.content
    )
}

impl std::fmt::Debug for Reconstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconstructor")
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
