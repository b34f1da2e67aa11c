//! End-to-end reconstruction tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use unfold::materialize::{OutputDirectoryAllocator, PlaceholderStyle, TreeMaterializer};
use unfold::reconstruct::{
    CancelToken, ProgressEvent, ReconstructOptions, Reconstructor, StepControl, StepObserver,
    StepView, StructureStatus,
};
use unfold::{DiscardReason, Error, LogSink, MemorySink, NullSink, Severity, Unfold};

const TRANSCRIPT: &str = "\
Here is the layout:

project/
├── a.py
├── b/
└── c.py

## project/a.py
```python
print(\"a\")
```

## project/b/d.py
```python
print(\"d\")
```
";

fn write_doc(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn reconstructor(output: &Path, sink: Arc<MemorySink>) -> Reconstructor {
    Reconstructor::new(ReconstructOptions::new().with_output_root(output))
        .unwrap()
        .with_sink(sink)
}

#[test]
fn test_end_to_end_project() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let sink = Arc::new(MemorySink::new());
    let report = reconstructor(&output, sink.clone()).run(&[input]).unwrap();

    let root = output.join("project");
    assert_eq!(fs::read_to_string(root.join("a.py")).unwrap(), "print(\"a\")");
    assert_eq!(fs::read_to_string(root.join("b/d.py")).unwrap(), "print(\"d\")");
    assert_eq!(fs::read_to_string(root.join("c.py")).unwrap(), "");
    assert!(root.join("b").is_dir());
    assert!(output.join("project_structure.md").is_file());

    let stats = &report.stats;
    assert_eq!(stats.documents_scanned, 1);
    assert_eq!(stats.structures_found, 1);
    assert_eq!(stats.code_blocks_written, 2);
    assert_eq!(stats.blocks_matched, 1);
    assert_eq!(stats.blocks_unlisted, 1);
    assert_eq!(stats.placeholders_written, 1);
    assert_eq!(stats.blocks_discarded(), 0);

    let outcome = &report.documents[0];
    assert_eq!(outcome.output.as_deref(), Some(output.as_path()));
    assert_eq!(
        outcome.structure,
        StructureStatus::Found {
            root: "project".into()
        }
    );
    assert_eq!(outcome.written, vec!["project/a.py", "project/b/d.py"]);
    assert!(sink.with_severity(Severity::Warning).is_empty());
}

#[test]
fn test_structure_description_content() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let output = dir.path().join("code");

    reconstructor(&output, Arc::new(MemorySink::new()))
        .run(&[input])
        .unwrap();

    let description = fs::read_to_string(output.join("project_structure.md")).unwrap();
    assert!(description.starts_with("project/\n"));
    assert!(description.contains("└── c.py"));
}

#[test]
fn test_second_run_gets_fresh_directory() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let first = reconstructor(&output, Arc::new(MemorySink::new()))
        .run(&[&input])
        .unwrap();
    fs::write(output.join("project/a.py"), "edited").unwrap();
    let second = reconstructor(&output, Arc::new(MemorySink::new()))
        .run(&[&input])
        .unwrap();

    assert_eq!(first.documents[0].output.as_deref(), Some(output.as_path()));
    assert_eq!(
        second.documents[0].output.as_deref(),
        Some(dir.path().join("code_1").as_path())
    );
    assert_eq!(fs::read_to_string(output.join("project/a.py")).unwrap(), "edited");
}

#[test]
fn test_one_location_per_document() {
    let dir = TempDir::new().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    write_doc(&docs, "one.md", TRANSCRIPT);
    write_doc(&docs, "two.md", TRANSCRIPT);
    write_doc(&docs, "notes.txt", TRANSCRIPT);
    let output = dir.path().join("code");

    let report = Unfold::new()
        .with_output(&output)
        .with_sink(Arc::new(NullSink))
        .run(&docs)
        .unwrap();

    assert_eq!(report.stats.documents_scanned, 2);
    let outputs = report.outputs();
    assert_eq!(outputs.len(), 2);
    assert_ne!(outputs[0], outputs[1]);
    assert!(dir.path().join("code_1/project/a.py").is_file());
}

#[test]
fn test_allocator_called_twice() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("out");
    let allocator = OutputDirectoryAllocator::new();

    let first = allocator.allocate(&base).unwrap();
    let second = allocator.allocate(&base).unwrap();

    assert_ne!(first, second);
    assert!(first.is_dir() && second.is_dir());
    assert_eq!(second, dir.path().join("out_1"));
}

#[test]
fn test_realize_idempotent() {
    let text = "project/\n├── src/\n│   └── lib.rs\n└── README.md\n";
    let block = unfold::scan_structure(text).into_result().unwrap();
    let materializer = TreeMaterializer::new(PlaceholderStyle::Marker, &NullSink);
    let tree = materializer.materialize_block(&block).unwrap();

    let dir = TempDir::new().unwrap();
    let first = materializer.realize(&tree, dir.path()).unwrap();
    let second = materializer.realize(&tree, dir.path()).unwrap();

    assert_eq!(first.directories_created, 2);
    assert_eq!(first.placeholders_written, 2);
    assert_eq!(second.directories_created, 0);
    assert_eq!(second.placeholders_written, 0);
    assert_eq!(second.existing_files, 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("project/src/lib.rs")).unwrap(),
        "// This file represents: project/src/lib.rs\n"
    );
}

#[test]
fn test_reject_unlisted_policy() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let sink = Arc::new(MemorySink::new());
    let report = Reconstructor::new(
        ReconstructOptions::new()
            .with_output_root(&output)
            .reject_unlisted(),
    )
    .unwrap()
    .with_sink(sink.clone())
    .run(&[input])
    .unwrap();

    assert_eq!(report.stats.code_blocks_written, 1);
    assert_eq!(report.stats.blocks_rejected, 1);
    assert!(!output.join("project/b/d.py").exists());
    assert!(output.join("project/b").is_dir());
    assert_eq!(
        report.documents[0].discarded[0].reason,
        DiscardReason::Unlisted {
            path: "project/b/d.py".into()
        }
    );
    assert_eq!(sink.with_severity(Severity::Warning).len(), 1);
}

#[test]
fn test_blocks_without_structure() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(
        dir.path(),
        "snippet.md",
        "## src/app.py\n```python\nprint(1)\n```\n",
    );
    let output = dir.path().join("code");

    let report = reconstructor(&output, Arc::new(MemorySink::new()))
        .run(&[input])
        .unwrap();

    assert_eq!(report.documents[0].structure, StructureStatus::NotFound);
    assert_eq!(report.stats.code_blocks_written, 1);
    assert_eq!(fs::read_to_string(output.join("src/app.py")).unwrap(), "print(1)");
    assert!(!output.join("project_structure.md").exists());
}

#[test]
fn test_discarded_fences_logged_once() {
    let dir = TempDir::new().unwrap();
    let text = "## src/a.py\n```python\na = 1\n```\n\nprose\n\n```python\norphan\n```\n\n## src/b.py\n```python\nb = 2\n";
    let input = write_doc(dir.path(), "chat.md", text);
    let output = dir.path().join("code");

    let sink = Arc::new(MemorySink::new());
    let report = reconstructor(&output, sink.clone()).run(&[input]).unwrap();

    assert_eq!(report.stats.code_blocks_written, 1);
    assert_eq!(report.stats.blocks_unresolved, 1);
    assert_eq!(report.stats.blocks_unterminated, 1);
    assert_eq!(sink.count_containing("Discarded code block"), 2);
    assert!(!output.join("src/b.py").exists());
}

#[test]
fn test_unsafe_path_never_escapes() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(
        dir.path(),
        "chat.md",
        "## ../evil/x.py\n```python\nboom\n```\n",
    );
    let output = dir.path().join("code");

    let report = reconstructor(&output, Arc::new(MemorySink::new()))
        .run(&[input])
        .unwrap();

    assert_eq!(report.stats.blocks_unsafe, 1);
    assert_eq!(report.stats.code_blocks_written, 0);
    assert!(!dir.path().join("evil").exists());
    assert!(!output.exists());
}

#[test]
fn test_decode_failure_skips_document() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("a_bad.md");
    fs::write(&bad, [0xC3u8, 0x28, 0x80, 0x0A]).unwrap();
    let good = write_doc(dir.path(), "b_good.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let sink = Arc::new(MemorySink::new());
    let report = reconstructor(&output, sink.clone())
        .run(&[bad, good])
        .unwrap();

    assert_eq!(report.stats.decode_failures, 1);
    assert_eq!(report.stats.documents_scanned, 1);
    assert!(report.documents[0].error.is_some());
    assert!(report.documents[0].output.is_none());
    assert!(output.join("project/a.py").is_file());
    assert_eq!(sink.with_severity(Severity::Error).len(), 1);
}

#[test]
fn test_utf16_document() {
    let dir = TempDir::new().unwrap();
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "## p/a.py\n```\nx\n```\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let input = dir.path().join("wide.md");
    fs::write(&input, bytes).unwrap();
    let output = dir.path().join("code");

    let report = reconstructor(&output, Arc::new(MemorySink::new()))
        .run(&[input])
        .unwrap();

    assert_eq!(report.stats.code_blocks_written, 1);
    assert_eq!(fs::read_to_string(output.join("p/a.py")).unwrap(), "x");
}

#[test]
fn test_gbk_document() {
    let dir = TempDir::new().unwrap();
    let mut bytes = b"## p/a.py\n```python\n# ".to_vec();
    bytes.extend_from_slice(&[0xC4, 0xE3, 0xBA, 0xC3]);
    bytes.extend_from_slice(b"\n```\n");
    let input = dir.path().join("chinese.md");
    fs::write(&input, bytes).unwrap();
    let output = dir.path().join("code");

    let report = reconstructor(&output, Arc::new(MemorySink::new()))
        .run(&[input])
        .unwrap();

    assert_eq!(report.stats.decode_failures, 0);
    assert_eq!(report.stats.documents_scanned, 1);
    assert_eq!(report.documents[0].encoding, Some(unfold::TextEncoding::Gbk));
    assert_eq!(fs::read_to_string(output.join("p/a.py")).unwrap(), "# 你好");
}

/// Cancels the run as soon as the output location is announced.
struct CancelOnWrite(CancelToken);

impl LogSink for CancelOnWrite {
    fn log(&self, message: &str, _severity: Severity, _important: bool) {
        if message.starts_with("Writing ") {
            self.0.cancel();
        }
    }
}

#[test]
fn test_cancel_before_blocks_keeps_placeholders() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let token = CancelToken::new();
    let report = Reconstructor::new(ReconstructOptions::new().with_output_root(&output))
        .unwrap()
        .with_sink(Arc::new(CancelOnWrite(token.clone())))
        .with_cancel_token(token)
        .run(&[input])
        .unwrap();

    assert!(report.stats.cancelled);
    assert_eq!(report.stats.code_blocks_written, 0);
    assert_eq!(report.stats.placeholders_written, 2);
    assert_eq!(fs::read_to_string(output.join("project/a.py")).unwrap(), "");
    assert!(output.join("project/c.py").is_file());
    assert!(!output.join("project/b/d.py").exists());
}

#[test]
fn test_output_allocation_failure_aborts() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let err = reconstructor(&blocker.join("code"), Arc::new(MemorySink::new()))
        .run(&[input])
        .unwrap_err();

    assert!(matches!(err, Error::OutputAllocation { .. }));
    assert!(err.is_fatal());
}

#[cfg(feature = "async")]
#[tokio::test]
async fn test_run_async() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let report = reconstructor(&output, Arc::new(MemorySink::new()))
        .run_async(vec![input])
        .await
        .unwrap();

    assert_eq!(report.stats.code_blocks_written, 2);
    assert_eq!(fs::read_to_string(output.join("project/a.py")).unwrap(), "print(\"a\")");
    assert_eq!(fs::read_to_string(output.join("project/c.py")).unwrap(), "");
}

struct CancelAtLine(usize);

impl StepObserver for CancelAtLine {
    fn on_step(&mut self, step: &StepView<'_>) -> StepControl {
        if step.line >= self.0 {
            StepControl::Cancel
        } else {
            StepControl::Continue
        }
    }
}

#[test]
fn test_observer_cancel_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let first = write_doc(dir.path(), "a.md", TRANSCRIPT);
    let second = write_doc(dir.path(), "b.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let sink = Arc::new(MemorySink::new());
    let report = reconstructor(&output, sink.clone())
        .run_with_observer(&[first, second], &mut CancelAtLine(8))
        .unwrap();

    assert!(report.stats.cancelled);
    assert_eq!(report.documents.len(), 1);
    assert!(report.documents[0].output.is_none());
    assert!(!output.exists());
    assert_eq!(sink.count_containing("Stepping cancelled at line 9"), 1);
}

#[test]
fn test_observer_sees_every_line() {
    struct Recorder(Vec<usize>, usize);

    impl StepObserver for Recorder {
        fn on_step(&mut self, step: &StepView<'_>) -> StepControl {
            self.0.push(step.line);
            if step.emitted.is_some() {
                self.1 += 1;
            }
            StepControl::Continue
        }
    }

    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", "## p/a.py\n```\nx\n```");
    let mut recorder = Recorder(Vec::new(), 0);

    reconstructor(&dir.path().join("code"), Arc::new(MemorySink::new()))
        .run_with_observer(&[input], &mut recorder)
        .unwrap();

    assert_eq!(recorder.0, vec![0, 1, 2, 3, 4]);
    assert_eq!(recorder.1, 1);
}

#[test]
fn test_cancel_token_before_run() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let output = dir.path().join("code");

    let token = CancelToken::new();
    token.cancel();
    let report = reconstructor(&output, Arc::new(MemorySink::new()))
        .with_cancel_token(token)
        .run(&[input])
        .unwrap();

    assert!(report.stats.cancelled);
    assert!(report.documents.is_empty());
    assert!(!output.exists());
}

#[test]
fn test_progress_events() {
    use std::sync::Mutex;

    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();

    reconstructor(&dir.path().join("code"), Arc::new(MemorySink::new()))
        .with_progress(move |event| recorded.lock().unwrap().push(event.clone()))
        .run(&[&input])
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0], ProgressEvent::RunStarted { total: 1 });
    assert!(matches!(
        events[2],
        ProgressEvent::DocumentFinished {
            blocks_written: 2,
            ..
        }
    ));
    assert_eq!(events[3], ProgressEvent::RunFinished { cancelled: false });
}

#[test]
fn test_config_file_drives_run() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.txt", TRANSCRIPT);
    let output = dir.path().join("rebuilt");
    let config = dir.path().join("unfold.json");
    fs::write(
        &config,
        serde_json::json!({
            "file_types": ["txt"],
            "output_root": output,
            "placeholder": "marker",
        })
        .to_string(),
    )
    .unwrap();

    let options = ReconstructOptions::from_json_file(&config).unwrap();
    let report = Reconstructor::new(options)
        .unwrap()
        .with_sink(Arc::new(NullSink))
        .run_dir(dir.path())
        .unwrap();

    assert_eq!(report.stats.documents_scanned, 1);
    assert_eq!(
        fs::read_to_string(output.join("project/c.py")).unwrap(),
        "# This file represents: project/c.py\n"
    );
    assert!(input.exists());
}

#[test]
fn test_report_json() {
    let dir = TempDir::new().unwrap();
    let input = write_doc(dir.path(), "chat.md", TRANSCRIPT);
    let report = reconstructor(&dir.path().join("code"), Arc::new(MemorySink::new()))
        .run(&[input])
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(value["stats"]["code_blocks_written"], 2);
    assert_eq!(value["documents"][0]["structure"]["root"], "project");
}
