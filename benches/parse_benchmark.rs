//! Benchmarks for unfold scanning and extraction performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks use synthetic transcripts with a tree diagram followed
//! by one fenced block per listed file.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use unfold::parser::{CodeBlockParser, ParseOptions, StructureScanner};
use unfold::{LineBuffer, NullSink};

/// Creates a transcript describing `file_count` files spread over a few directories.
fn create_transcript(file_count: usize) -> String {
    let mut text = String::from("Here is the proposed layout.\n\nproject/\n");

    let dirs = ["core", "io", "util"];
    let per_dir = file_count / dirs.len();
    for dir in &dirs {
        text.push_str(&format!("├── {}/\n", dir));
        for i in 0..per_dir {
            let branch = if i + 1 == per_dir { "└──" } else { "├──" };
            text.push_str(&format!("│   {} mod_{}.rs\n", branch, i));
        }
    }
    text.push_str("└── Cargo.toml\n\n");

    // One block per file, with some prose between them
    for dir in &dirs {
        for i in 0..per_dir {
            text.push_str(&format!(
                "The {} module needs a helper.\n\n## project/{}/mod_{}.rs\n```rust\n",
                dir, dir, i
            ));
            for line in 0..20 {
                text.push_str(&format!("pub fn f_{}_{}() -> usize {{ {} }}\n", i, line, line));
            }
            text.push_str("```\n\n");
        }
    }

    text
}

/// Benchmark structure scanning at various sizes.
fn bench_structure_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("structure_scan");
    let options = ParseOptions::default();

    for file_count in [6, 60, 300].iter() {
        let buffer = LineBuffer::new(&create_transcript(*file_count));

        group.bench_function(format!("{}_files", file_count), |b| {
            b.iter(|| {
                let outcome = StructureScanner::new(&options, &NullSink).scan(black_box(&buffer));
                black_box(outcome.found().is_some())
            });
        });
    }

    group.finish();
}

/// Benchmark code block extraction at various sizes.
fn bench_code_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("code_blocks");
    let options = ParseOptions::default();

    for file_count in [6, 60, 300].iter() {
        let text = create_transcript(*file_count);

        group.bench_function(format!("{}_files", file_count), |b| {
            b.iter(|| {
                let parser = CodeBlockParser::new(black_box(text.as_str()), &options, &NullSink)
                    .expect("valid options");
                parser.count()
            });
        });
    }

    group.finish();
}

/// Benchmark buffer construction.
fn bench_line_buffer(c: &mut Criterion) {
    let text = create_transcript(300);

    c.bench_function("line_buffer_300_files", |b| {
        b.iter(|| LineBuffer::new(black_box(&text)).len());
    });
}

criterion_group!(
    benches,
    bench_structure_scan,
    bench_code_blocks,
    bench_line_buffer,
);
criterion_main!(benches);
