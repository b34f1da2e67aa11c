//! unfold CLI - rebuild project trees from transcripts

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use unfold::reconstruct::{
    discover_documents, ProgressEvent, ReconstructOptions, ReconstructReport, Reconstructor,
    StepControl, StepObserver, StepView, StructureStatus, UnlistedPolicy,
};
use unfold::{
    read_document, CodeBlockParser, LineBuffer, LogCrateSink, LogSink, PlaceholderStyle,
    ScanOutcome, Severity, StructureScanner,
};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "unfold")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Rebuild project trees from transcripts and markdown reports", long_about = None)]
struct Cli {
    /// Input document or directory of documents
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output base directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    args: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every selected document in INPUT
    Run {
        /// Input document or directory of documents
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output base directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Print the structure diagram found in a document
    Scan {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        args: RunArgs,
    },

    /// List correlated code blocks and discarded fences
    Blocks {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Rebuild one document, stepping through the parser line by line
    Step {
        /// Input document
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output base directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        args: RunArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args, Clone)]
struct RunArgs {
    /// JSON configuration file
    #[arg(long, value_name = "JSON", env = "UNFOLD_CONFIG")]
    config: Option<PathBuf>,

    /// Document extensions to process (comma separated)
    #[arg(long, value_name = "EXT", value_delimiter = ',')]
    types: Vec<String>,

    /// Search subdirectories of INPUT
    #[arg(short, long)]
    recursive: bool,

    /// Lines above a fence searched for a path heading
    #[arg(long, value_name = "N")]
    lookback: Option<usize>,

    /// Opening fence marker
    #[arg(long, value_name = "MARKER")]
    start_marker: Option<String>,

    /// Closing fence marker
    #[arg(long, value_name = "MARKER")]
    end_marker: Option<String>,

    /// Content of listed files without extracted code
    #[arg(long, value_enum)]
    placeholder: Option<Placeholder>,

    /// Drop code blocks whose path is not in the diagram
    #[arg(long)]
    reject_unlisted: bool,

    /// Prefix extracted files with File/Language comment lines
    #[arg(long)]
    annotate: bool,

    /// Relax file/directory name heuristics
    #[arg(long)]
    lenient: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Only print errors and the final result
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Placeholder {
    /// Empty files
    Empty,
    /// One comment line naming the file
    Marker,
}

impl From<Placeholder> for PlaceholderStyle {
    fn from(style: Placeholder) -> Self {
        match style {
            Placeholder::Empty => PlaceholderStyle::Empty,
            Placeholder::Marker => PlaceholderStyle::Marker,
        }
    }
}

impl RunArgs {
    /// Layer command line flags over the configuration file.
    fn options(&self) -> Result<ReconstructOptions, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => ReconstructOptions::from_json_file(path)?,
            None => ReconstructOptions::default(),
        };

        if !self.types.is_empty() {
            options = options.with_file_types(self.types.iter().map(|t| t.trim().to_string()));
        }
        if self.recursive {
            options.recursive = true;
        }
        if let Some(lines) = self.lookback {
            options.parse = options.parse.with_lookback(lines);
        }
        if let Some(marker) = &self.start_marker {
            options.parse = options.parse.with_start_marker(marker.as_str());
        }
        if let Some(marker) = &self.end_marker {
            options.parse = options.parse.with_end_marker(marker.as_str());
        }
        if let Some(style) = self.placeholder {
            options.placeholder = style.into();
        }
        if self.reject_unlisted {
            options.unlisted = UnlistedPolicy::Reject;
        }
        if self.annotate {
            options.annotate = true;
        }
        if self.lenient {
            options.parse = options.parse.lenient();
        }

        options.validate()?;
        Ok(options)
    }

    fn silent(&self) -> bool {
        self.quiet || self.json
    }
}

/// Forwards to `log` and echoes important messages to the terminal.
struct TerminalSink {
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl TerminalSink {
    fn new(quiet: bool) -> Self {
        Self { quiet, bar: None }
    }

    fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.bar = Some(bar);
        self
    }
}

impl LogSink for TerminalSink {
    fn log(&self, message: &str, severity: Severity, important: bool) {
        LogCrateSink.log(message, severity, important);

        let echo = match severity {
            Severity::Error => true,
            Severity::Warning => !self.quiet,
            _ => important && !self.quiet,
        };
        if !echo {
            return;
        }

        let line = match severity {
            Severity::Error => format!("{} {}", "error:".red().bold(), message),
            Severity::Warning => format!("{} {}", "warning:".yellow(), message),
            _ => format!("{} {}", "›".green(), message),
        };
        match &self.bar {
            Some(bar) if !bar.is_hidden() => bar.println(line),
            _ => eprintln!("{}", line),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run {
            input,
            output,
            args,
        }) => cmd_run(&input, output.as_deref(), &args),
        Some(Commands::Scan { input, args }) => cmd_scan(&input, &args),
        Some(Commands::Blocks { input, args }) => cmd_blocks(&input, &args),
        Some(Commands::Step {
            input,
            output,
            args,
        }) => cmd_step(&input, output.as_deref(), &args),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: rebuild if input is provided
            if let Some(input) = cli.input {
                cmd_run(&input, cli.output.as_deref(), &cli.args)
            } else {
                println!("{}", "Usage: unfold <INPUT> [OUTPUT]".yellow());
                println!("       unfold --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_run(input: &Path, output: Option<&Path>, args: &RunArgs) -> CmdResult {
    let mut options = args.options()?;
    if let Some(path) = output {
        options.output_root = path.to_path_buf();
    }

    log::debug!("Resolved options: {:?}", options);

    let documents = discover_documents(input, &options.file_types, options.recursive)?;
    if documents.is_empty() {
        println!(
            "{} no .{} documents in {}",
            "Nothing to do:".yellow(),
            options.file_types.join(", ."),
            input.display()
        );
        return Ok(());
    }

    let pb = if args.silent() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(documents.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let sink = TerminalSink::new(args.silent()).with_progress_bar(pb.clone());
    let bar = pb.clone();
    let reconstructor = Reconstructor::new(options)?
        .with_sink(Arc::new(sink))
        .with_progress(move |event| match event {
            ProgressEvent::DocumentStarted { path, .. } => {
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                bar.set_message(name.into_owned());
            }
            ProgressEvent::DocumentFinished { .. } => bar.inc(1),
            _ => {}
        });

    let report = reconstructor.run(&documents)?;
    pb.finish_and_clear();

    print_report(&report, args.json)
}

fn print_report(report: &ReconstructReport, json: bool) -> CmdResult {
    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    let outputs = report.outputs();
    if !outputs.is_empty() {
        println!("\n{}", "Output locations:".green().bold());
        for (i, location) in outputs.iter().enumerate() {
            let branch = if i + 1 == outputs.len() { "└─" } else { "├─" };
            println!("  {} {}", branch.dimmed(), location.display());
        }
    }

    let stats = &report.stats;
    println!();
    println!("{}", "Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Documents".bold(), stats.documents_scanned);
    println!("{}: {}", "Structures".bold(), stats.structures_found);
    println!(
        "{}: {} ({} listed, {} unlisted)",
        "Files written".bold(),
        stats.code_blocks_written,
        stats.blocks_matched,
        stats.blocks_unlisted
    );
    println!("{}: {}", "Placeholders".bold(), stats.placeholders_written);
    if stats.blocks_discarded() > 0 {
        println!(
            "{}: {} (unresolved {}, unterminated {}, unsafe {}, rejected {})",
            "Discarded".yellow().bold(),
            stats.blocks_discarded(),
            stats.blocks_unresolved,
            stats.blocks_unterminated,
            stats.blocks_unsafe,
            stats.blocks_rejected
        );
    }
    if stats.decode_failures > 0 || stats.write_failures > 0 {
        println!(
            "{}: {} unreadable, {} failed writes",
            "Failures".red().bold(),
            stats.decode_failures,
            stats.write_failures
        );
    }
    if stats.cancelled {
        println!("{}", "Run cancelled".yellow().bold());
    }

    let elapsed = report.duration().num_milliseconds();
    println!("\n{} in {} ms", "Done!".green().bold(), elapsed);
    Ok(())
}

fn cmd_scan(input: &Path, args: &RunArgs) -> CmdResult {
    let options = args.options()?;
    let (text, _) = read_document(input, &options.encodings)?;
    let sink = TerminalSink::new(args.silent());

    let block = match StructureScanner::new(&options.parse, &sink).scan(&LineBuffer::new(&text)) {
        ScanOutcome::Found(block) => block,
        ScanOutcome::NotFound => {
            if args.json {
                println!("null");
            } else {
                println!("{}", "No structure diagram found".yellow());
            }
            return Ok(());
        }
        ScanOutcome::Invalid { line, reason } => {
            return Err(unfold::Error::StructureInvalid { line, reason }.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&block)?);
        return Ok(());
    }

    println!("{}", "Structure".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: lines {}-{}",
        "Location".bold(),
        block.start_line + 1,
        block.end_line + 1
    );
    println!(
        "{}: {} directories, {} files",
        "Entries".bold(),
        block.directory_count(),
        block.file_count()
    );
    println!();
    for entry in &block.entries {
        let indent = "  ".repeat(entry.level);
        let name = if entry.is_directory {
            format!("{}/", entry.name).blue().bold().to_string()
        } else {
            entry.name.clone()
        };
        println!("{} {}{}", format!("{:>2}", entry.level).dimmed(), indent, name);
    }
    Ok(())
}

fn cmd_blocks(input: &Path, args: &RunArgs) -> CmdResult {
    let options = args.options()?;
    let (text, _) = read_document(input, &options.encodings)?;
    let sink = TerminalSink::new(args.silent());

    let mut parser = CodeBlockParser::new(text, &options.parse, &sink)?;
    parser.run_to_completion();
    let (blocks, discards) = parser.into_parts();

    if args.json {
        let value = serde_json::json!({
            "blocks": blocks,
            "discarded": discards,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Code blocks".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for block in &blocks {
        let language = if block.language.is_empty() {
            "-"
        } else {
            block.language.as_str()
        };
        println!(
            "{} {} {}",
            format!("{:>5}", block.start_line + 1).dimmed(),
            block.path.green(),
            format!("({}, {} lines)", language, block.line_count()).dimmed()
        );
    }

    if !discards.is_empty() {
        println!();
        println!("{}", "Discarded".yellow().bold());
        println!("{}", "─".repeat(40).dimmed());
        for discard in &discards {
            println!(
                "{} {} {}",
                format!("{:>5}", discard.line + 1).dimmed(),
                discard.reason.label().yellow(),
                discard.reason
            );
        }
    }

    println!(
        "\n{} {} blocks, {} discarded",
        "Done!".green().bold(),
        blocks.len(),
        discards.len()
    );
    Ok(())
}

/// Pauses after every parser step until the user answers.
struct InteractiveStepper {
    continuing: bool,
}

impl StepObserver for InteractiveStepper {
    fn on_step(&mut self, step: &StepView<'_>) -> StepControl {
        if let Some(block) = step.emitted {
            println!(
                "      {} {} ({} lines)",
                "→".green(),
                block.path.green().bold(),
                block.line_count()
            );
        }
        if self.continuing {
            return StepControl::Continue;
        }

        println!(
            "{} {} {}",
            format!("{:>5}/{}", step.line + 1, step.line_count).dimmed(),
            format!("{:<8}", format!("{:?}", step.state)).cyan(),
            step.text.unwrap_or("")
        );
        print!("{}", "[Enter] step  [c] continue  [q] quit > ".dimmed());
        // A failed flush only affects the prompt
        let _ = io::stdout().flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => {
                self.continuing = true;
                StepControl::Continue
            }
            Ok(_) => match answer.trim() {
                "q" | "Q" => StepControl::Cancel,
                "c" | "C" => {
                    self.continuing = true;
                    StepControl::Continue
                }
                _ => StepControl::Continue,
            },
        }
    }
}

fn cmd_step(input: &Path, output: Option<&Path>, args: &RunArgs) -> CmdResult {
    let mut options = args.options()?;
    if let Some(path) = output {
        options.output_root = path.to_path_buf();
    }
    if !input.is_file() {
        return Err(format!("{} is not a file", input.display()).into());
    }

    let reconstructor =
        Reconstructor::new(options)?.with_sink(Arc::new(TerminalSink::new(args.quiet)));
    let mut stepper = InteractiveStepper { continuing: false };
    let report = reconstructor.run_with_observer(&[input], &mut stepper)?;

    if let Some(outcome) = report.documents.first() {
        if let StructureStatus::Invalid { line, reason } = &outcome.structure {
            println!(
                "{} structure rejected at line {}: {}",
                "warning:".yellow(),
                line,
                reason
            );
        }
    }
    print_report(&report, args.json)
}

fn cmd_version() {
    println!("{} {}", "unfold".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Project tree reconstruction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/unfold".dimmed());
    println!("License: MIT");
}
