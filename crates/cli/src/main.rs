//! `heapvis`: decode a heap-snapshot record stream and print its type graph.
//!
//! Input is the record stream produced by an upstream tokenizer, one JSON
//! record per line (see `heapvis_graph::Record`). Output is JSON on stdout;
//! logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use heapvis_graph::{DecoderConfig, FieldCountPolicy, HeapSnapshot, RecordDispatcher};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

mod input;
mod report;

use input::RecordReader;

#[derive(Parser)]
#[command(name = "heapvis")]
#[command(about = "Object and type graphs from heap-snapshot records", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Decoder configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep going when instance values disagree with class metadata
    #[arg(long, global = true)]
    lenient: bool,

    /// Placeholder for names missing from the stream
    #[arg(long, global = true)]
    unknown_name: Option<String>,

    /// Drop edges to objects that were never dumped instead of adding placeholders
    #[arg(long, global = true)]
    drop_dangling: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the type graph (objects merged by type chain)
    Summarize(OutputArgs),

    /// Print the full object graph
    Graph(OutputArgs),

    /// Print decode and graph statistics
    Stats(OutputArgs),
}

#[derive(Args)]
struct OutputArgs {
    /// Record stream (JSON Lines), `-` for stdin
    input: PathBuf,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = decoder_config(&cli)?;

    match &cli.command {
        Commands::Summarize(args) => {
            let snapshot = run_decode(&args.input, config)?;
            let condensed = snapshot.summarize();
            write_json(args, &report::type_graph_report(&snapshot, &condensed))
        }
        Commands::Graph(args) => {
            let snapshot = run_decode(&args.input, config)?;
            write_json(args, &report::object_graph_report(&snapshot))
        }
        Commands::Stats(args) => {
            let snapshot = run_decode(&args.input, config)?;
            let condensed = snapshot.summarize();
            write_json(args, &report::stats_report(&snapshot, &condensed))
        }
    }
}

/// File settings first, then command line overrides
fn decoder_config(cli: &Cli) -> Result<DecoderConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DecoderConfig::default(),
    };
    if cli.lenient {
        config.field_count_policy = FieldCountPolicy::BestEffort;
    }
    if let Some(name) = &cli.unknown_name {
        config.unknown_name = name.clone();
    }
    if cli.drop_dangling {
        config.materialize_dangling = false;
    }
    config.validate().context("Invalid decoder configuration")?;
    Ok(config)
}

fn load_config(path: &Path) -> Result<DecoderConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
}

fn run_decode(input: &Path, config: DecoderConfig) -> Result<HeapSnapshot> {
    let mut dispatcher = RecordDispatcher::new(config)?;
    for (index, record) in RecordReader::open(input)?.enumerate() {
        let record = record?;
        dispatcher
            .handle(&record)
            .with_context(|| format!("Decode aborted at record #{index} ({})", record.kind()))?;
    }
    let snapshot = dispatcher.finish();
    log::info!(
        "Decoded {} records from {}",
        snapshot.stats.records,
        input.display()
    );
    Ok(snapshot)
}

fn write_json<T: serde::Serialize>(args: &OutputArgs, value: &T) -> Result<()> {
    let mut body = if args.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    body.push('\n');

    match &args.output {
        Some(path) => fs::write(path, body)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(body.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
