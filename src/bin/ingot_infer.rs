//! ingot-infer: Infer a unified columnar schema from JSON lines
//!
//! Samples documents, merges their types and prints the resulting schema
//! as JSON, including any columns left unresolved.
//!
//! Usage:
//!   # Read from file, output to stdout
//!   ingot-infer events.jsonl
//!
//!   # Read from stdin, sample the first 500 documents
//!   cat events.jsonl | ingot-infer --max-count 500
//!
//!   # Recognize dates and timestamps, compact output
//!   ingot-infer --infer-time-units --compact events.jsonl

use anyhow::{Context, Result};
use clap::Parser;
use ingot::{schema_from_reader, Config, ConflictPolicy};
use std::fs::File;
use std::io::{stdin, BufRead, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ingot-infer")]
#[command(about = "Infer a unified columnar schema from JSON documents", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Maximum number of documents to sample
    #[arg(long)]
    max_count: Option<usize>,

    /// Recognize date, time and timestamp strings
    #[arg(long)]
    infer_time_units: bool,

    /// Widen conflicting columns (integer to float, temporal to string)
    #[arg(long)]
    type_conversion: bool,

    /// Resolve quoted/unquoted clashes to string
    #[arg(long)]
    quoted_values_are_strings: bool,

    /// Skip documents that do not fit the schema instead of failing
    #[arg(long)]
    skip_conflicts: bool,

    /// Document delimiter (a single byte, default newline)
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    /// Compact output (no pretty-printing)
    #[arg(long)]
    compact: bool,
}

fn parse_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s.as_bytes() {
        [b] => Ok(*b),
        _ if s == "\\t" => Ok(b'\t'),
        _ => Err(format!("delimiter must be a single byte, got {:?}", s)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config {
        infer_time_units: args.infer_time_units,
        type_conversion: args.type_conversion,
        quoted_values_are_strings: args.quoted_values_are_strings,
        max_count: args.max_count,
        delimiter: args.delimiter.unwrap_or(b'\n'),
        conflict_policy: if args.skip_conflicts {
            ConflictPolicy::SkipDocument
        } else {
            ConflictPolicy::FailFast
        },
        ..Config::default()
    };

    // Create reader based on input source
    let reader: Box<dyn BufRead> = if let Some(file_path) = &args.input {
        let file = File::open(file_path).with_context(|| format!("Failed to open {}", file_path))?;
        Box::new(BufReader::new(file))
    } else {
        Box::new(BufReader::new(stdin()))
    };

    let (schema, count) = schema_from_reader(reader, &config).context("Schema inference failed")?;
    tracing::info!(sampled = count, "inferred schema");

    let output = if args.compact {
        serde_json::to_string(&schema)?
    } else {
        serde_json::to_string_pretty(&schema)?
    };

    println!("{}", output);

    Ok(())
}
