//! spiceval command-line interface.
//!
//! Reads lines from a file or standard input. `.param` lines extend the
//! parameter table; every other line is substituted, parsed and evaluated.

mod session;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spiceval_param::ExtractMode;

use crate::session::{Config, Output, Session};

#[derive(Parser)]
#[command(name = "spiceval")]
#[command(about = "Evaluate SPICE expressions with parameter substitution", long_about = None)]
#[command(version)]
struct Cli {
    /// Input file (standard input if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fail on the first malformed parameter definition
    #[arg(long)]
    strict: bool,

    /// Leave quoted expressions unevaluated during substitution
    #[arg(long)]
    no_eval: bool,

    /// Print parsed expressions instead of their values
    #[arg(short, long)]
    print: bool,

    /// Keep going after a line fails
    #[arg(short = 'k', long)]
    keep_going: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Config::from_json(&text)?
        }
        None => Config::default(),
    };
    if cli.strict {
        config.subst.mode = ExtractMode::Strict;
    }
    if cli.no_eval {
        config.subst.eager = false;
    }
    let output = if cli.print { Output::Tree } else { Output::Value };
    let mut session = Session::new(config, output);

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => {
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to read input: {}", path.display()))?;
            Box::new(io::BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        match session.process_line(&line) {
            Ok(Some(result)) => writeln!(out, "{result}")?,
            Ok(None) => {}
            Err(err) if cli.keep_going => eprintln!("line {}: {:#}", number + 1, err),
            Err(err) => return Err(err.context(format!("line {}", number + 1))),
        }
    }

    if cli.verbose {
        log::info!("{} parameters at end of input", session.table().len());
    }
    Ok(())
}
