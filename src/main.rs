//! Interactive page inspector for boltpage database files.
//!
//! ```bash
//! # Browse a file interactively
//! boltpage my.db
//!
//! # Run one command and exit
//! boltpage my.db -c "info 3"
//! ```

use std::{io::Write, path::PathBuf, process::ExitCode};

use boltpage::{
    inspect::commands::{CommandError, run_line},
    storage::page_reader::PageReader,
    types::{DEFAULT_PAGE_SIZE, PageSize},
};
use clap::Parser;
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const HISTORY_FILE: &str = ".boltpage_history";

/// Inspect the pages of a boltpage database file
#[derive(Parser, Debug)]
#[command(name = "boltpage", version, about)]
struct Args {
    /// Database file
    path: PathBuf,

    /// Page size the file was written with
    #[arg(short = 's', long, default_value_t = DEFAULT_PAGE_SIZE, env = "BOLTPAGE_PAGE_SIZE")]
    page_size: usize,

    /// Execute a single command and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("boltpage=debug")
    } else {
        EnvFilter::new("boltpage=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(reader: &mut PageReader, input: &str) -> Result<bool, CommandError> {
    let mut stdout = std::io::stdout().lock();
    let result = run_line(reader, input, &mut stdout);
    let _ = stdout.flush();
    if let Err(err) = &result {
        eprintln!("Error: {}", err);
    }
    result
}

fn run_repl(reader: &mut PageReader) -> rustyline::Result<()> {
    let mut rl = DefaultEditor::new()?;
    if rl.load_history(HISTORY_FILE).is_err() {
        info!("No previous history");
    }

    println!(
        "boltpage inspector: {} ({} pages). Type 'help' for commands.",
        reader.path().display(),
        reader.page_count()
    );

    loop {
        match rl.readline("boltpage> ") {
            Ok(line) => {
                let command = line.trim();
                if command.is_empty() {
                    continue;
                }
                rl.add_history_entry(command)?;
                // errors are already reported; the session continues
                if !run_command(reader, command).unwrap_or(true) {
                    println!("Goodbye!");
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("EOF");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        warn!("Could not save history: {}", err);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let page_size = match PageSize::new(args.page_size) {
        Ok(page_size) => page_size,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut reader = match PageReader::open(&args.path, page_size) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("Error: {}: {}", args.path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    if let Some(command) = &args.command {
        return match run_command(&mut reader, command) {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    match run_repl(&mut reader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}
