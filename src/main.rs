use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, Subcommand};
use payroll_unifier::period::Period;
use payroll_unifier::reconcile::DEFAULT_TOLERANCE;
use payroll_unifier::run::{self, RunOptions, DEFAULT_WORKERS};
use payroll_unifier::source::{FolderSource, OutboxSink};
use payroll_unifier::{Result, UnifierError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    match cli.command {
        Command::Unify(args) => execute_unify(args),
    }
}

fn execute_unify(args: UnifyArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(UnifierError::MissingInput(args.input));
    }

    let today = Local::now().date_naive();
    let period = match &args.period {
        Some(raw) => Period::parse(raw)?,
        None => Period::previous_month(today),
    };
    let year = args.year.unwrap_or_else(|| period.year_for(today));

    let source = FolderSource::new(&args.input);
    let sink = OutboxSink::new(&args.output);
    let options = RunOptions {
        period,
        year,
        output_dir: args.output,
        consolidated: args.consolidated,
        tolerance: args.tolerance,
        workers: args.workers,
    };

    let summary = run::run(&source, &sink, &options)?;
    println!(
        "{} records across {} extract(s) from {} spreadsheet(s)",
        summary.total_records,
        summary.generated.len(),
        summary.spreadsheets
    );
    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| UnifierError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Unify monthly payroll contribution spreadsheets into per-period extracts."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, classify, and reconcile one settlement period.
    Unify(UnifyArgs),
}

#[derive(clap::Args)]
struct UnifyArgs {
    /// Directory holding the source spreadsheets.
    #[arg(long)]
    input: PathBuf,

    /// Directory the extracts and the summary are written to.
    #[arg(long)]
    output: PathBuf,

    /// Settlement month as a two-digit number; defaults to the month
    /// before the current one.
    #[arg(long)]
    period: Option<String>,

    /// Settlement year; defaults to the year the period belongs to.
    #[arg(long)]
    year: Option<i32>,

    /// Consolidated CSV the new records are appended to.
    #[arg(long)]
    consolidated: Option<PathBuf>,

    /// Divergence above this amount marks a period inconsistent.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Extraction worker threads.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}
