//! sheetcalc - Spreadsheet Formula Calculator
//!
//! Command-line driver that evaluates a single formula or applies a whole CSV
//! grid of inputs, cell by cell, and writes out the resulting values.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sheetcalc::application::{ReportStatus, Worksheet};
use sheetcalc::domain::{CellId, FormulaEvaluator};
use sheetcalc::infrastructure::GridRepository;

#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(author, version, about = "Spreadsheet formula calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one formula and print the result
    Eval {
        /// Formula to evaluate; the leading '=' is optional
        formula: String,

        /// Cell contents available to the formula, as ID=VALUE (repeatable)
        #[arg(short, long = "cell", value_parser = parse_cell_assignment)]
        cells: Vec<(CellId, String)>,
    },

    /// Apply a CSV grid of inputs in row-major order and write the resulting values
    Sheet {
        /// Input CSV grid: row 1 is the first record, column A the first field
        input: PathBuf,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON report of every applied input to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval { formula, cells } => eval(&formula, cells),
        Commands::Sheet {
            input,
            output,
            report,
        } => sheet(&input, output.as_deref(), report.as_deref()),
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn parse_cell_assignment(arg: &str) -> Result<(CellId, String), String> {
    let (id, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{}'", arg))?;
    let id = id.trim().parse::<CellId>().map_err(|err| err.to_string())?;
    Ok((id, value.to_string()))
}

fn eval(formula: &str, cells: Vec<(CellId, String)>) -> Result<()> {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();
    let expression = compact.strip_prefix('=').unwrap_or(&compact);

    let lookup: HashMap<CellId, String> = cells.into_iter().collect();
    let result = FormulaEvaluator::new(&lookup)
        .evaluate(expression)
        .with_context(|| format!("failed to evaluate '{}'", formula))?;

    println!("{}", result);
    Ok(())
}

fn sheet(
    input: &std::path::Path,
    output: Option<&std::path::Path>,
    report: Option<&std::path::Path>,
) -> Result<()> {
    let inputs = GridRepository::load_inputs(input)
        .with_context(|| format!("failed to read grid from {}", input.display()))?;

    let mut worksheet = Worksheet::new();
    let reports = worksheet.apply_inputs(inputs);

    match output {
        Some(path) => GridRepository::save_values(&worksheet, path)
            .with_context(|| format!("failed to write values to {}", path.display()))?,
        None => GridRepository::write_values(&worksheet, io::stdout().lock())
            .context("failed to write values to stdout")?,
    }

    if let Some(path) = report {
        GridRepository::save_report(&reports, path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    let rejected: Vec<String> = reports
        .iter()
        .filter(|report| report.status == ReportStatus::Rejected)
        .map(|report| format!("{}: {}", report.cell, report.error.as_deref().unwrap_or("rejected")))
        .collect();
    if !rejected.is_empty() {
        bail!("{} input(s) rejected:\n{}", rejected.len(), rejected.join("\n"));
    }

    Ok(())
}
