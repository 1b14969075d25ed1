use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tsil::sink::ResultSink;
use tsil::{Config, RunReport, Tsil};

const EXIT_STATIC_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;
const EXIT_INTERRUPTED: i32 = 130;

/// Run TSIL scripts, or start an interactive session when no script is given.
#[derive(Parser, Debug)]
#[command(name = "tsil", version)]
struct Cli {
    /// Script to run in batch mode
    script: Option<PathBuf>,

    /// File overwritten with the answer to every ASK
    #[arg(short, long, default_value = tsil::config::DEFAULT_RESULT_PATH)]
    output: PathBuf,

    /// Maximum rule-expansion depth for a single proof
    #[arg(long, default_value_t = tsil::knowledge_base::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log filter, e.g. "debug" or "tsil::knowledge_base=trace" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = Config::default()
        .with_result_path(cli.output)
        .with_max_depth(cli.max_depth);
    let mut tsil = Tsil::new(&config);

    match cli.script {
        Some(path) => run_file(&mut tsil, &path),
        None => run_prompt(&mut tsil),
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_file(tsil: &mut Tsil, path: &Path) -> Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    let report = tsil.run(&source);
    show(&report, &mut io::stdout().lock())?;
    Ok(ExitCode::from(exit_status(&report)))
}

/// Static errors win over a runtime abort: the valid statements still ran, but the script was
/// malformed.
fn exit_status(report: &RunReport) -> u8 {
    if report.had_static_error() {
        EXIT_STATIC_ERROR
    } else if report.had_runtime_error() {
        EXIT_RUNTIME_ERROR
    } else {
        0
    }
}

fn run_prompt(tsil: &mut Tsil) -> Result<ExitCode> {
    ctrlc::set_handler(|| {
        println!();
        std::process::exit(EXIT_INTERRUPTED);
    })
    .context("could not install Ctrl-C handler")?;

    repl(tsil, io::stdin().lock(), &mut io::stdout())?;
    Ok(ExitCode::SUCCESS)
}

/// Reads one line at a time until an empty line or end of input. Errors only end the current
/// line.
fn repl<S: ResultSink>(
    tsil: &mut Tsil<S>,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 || line.trim().is_empty() {
            return Ok(());
        }
        show(&tsil.run(&line), out)?;
    }
}

fn show(report: &RunReport, out: &mut impl Write) -> io::Result<()> {
    for error in &report.static_errors {
        eprintln!("{error}");
    }
    for line in report.console_lines() {
        writeln!(out, "{line}")?;
    }
    if let Some(error) = &report.runtime_error {
        eprintln!("{error}");
    }
    Ok(())
}
