//! `cbcc` - command-line driver for the compiler.
//!
//! Sequences the library crates (lex -> parse/emit -> link, all inside
//! `cbc_par::compile`) and turns the result into a process exit code. It
//! owns no compiler logic of its own.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compiles a source file into linked bytecode.
#[derive(Parser, Debug)]
#[command(name = "cbcc")]
#[command(author = "Fax Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiles a source file into linked bytecode", long_about = None)]
struct Cli {
    /// Path to the source file to compile.
    input: PathBuf,

    /// Path to write the linked bytecode to.
    output: PathBuf,

    /// Raise log verbosity to trace the token stream and top-level
    /// fragment length.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();
}

/// Formats a [`cbc_util::CompileError`] as `error: {message}`, with an
/// optional ` (line {line})` suffix, matching the diagnostic shape the
/// driver is specified to print.
fn format_error(err: &cbc_util::CompileError) -> String {
    err.to_diagnostic().to_string()
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let source = fs::read_to_string(&cli.input)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", cli.input.display()))?;

    tracing::debug!(bytes = source.len(), "read source file");

    let bytecode = cbc_par::compile(&source).map_err(|e| anyhow::anyhow!(format_error(&e)))?;

    tracing::debug!(bytes = bytecode.len(), "compiled to linked bytecode");

    // Write only after the entire pipeline has succeeded: no partial
    // output on failure.
    fs::write(&cli.output, &bytecode)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", cli.output.display()))?;

    Ok(())
}
