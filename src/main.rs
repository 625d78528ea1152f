//! Batch compositor driver: reads a sparkle script from standard input
//! and runs it against a fresh VM instance.

use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

/// Batch 2-D raster compositor driven by a stack-oriented script language.
///
/// The script is read from standard input; diagnostics go to standard
/// error. The exit code is zero only when the whole script ran.
#[derive(Parser)]
#[command(name = "sparkle")]
#[command(version)]
#[command(about = "Batch 2-D raster compositor", long_about = None)]
struct Cli {}

fn main() -> ExitCode {
	// Initialize logger with default level set to info if RUST_LOG is not set
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

	let Cli {} = Cli::parse();

	match run() {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			log::error!("{err:#}");
			ExitCode::FAILURE
		}
	}
}

fn run() -> anyhow::Result<()> {
	let mut script = String::new();
	std::io::stdin()
		.read_to_string(&mut script)
		.context("failed to read script from standard input")?;

	sparkle_vm::Interpreter::new()
		.run("stdin", &script)
		.map(|_| ())
		.context("script failed")?;
	Ok(())
}
