//! multidoc command-line entry point.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use multidoc_rs::cli::{Cli, execute};
use multidoc_rs::error::{CommandError, Error};
use tracing_subscriber::EnvFilter;

/// Exit code for a run that started but did not reach an answer.
const RUN_FAILED: u8 = 2;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,multidoc_rs=debug"
    } else {
        "warn"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(output) => {
            std::io::stdout()
                .write_all(output.as_bytes())
                .context("failed to write output")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::Command(CommandError::RunFailed(report))) => {
            writeln!(std::io::stdout(), "{report}").context("failed to write output")?;
            Ok(ExitCode::from(RUN_FAILED))
        }
        Err(e) => Err(e.into()),
    }
}
