//! regkit - component registry installer
//!
//! Resolves a component and its registry dependencies, renders template
//! variables and installs the files into a project.

use clap::Parser;
use console::Style;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use regkit::error::{RegkitError, Result};

/// Log to stderr; `REGKIT_LOG` overrides the level picked from `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("REGKIT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Plan(args) => commands::plan::run(&commands::Context::from_cli(cli)?, args),
        Commands::Install(args) => commands::install::run(&commands::Context::from_cli(cli)?, args),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

fn report_error(e: &RegkitError) {
    eprintln!("{} {e}", Style::new().red().bold().apply_to("Error:"));
    if let Some(help) = e.help() {
        eprintln!("  {} {help}", Style::new().cyan().apply_to("help:"));
    }
    if e.is_resolution_error() {
        eprintln!("  No files were written.");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        report_error(&e);
        std::process::exit(1);
    }
}
