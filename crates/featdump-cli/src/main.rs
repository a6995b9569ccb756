//! featdump CLI - Command-line interface
//!
//! Extracts every feature of a WMS/WFS layer into a GeoJSON Lines file,
//! resuming interrupted runs from the side-car state file.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod progress;

use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match commands::execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.downcast_ref::<errors::Reported>().is_none() {
                let service = match &cli.command {
                    Commands::Extract(args) => args.service.as_str(),
                    Commands::Config => "",
                };
                errors::from_anyhow(&err, service).display();
            }
            ExitCode::FAILURE
        }
    }
}
