//! Command implementations

mod config;
mod extract;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub fn execute(cli: &Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match &cli.command {
        Commands::Extract(args) => extract::execute(cli, args, &output),
        Commands::Config => config::execute(cli, &output),
    }
}
