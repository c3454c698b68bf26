//! Main entry point for the confreg CLI.
//!
//! This is the command-line interface for the warehouse node
//! configuration registry. It provides commands for inspecting and
//! changing node settings:
//! - `check`: Validate the override file against the setting catalog
//! - `list`: List every setting with its resolved value and provenance
//! - `get`: Print the resolved value of one setting
//! - `set`: Change a runtime-mutable setting and persist it

mod cli;
mod commands;
mod error;
mod schema;
mod utils;

use clap::Parser;
use cli::Cli;
use utils::GlobalOptions;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let _level = confreg::init_logger(cli.verbose, cli.quiet);

    // Convert CLI args to GlobalOptions
    let global = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        conf: cli.conf,
    };

    // Execute the command
    let result = match cli.command {
        cli::Command::Check(cmd) => cmd.execute(&global),
        cli::Command::List(cmd) => cmd.execute(&global),
        cli::Command::Get(cmd) => cmd.execute(&global),
        cli::Command::Set(cmd) => cmd.execute(&global),
    };

    // Handle errors and set exit code
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
