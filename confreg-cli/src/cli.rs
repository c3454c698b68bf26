//! CLI structure and command definitions.
//!
//! This module defines the main CLI structure using clap's derive macros,
//! including global options and subcommands.

use crate::commands::{CheckCommand, GetCommand, ListCommand, SetCommand};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line tool for inspecting and changing node configuration.
#[derive(Parser)]
#[command(name = "confreg")]
#[command(version, about = "Inspect and change warehouse node configuration", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Override file location
    #[arg(long, value_name = "PATH", global = true, env = "CONFREG_CONF")]
    pub conf: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Command {
    /// Validate the override file against the setting catalog
    Check(CheckCommand),

    /// List every setting with its resolved value and provenance
    List(ListCommand),

    /// Print the resolved value of one setting
    Get(GetCommand),

    /// Change a runtime-mutable setting and persist it
    Set(SetCommand),
}
