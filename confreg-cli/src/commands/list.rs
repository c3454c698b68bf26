//! List command implementation.
//!
//! This module implements the `list` command, which displays every
//! setting with its resolved value and provenance in table or JSON
//! format.

use crate::error::CliError;
use crate::utils::{resolve_registry, GlobalOptions};
use clap::{Args, ValueEnum};
use confreg::{LoadMode, Mutability, RiskTier};
use std::io::Write;

/// Column headers for table output.
const COLUMN_HEADERS: [&str; 7] = [
    "name",
    "value",
    "type",
    "mutability",
    "risk",
    "origin",
    "version",
];

/// List every setting with its resolved value and provenance.
#[derive(Args)]
pub struct ListCommand {
    /// Output format
    #[arg(
        long,
        value_enum,
        default_value = "table",
        env = "CONFREG_OUTPUT_FORMAT",
        ignore_case = true
    )]
    pub format: OutputFormat,

    /// Only show runtime-mutable settings
    #[arg(long)]
    pub mutable_only: bool,

    /// Only show expert-tier settings
    #[arg(long)]
    pub expert_only: bool,
}

/// Output format for list command.
#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated table format (human-readable)
    Table,
    /// JSON format
    Json,
}

impl ListCommand {
    /// Execute the list command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        // 1. Resolve the registry the way a booting node would
        let resolved = resolve_registry(global, LoadMode::Strict)?;

        // 2. Snapshot and filter
        let mut listings = resolved.registry.snapshot();
        if self.mutable_only {
            listings.retain(|l| l.mutability == Mutability::RuntimeMutable);
        }
        if self.expert_only {
            listings.retain(|l| l.risk == RiskTier::Expert);
        }

        // 3. Format and output to stdout
        match self.format {
            OutputFormat::Table => format_as_table(&listings)?,
            OutputFormat::Json => format_as_json(&listings)?,
        }

        Ok(())
    }
}

/// Format listings as a human-readable table.
fn format_as_table(listings: &[confreg::SettingListing]) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    // Print header (uppercase for table display)
    let header_line = COLUMN_HEADERS
        .iter()
        .map(|s| s.to_uppercase())
        .collect::<Vec<_>>()
        .join("\t");
    writeln!(handle, "{header_line}")?;

    // Print each setting
    for listing in listings {
        writeln!(
            handle,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            listing.name,
            listing.value,
            listing.value_type,
            listing.mutability,
            listing.risk,
            listing.origin,
            listing.version,
        )?;
    }

    Ok(())
}

/// Format listings as JSON.
fn format_as_json(listings: &[confreg::SettingListing]) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    serde_json::to_writer_pretty(&mut handle, listings)
        .map_err(|e| CliError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    writeln!(handle)?;

    Ok(())
}
