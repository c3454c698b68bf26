//! Get command implementation.
//!
//! This module implements the `get` command, which prints the resolved
//! value of a single setting.

use crate::error::CliError;
use crate::utils::{resolve_registry, GlobalOptions};
use clap::Args;
use confreg::LoadMode;

/// Print the resolved value of one setting.
#[derive(Args)]
pub struct GetCommand {
    /// Setting name
    pub name: String,

    /// Also show provenance and version
    #[arg(long)]
    pub detail: bool,
}

impl GetCommand {
    /// Execute the get command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let resolved = resolve_registry(global, LoadMode::Strict)?;
        let registry = resolved.registry;

        let value = registry.get(&self.name)?;
        if self.detail {
            let origin = registry.origin_of(&self.name)?;
            let version = registry.version_of(&self.name)?;
            println!("{value}\t{origin}\t{version}");
        } else {
            println!("{value}");
        }

        Ok(())
    }
}
