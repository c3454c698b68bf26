//! Check command implementation.
//!
//! This module implements the `check` command, which resolves the
//! override file against the catalog exactly the way a node does at
//! boot and reports the outcome.

use crate::error::CliError;
use crate::utils::{resolve_registry, GlobalOptions};
use clap::Args;
use confreg::LoadMode;

/// Validate the override file against the setting catalog.
#[derive(Args)]
pub struct CheckCommand {
    /// Report problems without failing (a node booted this way would
    /// keep the previous-stage value for each problem setting)
    #[arg(long)]
    pub lenient: bool,
}

impl CheckCommand {
    /// Execute the check command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let mode = if self.lenient {
            LoadMode::Lenient
        } else {
            LoadMode::Strict
        };

        // Strict problems surface here as StartupAborted.
        let resolved = resolve_registry(global, mode)?;

        for problem in &resolved.problems {
            log::warn!("{problem}");
        }

        if resolved.problems.is_empty() {
            println!("ok: {} settings resolved", resolved.registry.len());
        } else {
            println!(
                "ok with {} problem(s): {} settings resolved",
                resolved.problems.len(),
                resolved.registry.len()
            );
        }

        Ok(())
    }
}
