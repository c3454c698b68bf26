//! Set command implementation.
//!
//! This module implements the `set` command, which runs a value through
//! the full mutation pipeline (mutability, coercion, validation) and
//! persists it into the override file so the node's next boot resolves
//! to it.

use crate::error::CliError;
use crate::utils::{require_conf, resolve_registry, GlobalOptions};
use clap::Args;
use confreg::{LoadMode, MutationGateway, MutationRequest, Persister, RiskTier};
use std::sync::Arc;

/// Change a runtime-mutable setting and persist it.
#[derive(Args)]
pub struct SetCommand {
    /// Setting name
    pub name: String,

    /// New value, in text form
    pub value: String,

    /// Allow changing expert-tier settings
    #[arg(long)]
    pub allow_expert: bool,
}

impl SetCommand {
    /// Execute the set command.
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        // 1. Writing requires a file to write to
        let conf = require_conf(global)?;

        // 2. Resolve current state
        let resolved = resolve_registry(global, LoadMode::Strict)?;
        let registry = Arc::new(resolved.registry);

        // 3. Expert-tier settings need explicit acknowledgement
        let descriptor = registry.describe(&self.name)?;
        if descriptor.risk() == RiskTier::Expert && !self.allow_expert {
            return Err(CliError::InvalidArguments(format!(
                "'{}' is an expert-tier setting; pass --allow-expert to change it",
                self.name
            )));
        }

        // 4. Run the full pipeline with persistence
        let gateway =
            MutationGateway::new(registry).with_persister(Arc::new(Persister::new(conf)));
        let applied = gateway.mutate(MutationRequest::local_persistent(
            &self.name, &self.value,
        ))?;

        // The in-memory apply succeeded, but `set` promises a durable
        // change; a persistence failure is a command failure, not a
        // footnote.
        let mut warnings = applied.warnings.into_iter();
        if let Some(problem) = warnings.next() {
            for warning in warnings {
                log::warn!("{warning}");
            }
            return Err(CliError::Library(problem));
        }

        println!("{} = {} (version {})", self.name, self.value, applied.version);

        Ok(())
    }
}
