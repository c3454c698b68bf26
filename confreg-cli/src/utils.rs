//! Utility functions for CLI operations.
//!
//! This module provides the shared plumbing CLI commands build on:
//! global options, schema construction and start-up resolution against
//! the configured override file.

use crate::error::CliError;
use crate::schema::node_schema;
use confreg::{LoadMode, OverrideLoader, Resolved};
use std::path::PathBuf;

/// Global CLI options shared across all commands.
#[derive(Debug, Clone)]
#[allow(dead_code)] // Verbosity fields are consumed by the logger in main.rs
pub struct GlobalOptions {
    /// Enable verbose output.
    pub verbose: bool,

    /// Suppress non-essential output.
    pub quiet: bool,

    /// Override file location.
    pub conf: Option<PathBuf>,
}

/// Resolve the registry from the catalog, the process environment and
/// the configured override file.
///
/// With no `--conf`, resolution runs against defaults and environment
/// interpolation only.
pub fn resolve_registry(global: &GlobalOptions, mode: LoadMode) -> Result<Resolved, CliError> {
    let schema = node_schema();
    let loader = OverrideLoader::new(&schema).with_mode(mode);

    let resolved = match &global.conf {
        Some(path) => loader.resolve_path(path)?,
        None => loader.resolve(None)?,
    };

    Ok(resolved)
}

/// Require the override file path, for commands that write it.
pub fn require_conf(global: &GlobalOptions) -> Result<PathBuf, CliError> {
    global.conf.clone().ok_or_else(|| {
        CliError::InvalidArguments(
            "an override file is required (use --conf or CONFREG_CONF)".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(conf: Option<PathBuf>) -> GlobalOptions {
        GlobalOptions {
            verbose: false,
            quiet: false,
            conf,
        }
    }

    #[test]
    fn test_resolve_without_conf_uses_defaults() {
        let resolved = resolve_registry(&global(None), LoadMode::Strict).unwrap();
        assert_eq!(resolved.registry.len(), crate::schema::node_schema().len());
    }

    #[test]
    fn test_require_conf_missing() {
        let err = require_conf(&global(None)).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_require_conf_present() {
        let path = require_conf(&global(Some(PathBuf::from("/etc/node.conf")))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/node.conf"));
    }
}
