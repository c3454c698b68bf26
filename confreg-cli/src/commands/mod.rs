//! CLI command implementations.
//!
//! This module contains the implementations of all CLI commands:
//! - `check`: Validate the override file against the setting catalog
//! - `list`: List every setting with its resolved value and provenance
//! - `get`: Print the resolved value of one setting
//! - `set`: Change a runtime-mutable setting and persist it

pub mod check;
pub mod get;
pub mod list;
pub mod set;

pub use check::CheckCommand;
pub use get::GetCommand;
pub use list::ListCommand;
pub use set::SetCommand;
