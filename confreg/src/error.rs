//! Error types for the confreg library.
//!
//! This module provides the error hierarchy for all registry operations,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::value::SettingType;

/// Result type alias for operations that may fail with a confreg error.
///
/// # Examples
///
/// ```
/// use confreg::{Error, Result};
///
/// fn example_operation() -> Result<u64> {
///     Ok(1)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the confreg library.
///
/// Start-up resolution problems (`UnknownSetting`, `TypeMismatch`,
/// `MalformedLine`) are collected into `StartupAborted` in strict mode.
/// Runtime mutation problems are returned synchronously and leave the
/// registry untouched. `PersistenceFailure` and `PropagationFailure`
/// occur strictly after a successful local apply and are surfaced as
/// warnings, never as a rollback.
#[derive(Debug, Error)]
pub enum Error {
    /// A name not declared in the schema was referenced.
    #[error("unknown setting '{name}'")]
    UnknownSetting {
        /// The undeclared setting name.
        name: String,
    },

    /// A raw value could not be coerced to the declared type.
    #[error("type mismatch for '{name}': cannot parse '{raw}' as {expected}")]
    TypeMismatch {
        /// The setting whose value failed to parse.
        name: String,
        /// The raw string that was rejected.
        raw: String,
        /// The declared value type.
        expected: SettingType,
    },

    /// A runtime change was attempted against an immutable setting.
    #[error("setting '{name}' cannot be changed at runtime")]
    NotRuntimeMutable {
        /// The immutable setting.
        name: String,
    },

    /// The coerced value was rejected by the setting's validator.
    #[error("validation failed for '{name}': {detail}")]
    ValidationFailed {
        /// The setting that failed validation.
        name: String,
        /// Validator-provided detail.
        detail: String,
    },

    /// The durable write of a mutation could not complete.
    ///
    /// The local change has already been applied when this is reported.
    #[error("failed to persist '{name}': {detail}")]
    PersistenceFailure {
        /// The setting whose override could not be written.
        name: String,
        /// What went wrong.
        detail: String,
    },

    /// The broadcast hand-off to the replication channel failed.
    ///
    /// The local change has already been applied when this is reported.
    #[error("failed to propagate '{name}': {detail}")]
    PropagationFailure {
        /// The setting whose change could not be broadcast.
        name: String,
        /// What went wrong.
        detail: String,
    },

    /// The same setting name was declared more than once.
    #[error("duplicate setting declaration '{name}'")]
    SchemaConflict {
        /// The conflicting name.
        name: String,
    },

    /// An override-file line could not be parsed as `name = value`.
    #[error("malformed line {line}: '{text}'")]
    MalformedLine {
        /// One-based line number in the override file.
        line: usize,
        /// The offending line, trimmed.
        text: String,
    },

    /// Start-up resolution collected one or more problems in strict mode.
    #[error("configuration resolution failed:{}", render_problems(problems))]
    StartupAborted {
        /// Every problem found during resolution, in file order.
        problems: Vec<Error>,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_problems(problems: &[Error]) -> String {
    let mut out = String::new();
    for problem in problems {
        out.push_str("\n  - ");
        out.push_str(&problem.to_string());
    }
    out
}

impl Error {
    /// Check if the error names a setting absent from the schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use confreg::Error;
    ///
    /// let err = Error::UnknownSetting { name: "no_such".to_string() };
    /// assert!(err.is_unknown_setting());
    /// ```
    #[must_use]
    pub fn is_unknown_setting(&self) -> bool {
        matches!(self, Self::UnknownSetting { .. })
    }

    /// Check if the error is a coercion failure.
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Check if the error reports a post-apply, non-fatal failure
    /// (persistence or propagation).
    ///
    /// These never indicate a rejected mutation; the local change took
    /// effect.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::PersistenceFailure { .. } | Self::PropagationFailure { .. }
        )
    }
}
