//! Start-up resolution of effective setting values.
//!
//! The loader turns a schema plus its override sources into the initial
//! registry. Per setting, the precedence chain is applied in strict
//! order:
//!
//! 1. the compiled default,
//! 2. `${VAR}` environment interpolation inside string defaults
//!    (a missing variable substitutes the empty string — optional path
//!    roots fail open rather than aborting boot),
//! 3. a `name = rawValue` assignment from the override file.
//!
//! Problems (unknown names, malformed lines, coercion failures) are
//! collected and surfaced together. In strict mode any problem refuses
//! start-up; lenient mode returns the registry alongside the report for
//! diagnostics.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::registry::{Origin, Registry};
use crate::schema::SettingSchema;
use crate::value::SettingValue;

/// How resolution problems are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Any collected problem aborts with [`Error::StartupAborted`].
    #[default]
    Strict,
    /// Problems are reported in [`Resolved::problems`]; the registry is
    /// still produced, with erroring settings keeping the previous
    /// stage's value.
    Lenient,
}

/// Outcome of a resolution run.
#[derive(Debug)]
pub struct Resolved {
    /// The fully populated registry.
    pub registry: Registry,
    /// Problems collected along the way (empty in strict mode, which
    /// would have aborted instead).
    pub problems: Vec<Error>,
}

/// Resolves effective starting values for every setting in a schema.
///
/// # Examples
///
/// ```
/// use confreg::{OverrideLoader, SettingSchema, SettingDescriptor, SettingValue};
/// use std::collections::HashMap;
///
/// let schema = SettingSchema::builder()
///     .declare(SettingDescriptor::new("qe_query_timeout_second", SettingValue::Int(300))
///         .runtime_mutable())
///     .build()
///     .unwrap();
///
/// let resolved = OverrideLoader::new(&schema)
///     .with_env(HashMap::new())
///     .resolve(Some("qe_query_timeout_second = 600\n"))
///     .unwrap();
///
/// assert_eq!(
///     resolved.registry.get("qe_query_timeout_second").unwrap(),
///     SettingValue::Int(600),
/// );
/// ```
pub struct OverrideLoader<'a> {
    schema: &'a SettingSchema,
    mode: LoadMode,
    env: HashMap<String, String>,
}

impl<'a> OverrideLoader<'a> {
    /// Create a strict loader over a snapshot of the process environment.
    #[must_use]
    pub fn new(schema: &'a SettingSchema) -> Self {
        Self {
            schema,
            mode: LoadMode::Strict,
            env: std::env::vars().collect(),
        }
    }

    /// Select strict or lenient problem handling.
    #[must_use]
    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the environment snapshot (read-only string map).
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Resolve against an override file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or
    /// [`Error::StartupAborted`] in strict mode when problems were
    /// collected.
    pub fn resolve_path(&self, path: &Path) -> Result<Resolved> {
        let contents = fs::read_to_string(path)?;
        debug!("resolving overrides from {}", path.display());
        self.resolve(Some(&contents))
    }

    /// Resolve against in-memory override-file contents (`None` means
    /// no override file).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StartupAborted`] in strict mode when problems
    /// were collected.
    pub fn resolve(&self, file: Option<&str>) -> Result<Resolved> {
        let mut problems = Vec::new();
        let mut overrides: HashMap<&str, String> = HashMap::new();

        if let Some(contents) = file {
            for (line_no, line) in contents.lines().enumerate() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                let Some((name, raw)) = split_assignment(trimmed) else {
                    problems.push(Error::MalformedLine {
                        line: line_no + 1,
                        text: trimmed.to_string(),
                    });
                    continue;
                };
                if self.schema.get(name).is_none() {
                    problems.push(Error::UnknownSetting {
                        name: name.to_string(),
                    });
                    continue;
                }
                // Last assignment wins, matching properties-style loading.
                overrides.insert(name, raw.to_string());
            }
        }

        let mut resolved = Vec::with_capacity(self.schema.len());
        for descriptor in self.schema.iter() {
            let (mut value, mut origin) = self.interpolated_default(descriptor.default_value());

            if let Some(raw) = overrides.get(descriptor.name()) {
                match SettingValue::parse(descriptor.value_type(), raw) {
                    Ok(parsed) => {
                        value = parsed;
                        origin = Origin::FileOverride;
                    }
                    Err(coercion) => {
                        // Keep the previous stage's value for this setting.
                        problems.push(coercion.for_setting(descriptor.name()));
                    }
                }
            }

            resolved.push((std::sync::Arc::clone(descriptor), value, origin));
        }

        if !problems.is_empty() {
            warn!("collected {} resolution problem(s)", problems.len());
            if self.mode == LoadMode::Strict {
                return Err(Error::StartupAborted { problems });
            }
        }

        Ok(Resolved {
            registry: Registry::from_resolved(resolved),
            problems,
        })
    }

    /// Apply `${VAR}` interpolation to string-typed defaults.
    fn interpolated_default(&self, default: &SettingValue) -> (SettingValue, Origin) {
        match default {
            SettingValue::String(s) => {
                let (out, substituted) = interpolate(s, &self.env);
                let origin = if substituted {
                    Origin::EnvOverride
                } else {
                    Origin::StartupDefault
                };
                (SettingValue::String(out), origin)
            }
            SettingValue::StringList(items) => {
                let mut substituted = false;
                let out = items
                    .iter()
                    .map(|item| {
                        let (expanded, hit) = interpolate(item, &self.env);
                        substituted |= hit;
                        expanded
                    })
                    .collect();
                let origin = if substituted {
                    Origin::EnvOverride
                } else {
                    Origin::StartupDefault
                };
                (SettingValue::StringList(out), origin)
            }
            other => (other.clone(), Origin::StartupDefault),
        }
    }
}

/// Split a trimmed line into `(name, rawValue)` at the first `=`.
///
/// Returns `None` when the line carries no `=` or an empty name.
pub(crate) fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let (name, raw) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, raw.trim()))
}

/// Substitute `${VAR}` placeholders from the environment map.
///
/// A missing variable substitutes the empty string. Tokens that are not
/// well-formed placeholders (empty or non-identifier names, unclosed
/// braces) pass through literally. The flag reports whether any
/// substitution happened.
fn interpolate(raw: &str, env: &HashMap<String, String>) -> (String, bool) {
    let mut out = String::with_capacity(raw.len());
    let mut substituted = false;
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if is_identifier(&after[..end]) => {
                if let Some(value) = env.get(&after[..end]) {
                    out.push_str(value);
                }
                substituted = true;
                rest = &after[end + 1..];
            }
            _ => {
                // Not a placeholder; emit "${" literally and move on.
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    (out, substituted)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
