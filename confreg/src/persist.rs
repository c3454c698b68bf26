//! Durable persistence of runtime mutations.
//!
//! A persisted mutation is rewritten into the same override file the
//! loader reads at boot, so a restarted node resolves to the value it
//! was running with. The rewrite is comment- and order-preserving:
//! unrelated lines pass through verbatim, the last assignment of the
//! target setting is replaced in place (earlier duplicates are dropped,
//! since only the last would win on reload anyway), and a setting with
//! no existing assignment is appended at the end.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::debug;

use crate::error::{Error, Result};
use crate::loader::split_assignment;

/// Rewrites the override file to reflect runtime mutations.
///
/// All writes go through an internal lock, so concurrent persisted
/// mutations of different settings serialize rather than clobber each
/// other's rewrite.
#[derive(Debug)]
pub struct Persister {
    path: PathBuf,
    file_lock: Mutex<()>,
}

impl Persister {
    /// Create a persister targeting an override file.
    ///
    /// The file does not need to exist yet; the first persisted
    /// mutation creates it.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    /// The override file this persister rewrites.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `name = raw` durably.
    ///
    /// The new contents are written to a sibling temp file and renamed
    /// over the original, so a crash mid-write never leaves a truncated
    /// override file behind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PersistenceFailure`] if the file cannot be read
    /// or rewritten. The in-memory change this write records has already
    /// been applied; the caller surfaces this as a warning.
    pub fn write(&self, name: &str, raw: &str) -> Result<()> {
        let _guard = self
            .file_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(self.failure(name, &err)),
        };

        let rewritten = rewrite(&contents, name, raw);

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, rewritten).map_err(|err| self.failure(name, &err))?;
        fs::rename(&tmp, &self.path).map_err(|err| self.failure(name, &err))?;

        debug!("persisted {name} to {}", self.path.display());
        Ok(())
    }

    fn failure(&self, name: &str, err: &std::io::Error) -> Error {
        Error::PersistenceFailure {
            name: name.to_string(),
            detail: format!("{}: {err}", self.path.display()),
        }
    }
}

/// Produce the new file contents with `name = raw` in effect.
fn rewrite(contents: &str, name: &str, raw: &str) -> String {
    let assignment = format!("{name} = {raw}");

    let matching: Vec<usize> = contents
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                return None;
            }
            match split_assignment(trimmed) {
                Some((key, _)) if key == name => Some(i),
                _ => None,
            }
        })
        .collect();

    let mut out = String::with_capacity(contents.len() + assignment.len() + 1);
    match matching.last() {
        Some(&last) => {
            for (i, line) in contents.lines().enumerate() {
                if i == last {
                    out.push_str(&assignment);
                } else if matching.contains(&i) {
                    // Earlier duplicate; drop it.
                    continue;
                } else {
                    out.push_str(line);
                }
                out.push('\n');
            }
        }
        None => {
            out.push_str(contents);
            if !contents.is_empty() && !contents.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&assignment);
            out.push('\n');
        }
    }
    out
}
