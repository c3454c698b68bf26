//! The live, process-wide setting table.
//!
//! The registry maps every schema name to its current typed value. It
//! is built once by the override loader and thereafter updated only
//! through the mutation gateway. Each entry carries its own lock, so
//! readers never block on writes to unrelated settings and a reader
//! observes either the old or the new value of an entry, never a mix.
//!
//! The registry performs no validation; that is the gateway's job. It
//! does enforce the closed namespace: an unknown name is an error, not
//! a fresh entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::{Mutability, RiskTier, SettingDescriptor, SettingSchema};
use crate::value::{SettingType, SettingValue};

/// Provenance of the value currently held by an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    /// The compiled default.
    #[serde(rename = "default")]
    StartupDefault,
    /// The default with environment placeholders substituted.
    #[serde(rename = "env")]
    EnvOverride,
    /// An assignment from the override file at start-up.
    #[serde(rename = "file")]
    FileOverride,
    /// A runtime mutation issued on this node.
    #[serde(rename = "runtime")]
    RuntimeLocal,
    /// A runtime mutation replicated from another cluster member.
    #[serde(rename = "replicated")]
    RuntimeReplicated,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartupDefault => write!(f, "default"),
            Self::EnvOverride => write!(f, "env"),
            Self::FileOverride => write!(f, "file"),
            Self::RuntimeLocal => write!(f, "runtime"),
            Self::RuntimeReplicated => write!(f, "replicated"),
        }
    }
}

/// Snapshot of a single entry, as produced by [`Registry::iter`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingListing {
    /// Setting name.
    pub name: String,
    /// Current value.
    pub value: SettingValue,
    /// Declared type.
    pub value_type: SettingType,
    /// Mutability class.
    pub mutability: Mutability,
    /// Risk tier.
    pub risk: RiskTier,
    /// Provenance of the current value.
    pub origin: Origin,
    /// Per-entry version counter.
    pub version: u64,
}

struct EntryState {
    value: SettingValue,
    origin: Origin,
    version: u64,
}

struct RegistryEntry {
    descriptor: Arc<SettingDescriptor>,
    state: RwLock<EntryState>,
}

impl RegistryEntry {
    fn read(&self) -> RwLockReadGuard<'_, EntryState> {
        // A panicking writer cannot leave a torn value behind (the value
        // swap is a single assignment), so poisoned locks are usable.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The live mapping from setting name to current typed value.
///
/// # Examples
///
/// ```
/// use confreg::{Registry, SettingSchema, SettingDescriptor, SettingValue};
///
/// let schema = SettingSchema::builder()
///     .declare(SettingDescriptor::new("qe_max_connection", SettingValue::Int(1024)))
///     .build()
///     .unwrap();
///
/// let registry = Registry::with_defaults(&schema);
/// assert_eq!(registry.get("qe_max_connection").unwrap(), SettingValue::Int(1024));
/// assert!(registry.get("no_such").is_err());
/// ```
pub struct Registry {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build a registry whose every entry holds its compiled default.
    ///
    /// The override loader produces registries with resolved values;
    /// this constructor is the no-overrides boot path.
    #[must_use]
    pub fn with_defaults(schema: &SettingSchema) -> Self {
        Self::from_resolved(
            schema
                .iter()
                .map(|d| (Arc::clone(d), d.default_value().clone(), Origin::StartupDefault))
                .collect(),
        )
    }

    /// Build a registry from fully resolved (descriptor, value, origin)
    /// triples, in schema order.
    pub(crate) fn from_resolved(
        resolved: Vec<(Arc<SettingDescriptor>, SettingValue, Origin)>,
    ) -> Self {
        let mut entries = Vec::with_capacity(resolved.len());
        let mut index = HashMap::with_capacity(resolved.len());

        for (descriptor, value, origin) in resolved {
            index.insert(descriptor.name().to_string(), entries.len());
            entries.push(RegistryEntry {
                descriptor,
                state: RwLock::new(EntryState {
                    value,
                    origin,
                    version: 0,
                }),
            });
        }

        Self { entries, index }
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::UnknownSetting {
                name: name.to_string(),
            })
    }

    /// Current value of a setting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] for names absent from the schema.
    pub fn get(&self, name: &str) -> Result<SettingValue> {
        Ok(self.entry(name)?.read().value.clone())
    }

    /// Provenance of a setting's current value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] for names absent from the schema.
    pub fn origin_of(&self, name: &str) -> Result<Origin> {
        Ok(self.entry(name)?.read().origin)
    }

    /// Current version counter of a setting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] for names absent from the schema.
    pub fn version_of(&self, name: &str) -> Result<u64> {
        Ok(self.entry(name)?.read().version)
    }

    /// The descriptor backing a setting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] for names absent from the schema.
    pub fn describe(&self, name: &str) -> Result<Arc<SettingDescriptor>> {
        Ok(Arc::clone(&self.entry(name)?.descriptor))
    }

    /// Lazily iterate every entry in schema declaration order.
    ///
    /// Each entry is locked only while it is being visited, so the
    /// iterator can be restarted or abandoned freely and never holds a
    /// registry-wide lock.
    pub fn iter(&self) -> impl Iterator<Item = SettingListing> + '_ {
        self.entries.iter().map(|entry| {
            let state = entry.read();
            SettingListing {
                name: entry.descriptor.name().to_string(),
                value: state.value.clone(),
                value_type: entry.descriptor.value_type(),
                mutability: entry.descriptor.mutability(),
                risk: entry.descriptor.risk(),
                origin: state.origin,
                version: state.version,
            }
        })
    }

    /// Collect a point-in-time snapshot of every entry.
    ///
    /// Entries are snapshotted one at a time; the result is not a
    /// registry-wide atomic view.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SettingListing> {
        self.iter().collect()
    }

    /// Replace a setting's value in place, recording provenance.
    ///
    /// The entry's version counter increments. The whole update happens
    /// under the entry's write lock: a concurrent reader sees the old
    /// state or the new one, never a mix, and writers to the same name
    /// serialize while writers to other names proceed untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] for names absent from the schema.
    pub fn apply_in_place(&self, name: &str, value: SettingValue, origin: Origin) -> Result<u64> {
        let entry = self.entry(name)?;
        debug_assert_eq!(
            value.setting_type(),
            entry.descriptor.value_type(),
            "gateway must coerce before applying"
        );

        let mut state = entry.write();
        state.value = value;
        state.origin = origin;
        state.version += 1;
        Ok(state.version)
    }

    /// Apply a change carrying an authoritative version, only if that
    /// version is newer than the entry's counter.
    ///
    /// The comparison and the apply happen under the same entry write
    /// lock, so a racing [`apply_in_place`](Self::apply_in_place) on
    /// the same name cannot slip between them and the counter never
    /// moves backwards. A stale version (at or below the current
    /// counter) returns `Ok(None)` and leaves the entry untouched,
    /// making duplicate delivery idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`] for names absent from the schema.
    pub fn apply_if_newer(
        &self,
        name: &str,
        value: SettingValue,
        origin: Origin,
        version: u64,
    ) -> Result<Option<u64>> {
        let entry = self.entry(name)?;
        debug_assert_eq!(
            value.setting_type(),
            entry.descriptor.value_type(),
            "gateway must coerce before applying"
        );

        let mut state = entry.write();
        if version <= state.version {
            return Ok(None);
        }
        state.value = value;
        state.origin = origin;
        state.version = version;
        Ok(Some(version))
    }

    /// Number of entries (equals the schema size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .finish()
    }
}
