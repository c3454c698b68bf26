//! Setting schema definitions.
//!
//! The schema is the closed, ordered set of every setting a node
//! declares: name, typed default, mutability class, risk tier and an
//! optional validator. It is constructed once at process start and is
//! never modified afterwards; only names present in the schema may ever
//! appear in an override source or a mutation request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::value::{SettingType, SettingValue};

/// Whether a setting may change after process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    /// Fixed once the process has booted. Neither a local administrative
    /// request nor a replicated change may touch it.
    Immutable,
    /// May be changed at runtime through the mutation gateway.
    RuntimeMutable,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immutable => write!(f, "immutable"),
            Self::RuntimeMutable => write!(f, "runtime_mutable"),
        }
    }
}

/// Operator-facing risk classification.
///
/// The tier that catalog comments like "do not change this unless you
/// know what you are doing" encode informally, made explicit so
/// tooling can warn instead of relying on prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Safe for routine operational tuning.
    Normal,
    /// Changing this requires understanding of internals.
    Expert,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Expert => write!(f, "expert"),
        }
    }
}

/// Setting-specific predicate run against every candidate value.
///
/// Returns `Err(detail)` to reject the candidate.
pub type Validator = Arc<dyn Fn(&SettingValue) -> std::result::Result<(), String> + Send + Sync>;

/// A single setting declaration.
///
/// Descriptors are created once from the static catalog and never
/// mutated; the registry holds them for the life of the process. The
/// value type is derived from the typed default, so a descriptor cannot
/// declare a default of the wrong type.
///
/// # Examples
///
/// ```
/// use confreg::{SettingDescriptor, SettingValue, Mutability};
///
/// let desc = SettingDescriptor::new("qe_query_timeout_second", SettingValue::Int(300))
///     .runtime_mutable()
///     .with_validator(|v| match v {
///         SettingValue::Int(n) if *n > 0 => Ok(()),
///         _ => Err("must be positive".to_string()),
///     });
///
/// assert_eq!(desc.mutability(), Mutability::RuntimeMutable);
/// assert!(desc.validate(&SettingValue::Int(0)).is_err());
/// ```
#[derive(Clone)]
pub struct SettingDescriptor {
    name: String,
    default: SettingValue,
    mutability: Mutability,
    risk: RiskTier,
    validator: Option<Validator>,
}

impl SettingDescriptor {
    /// Declare a setting with its typed default.
    ///
    /// New descriptors start out immutable and normal-risk; chain
    /// [`runtime_mutable`](Self::runtime_mutable),
    /// [`expert`](Self::expert) and
    /// [`with_validator`](Self::with_validator) to adjust.
    #[must_use]
    pub fn new(name: impl Into<String>, default: SettingValue) -> Self {
        Self {
            name: name.into(),
            default,
            mutability: Mutability::Immutable,
            risk: RiskTier::Normal,
            validator: None,
        }
    }

    /// Allow this setting to change at runtime.
    #[must_use]
    pub fn runtime_mutable(mut self) -> Self {
        self.mutability = Mutability::RuntimeMutable;
        self
    }

    /// Mark this setting as expert-tier.
    #[must_use]
    pub fn expert(mut self) -> Self {
        self.risk = RiskTier::Expert;
        self
    }

    /// Attach a validator predicate.
    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&SettingValue) -> std::result::Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// The setting's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared value type (derived from the default).
    #[must_use]
    pub fn value_type(&self) -> SettingType {
        self.default.setting_type()
    }

    /// The compiled default value.
    #[must_use]
    pub fn default_value(&self) -> &SettingValue {
        &self.default
    }

    /// Whether the setting may change after boot.
    #[must_use]
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// The operator-facing risk tier.
    #[must_use]
    pub fn risk(&self) -> RiskTier {
        self.risk
    }

    /// Run the validator, if any, against a candidate value.
    ///
    /// # Errors
    ///
    /// Returns the validator's rejection detail.
    pub fn validate(&self, candidate: &SettingValue) -> std::result::Result<(), String> {
        match &self.validator {
            Some(validator) => validator(candidate),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SettingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingDescriptor")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("mutability", &self.mutability)
            .field("risk", &self.risk)
            .field("validator", &self.validator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// The closed, ordered set of setting declarations for a node.
///
/// # Examples
///
/// ```
/// use confreg::{SettingSchema, SettingDescriptor, SettingValue};
///
/// let schema = SettingSchema::builder()
///     .declare(SettingDescriptor::new("cluster_id", SettingValue::Int(-1)))
///     .declare(SettingDescriptor::new("sys_log_level", SettingValue::String("INFO".into()))
///         .runtime_mutable())
///     .build()
///     .unwrap();
///
/// assert_eq!(schema.len(), 2);
/// assert!(schema.get("cluster_id").is_some());
/// assert!(schema.get("no_such").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct SettingSchema {
    descriptors: Vec<Arc<SettingDescriptor>>,
    index: HashMap<String, usize>,
}

impl SettingSchema {
    /// Start building a schema.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            descriptors: Vec::new(),
        }
    }

    /// Construct a schema from a list of descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaConflict`] if two descriptors share a name.
    pub fn new(descriptors: Vec<SettingDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(descriptors.len());
        let mut owned = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let position = owned.len();
            if index
                .insert(descriptor.name().to_string(), position)
                .is_some()
            {
                return Err(Error::SchemaConflict {
                    name: descriptor.name().to_string(),
                });
            }
            owned.push(Arc::new(descriptor));
        }

        Ok(Self {
            descriptors: owned,
            index,
        })
    }

    /// Look up a descriptor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<SettingDescriptor>> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Iterate descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SettingDescriptor>> {
        self.descriptors.iter()
    }

    /// Number of declared settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the schema declares no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Incremental schema construction.
#[derive(Debug)]
pub struct SchemaBuilder {
    descriptors: Vec<SettingDescriptor>,
}

impl SchemaBuilder {
    /// Add a setting declaration.
    #[must_use]
    pub fn declare(mut self, descriptor: SettingDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Finish the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaConflict`] on a duplicate name.
    pub fn build(self) -> Result<SettingSchema> {
        SettingSchema::new(self.descriptors)
    }
}
