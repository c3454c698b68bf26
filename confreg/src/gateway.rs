//! The runtime mutation gateway.
//!
//! Every change after boot flows through the gateway: local
//! administrative requests through [`MutationGateway::mutate`] and
//! replicated deliveries through [`MutationGateway::apply_replicated`].
//! Both enforce the same pipeline in order: name lookup, mutability,
//! type coercion, validation, in-place apply. `mutate` then runs the
//! post-apply side effects (cluster broadcast and durable persistence);
//! replicated applies never re-broadcast and are dropped when the
//! carried version is stale. Rejections happen before the apply and
//! leave the registry untouched; side-effect failures happen after it
//! and are reported as warnings, never as a rollback.

use std::sync::Arc;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::persist::Persister;
use crate::propagate::{ChangeRecord, Propagator};
use crate::registry::{Origin, Registry};
use crate::schema::Mutability;
use crate::value::SettingValue;

/// A single administrative change request issued on this node.
///
/// Changes arriving from other cluster members are not requests; they
/// go through [`MutationGateway::apply_replicated`] as a
/// [`ChangeRecord`].
#[derive(Debug, Clone)]
pub struct MutationRequest {
    name: String,
    raw_value: String,
    persist: bool,
}

impl MutationRequest {
    /// An administrative change, in memory only.
    #[must_use]
    pub fn local(name: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_value: raw_value.into(),
            persist: false,
        }
    }

    /// An administrative change that also survives restart.
    #[must_use]
    pub fn local_persistent(name: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            persist: true,
            ..Self::local(name, raw_value)
        }
    }

    /// The target setting name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Outcome of an accepted mutation.
#[derive(Debug)]
pub struct Applied {
    /// The entry's version after the apply.
    pub version: u64,
    /// Post-apply side-effect failures (persistence, propagation). The
    /// change itself took effect regardless.
    pub warnings: Vec<Error>,
}

/// The single entry point for changing settings after boot.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use confreg::{
///     MutationGateway, MutationRequest, Registry, SettingDescriptor, SettingSchema,
///     SettingValue,
/// };
///
/// let schema = SettingSchema::builder()
///     .declare(SettingDescriptor::new("qe_query_timeout_second", SettingValue::Int(300))
///         .runtime_mutable())
///     .build()
///     .unwrap();
/// let gateway = MutationGateway::new(Arc::new(Registry::with_defaults(&schema)));
///
/// let applied = gateway
///     .mutate(MutationRequest::local("qe_query_timeout_second", "600"))
///     .unwrap();
/// assert_eq!(applied.version, 1);
/// assert_eq!(
///     gateway.registry().get("qe_query_timeout_second").unwrap(),
///     SettingValue::Int(600),
/// );
/// ```
pub struct MutationGateway {
    registry: Arc<Registry>,
    propagator: Option<Arc<Propagator>>,
    persister: Option<Arc<Persister>>,
}

impl MutationGateway {
    /// Create a gateway over a registry, with no side channels.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            propagator: None,
            persister: None,
        }
    }

    /// Attach a propagator; local mutations will be broadcast.
    #[must_use]
    pub fn with_propagator(mut self, propagator: Arc<Propagator>) -> Self {
        self.propagator = Some(propagator);
        self
    }

    /// Attach a persister; mutations requesting persistence will be
    /// written through.
    #[must_use]
    pub fn with_persister(mut self, persister: Arc<Persister>) -> Self {
        self.persister = Some(persister);
        self
    }

    /// The registry this gateway mutates.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Run a change request through the full pipeline.
    ///
    /// Checks run in a fixed order, each rejection leaving the current
    /// value, origin and version untouched:
    ///
    /// 1. the name must be in the schema,
    /// 2. the setting must be runtime-mutable (an immutable setting
    ///    rejects local and replicated changes alike),
    /// 3. the raw value must coerce to the declared type,
    /// 4. the coerced value must pass the validator.
    ///
    /// The apply itself holds only the one entry's write lock, which is
    /// released before any broadcast or durable write starts. The
    /// change is broadcast with the post-apply version when a
    /// propagator is attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`], [`Error::NotRuntimeMutable`],
    /// [`Error::TypeMismatch`] or [`Error::ValidationFailed`] for a
    /// rejected request. Side-effect failures after a successful apply
    /// are returned in [`Applied::warnings`] instead.
    pub fn mutate(&self, request: MutationRequest) -> Result<Applied> {
        let value = self.admit(&request.name, &request.raw_value)?;

        // Canonical text form; what replicas re-parse and what the
        // override file records.
        let canonical = value.to_string();

        let version = self
            .registry
            .apply_in_place(&request.name, value, Origin::RuntimeLocal)?;
        debug!(
            "applied {} = {canonical} ({}, version {version})",
            request.name,
            Origin::RuntimeLocal
        );

        let mut warnings = Vec::new();

        if let Some(propagator) = &self.propagator {
            let record = ChangeRecord {
                name: request.name.clone(),
                raw_value: canonical.clone(),
                version,
            };
            if let Err(err) = propagator.broadcast(&record) {
                warn!("{err}");
                warnings.push(err);
            }
        }

        if request.persist {
            match &self.persister {
                Some(persister) => {
                    if let Err(err) = persister.write(&request.name, &canonical) {
                        warn!("{err}");
                        warnings.push(err);
                    }
                }
                None => {
                    let err = Error::PersistenceFailure {
                        name: request.name.clone(),
                        detail: "no persistence target configured".to_string(),
                    };
                    warn!("{err}");
                    warnings.push(err);
                }
            }
        }

        Ok(Applied { version, warnings })
    }

    /// Apply a change delivered from another cluster member.
    ///
    /// The record runs through the same admission checks as a local
    /// request, then the stale guard and the apply execute together
    /// under the entry's write lock
    /// ([`Registry::apply_if_newer`]): a record whose version is not
    /// greater than the entry's current counter returns `Ok(None)` and
    /// leaves the entry untouched, even when local mutations of the
    /// same setting are racing the delivery. Replicated applies are
    /// never re-broadcast and never persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSetting`], [`Error::NotRuntimeMutable`],
    /// [`Error::TypeMismatch`] or [`Error::ValidationFailed`] for a
    /// record that fails admission.
    pub fn apply_replicated(&self, record: &ChangeRecord) -> Result<Option<Applied>> {
        let value = self.admit(&record.name, &record.raw_value)?;

        match self.registry.apply_if_newer(
            &record.name,
            value,
            Origin::RuntimeReplicated,
            record.version,
        )? {
            Some(version) => {
                debug!(
                    "applied {} = {} ({}, version {version})",
                    record.name,
                    record.raw_value,
                    Origin::RuntimeReplicated
                );
                Ok(Some(Applied {
                    version,
                    warnings: Vec::new(),
                }))
            }
            None => {
                debug!(
                    "dropped stale change for {} (version {})",
                    record.name, record.version
                );
                Ok(None)
            }
        }
    }

    /// Admission pipeline shared by local and replicated changes:
    /// schema lookup, mutability, coercion, validation.
    fn admit(&self, name: &str, raw_value: &str) -> Result<SettingValue> {
        let descriptor = self.registry.describe(name)?;

        if descriptor.mutability() != Mutability::RuntimeMutable {
            return Err(Error::NotRuntimeMutable {
                name: name.to_string(),
            });
        }

        let value = SettingValue::parse(descriptor.value_type(), raw_value)
            .map_err(|coercion| coercion.for_setting(name))?;

        descriptor
            .validate(&value)
            .map_err(|detail| Error::ValidationFailed {
                name: name.to_string(),
                detail,
            })?;

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagate::{MockReplicationChannel, ReplicationChannel};
    use crate::schema::{SettingDescriptor, SettingSchema};

    fn sample_registry() -> Arc<Registry> {
        let schema = SettingSchema::builder()
            .declare(SettingDescriptor::new("x", SettingValue::Int(5)))
            .declare(
                SettingDescriptor::new("y", SettingValue::String("a".into())).runtime_mutable(),
            )
            .declare(
                SettingDescriptor::new("qe_query_timeout_second", SettingValue::Int(300))
                    .runtime_mutable()
                    .with_validator(|v| match v {
                        SettingValue::Int(n) if *n > 0 => Ok(()),
                        _ => Err("must be positive".to_string()),
                    }),
            )
            .build()
            .unwrap();
        Arc::new(Registry::with_defaults(&schema))
    }

    #[test]
    fn test_immutable_setting_rejects_local_mutation() {
        let gateway = MutationGateway::new(sample_registry());
        let err = gateway.mutate(MutationRequest::local("x", "9")).unwrap_err();
        assert!(matches!(err, Error::NotRuntimeMutable { .. }));
        // The rejection left the entry untouched.
        assert_eq!(gateway.registry().get("x").unwrap(), SettingValue::Int(5));
        assert_eq!(gateway.registry().version_of("x").unwrap(), 0);
    }

    #[test]
    fn test_immutable_setting_rejects_replicated_change() {
        let gateway = MutationGateway::new(sample_registry());
        let record = ChangeRecord {
            name: "x".to_string(),
            raw_value: "9".to_string(),
            version: 1,
        };
        let err = gateway.apply_replicated(&record).unwrap_err();
        assert!(matches!(err, Error::NotRuntimeMutable { .. }));
        assert_eq!(gateway.registry().get("x").unwrap(), SettingValue::Int(5));
    }

    #[test]
    fn test_mutable_setting_applies() {
        let gateway = MutationGateway::new(sample_registry());
        let applied = gateway.mutate(MutationRequest::local("y", "b")).unwrap();
        assert_eq!(applied.version, 1);
        assert!(applied.warnings.is_empty());
        assert_eq!(
            gateway.registry().get("y").unwrap(),
            SettingValue::String("b".into())
        );
        assert_eq!(
            gateway.registry().origin_of("y").unwrap(),
            Origin::RuntimeLocal
        );
    }

    #[test]
    fn test_unknown_setting_rejected() {
        let gateway = MutationGateway::new(sample_registry());
        let err = gateway
            .mutate(MutationRequest::local("ghost", "1"))
            .unwrap_err();
        assert!(err.is_unknown_setting());
    }

    #[test]
    fn test_coercion_failure_rejected_before_apply() {
        let gateway = MutationGateway::new(sample_registry());
        let err = gateway
            .mutate(MutationRequest::local("qe_query_timeout_second", "soon"))
            .unwrap_err();
        assert!(err.is_type_mismatch());
        assert_eq!(
            gateway.registry().get("qe_query_timeout_second").unwrap(),
            SettingValue::Int(300)
        );
    }

    #[test]
    fn test_validator_rejection_leaves_entry_untouched() {
        let gateway = MutationGateway::new(sample_registry());
        let err = gateway
            .mutate(MutationRequest::local("qe_query_timeout_second", "-1"))
            .unwrap_err();
        assert!(matches!(err, Error::ValidationFailed { .. }));
        assert_eq!(
            gateway.registry().get("qe_query_timeout_second").unwrap(),
            SettingValue::Int(300)
        );
        assert_eq!(
            gateway
                .registry()
                .version_of("qe_query_timeout_second")
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_local_mutation_broadcasts_post_apply_version() {
        let mut channel = MockReplicationChannel::new();
        channel
            .expect_publish()
            .withf(|r| r.name == "y" && r.raw_value == "b" && r.version == 1)
            .times(1)
            .returning(|_| Ok(()));

        let gateway = MutationGateway::new(sample_registry())
            .with_propagator(Arc::new(Propagator::new(Arc::new(channel))));
        let applied = gateway.mutate(MutationRequest::local("y", "b")).unwrap();
        assert!(applied.warnings.is_empty());
    }

    #[test]
    fn test_replicated_change_never_rebroadcast() {
        let mut channel = MockReplicationChannel::new();
        channel.expect_publish().times(0);

        let gateway = MutationGateway::new(sample_registry())
            .with_propagator(Arc::new(Propagator::new(Arc::new(channel))));
        let record = ChangeRecord {
            name: "y".to_string(),
            raw_value: "b".to_string(),
            version: 4,
        };
        let applied = gateway.apply_replicated(&record).unwrap().unwrap();
        assert_eq!(applied.version, 4);
        assert!(applied.warnings.is_empty());
    }

    #[test]
    fn test_stale_replicated_change_dropped() {
        let gateway = MutationGateway::new(sample_registry());
        gateway
            .apply_replicated(&ChangeRecord {
                name: "y".to_string(),
                raw_value: "fresh".to_string(),
                version: 3,
            })
            .unwrap();

        let outcome = gateway
            .apply_replicated(&ChangeRecord {
                name: "y".to_string(),
                raw_value: "old".to_string(),
                version: 2,
            })
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(
            gateway.registry().get("y").unwrap(),
            SettingValue::String("fresh".into())
        );
        assert_eq!(gateway.registry().version_of("y").unwrap(), 3);
    }

    #[test]
    fn test_broadcast_failure_is_warning_not_rollback() {
        let mut channel = MockReplicationChannel::new();
        channel.expect_publish().returning(|_| {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer gone",
            )))
        });

        let gateway = MutationGateway::new(sample_registry())
            .with_propagator(Arc::new(Propagator::new(Arc::new(channel))));
        let applied = gateway.mutate(MutationRequest::local("y", "b")).unwrap();
        assert_eq!(applied.warnings.len(), 1);
        assert!(applied.warnings[0].is_warning());
        // Applied despite the failed broadcast.
        assert_eq!(
            gateway.registry().get("y").unwrap(),
            SettingValue::String("b".into())
        );
    }

    #[test]
    fn test_persist_without_target_is_warning() {
        let gateway = MutationGateway::new(sample_registry());
        let applied = gateway
            .mutate(MutationRequest::local_persistent("y", "b"))
            .unwrap();
        assert_eq!(applied.warnings.len(), 1);
        assert!(applied.warnings[0].is_warning());
    }

    #[test]
    fn test_persisted_mutation_rewrites_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("node.conf");
        let gateway = MutationGateway::new(sample_registry())
            .with_persister(Arc::new(Persister::new(&conf)));

        let applied = gateway
            .mutate(MutationRequest::local_persistent(
                "qe_query_timeout_second",
                "600",
            ))
            .unwrap();
        assert!(applied.warnings.is_empty());

        let contents = std::fs::read_to_string(&conf).unwrap();
        assert_eq!(contents, "qe_query_timeout_second = 600\n");
    }

    #[test]
    fn test_in_memory_mutation_does_not_touch_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("node.conf");
        let gateway = MutationGateway::new(sample_registry())
            .with_persister(Arc::new(Persister::new(&conf)));

        gateway.mutate(MutationRequest::local("y", "b")).unwrap();
        assert!(!conf.exists());
    }

    #[test]
    fn test_concurrent_mutations_to_distinct_settings() {
        use std::thread;

        struct NullChannel;
        impl ReplicationChannel for NullChannel {
            fn publish(&self, _record: &ChangeRecord) -> crate::Result<()> {
                Ok(())
            }
        }

        let gateway = Arc::new(
            MutationGateway::new(sample_registry())
                .with_propagator(Arc::new(Propagator::new(Arc::new(NullChannel)))),
        );

        let handles: Vec<_> = (0..2)
            .map(|which| {
                let gateway = Arc::clone(&gateway);
                thread::spawn(move || {
                    for i in 1..=200 {
                        let request = if which == 0 {
                            MutationRequest::local("y", format!("v{i}"))
                        } else {
                            MutationRequest::local("qe_query_timeout_second", i.to_string())
                        };
                        gateway.mutate(request).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(gateway.registry().version_of("y").unwrap(), 200);
        assert_eq!(
            gateway
                .registry()
                .version_of("qe_query_timeout_second")
                .unwrap(),
            200
        );
    }
}
