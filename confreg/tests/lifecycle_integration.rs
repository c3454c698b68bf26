//! Integration tests for the full setting lifecycle.
//!
//! These tests exercise complete workflows that span multiple components:
//! resolution at boot, runtime mutation through the gateway, durable
//! persistence, restart, and cross-member propagation. They complement
//! the unit tests in the individual modules.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use confreg::{
    ChangeRecord, LoadMode, MutationGateway, MutationRequest, Origin, OverrideLoader, Persister,
    Propagator, ReplicationChannel, SettingDescriptor, SettingSchema, SettingValue,
};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A replication channel that records every published change in memory.
struct CapturingChannel {
    published: Mutex<Vec<ChangeRecord>>,
}

impl CapturingChannel {
    fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
        }
    }

    fn drain(&self) -> Vec<ChangeRecord> {
        std::mem::take(&mut *self.published.lock().unwrap())
    }
}

impl ReplicationChannel for CapturingChannel {
    fn publish(&self, record: &ChangeRecord) -> confreg::Result<()> {
        self.published.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// A representative node schema slice.
fn node_schema() -> SettingSchema {
    SettingSchema::builder()
        .declare(SettingDescriptor::new(
            "meta_dir",
            SettingValue::String("${NODE_HOME}/meta".into()),
        ))
        .declare(
            SettingDescriptor::new("sys_log_level", SettingValue::String("INFO".into()))
                .runtime_mutable()
                .with_validator(|v| match v {
                    SettingValue::String(s)
                        if ["INFO", "WARNING", "ERROR", "FATAL"].contains(&s.as_str()) =>
                    {
                        Ok(())
                    }
                    _ => Err("expected one of INFO, WARNING, ERROR, FATAL".to_string()),
                }),
        )
        .declare(
            SettingDescriptor::new("qe_query_timeout_second", SettingValue::Int(300))
                .runtime_mutable(),
        )
        .declare(SettingDescriptor::new("cluster_id", SettingValue::Int(-1)).expert())
        .build()
        .unwrap()
}

fn boot(conf: &Path, env: &[(&str, &str)]) -> MutationGateway {
    let schema = node_schema();
    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();

    let loader = OverrideLoader::new(&schema).with_env(env);
    let resolved = if conf.exists() {
        loader.resolve_path(conf).unwrap()
    } else {
        loader.resolve(None).unwrap()
    };

    MutationGateway::new(Arc::new(resolved.registry))
        .with_persister(Arc::new(Persister::new(conf)))
}

// ============================================================================
// Persist and Reload
// ============================================================================

#[test]
fn test_persisted_mutation_survives_restart() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("node.conf");

    // First boot: defaults, then a persisted mutation.
    let gateway = boot(&conf, &[("NODE_HOME", "/opt/wh")]);
    assert_eq!(
        gateway.registry().get("qe_query_timeout_second").unwrap(),
        SettingValue::Int(300)
    );
    let applied = gateway
        .mutate(MutationRequest::local_persistent(
            "qe_query_timeout_second",
            "900",
        ))
        .unwrap();
    assert!(applied.warnings.is_empty());

    // Second boot: the mutated value is the starting value.
    let restarted = boot(&conf, &[("NODE_HOME", "/opt/wh")]);
    assert_eq!(
        restarted.registry().get("qe_query_timeout_second").unwrap(),
        SettingValue::Int(900)
    );
    assert_eq!(
        restarted
            .registry()
            .origin_of("qe_query_timeout_second")
            .unwrap(),
        Origin::FileOverride
    );
}

#[test]
fn test_in_memory_mutation_does_not_survive_restart() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("node.conf");

    let gateway = boot(&conf, &[]);
    gateway
        .mutate(MutationRequest::local("qe_query_timeout_second", "900"))
        .unwrap();

    let restarted = boot(&conf, &[]);
    assert_eq!(
        restarted.registry().get("qe_query_timeout_second").unwrap(),
        SettingValue::Int(300)
    );
}

#[test]
fn test_persist_preserves_operator_comments() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("node.conf");
    fs::write(
        &conf,
        "# tuned down after the March incident\nqe_query_timeout_second = 120\n",
    )
    .unwrap();

    let gateway = boot(&conf, &[]);
    assert_eq!(
        gateway.registry().get("qe_query_timeout_second").unwrap(),
        SettingValue::Int(120)
    );

    gateway
        .mutate(MutationRequest::local_persistent(
            "qe_query_timeout_second",
            "180",
        ))
        .unwrap();

    let contents = fs::read_to_string(&conf).unwrap();
    assert_eq!(
        contents,
        "# tuned down after the March incident\nqe_query_timeout_second = 180\n"
    );
}

// ============================================================================
// Environment Interpolation at Boot
// ============================================================================

#[test]
fn test_env_interpolation_feeds_boot_values() {
    let dir = TempDir::new().unwrap();
    let conf = dir.path().join("node.conf");

    let gateway = boot(&conf, &[("NODE_HOME", "/srv/warehouse")]);
    assert_eq!(
        gateway.registry().get("meta_dir").unwrap(),
        SettingValue::String("/srv/warehouse/meta".into())
    );
    assert_eq!(
        gateway.registry().origin_of("meta_dir").unwrap(),
        Origin::EnvOverride
    );
}

#[test]
fn test_strict_boot_refuses_unknown_override() {
    let schema = node_schema();
    let err = OverrideLoader::new(&schema)
        .with_env(HashMap::new())
        .resolve(Some("not_declared_anywhere = 1\n"))
        .unwrap_err();
    assert!(matches!(err, confreg::Error::StartupAborted { .. }));

    // The same file is tolerated (and reported) in lenient mode.
    let resolved = OverrideLoader::new(&schema)
        .with_env(HashMap::new())
        .with_mode(LoadMode::Lenient)
        .resolve(Some("not_declared_anywhere = 1\n"))
        .unwrap();
    assert_eq!(resolved.problems.len(), 1);
}

// ============================================================================
// Cross-Member Propagation
// ============================================================================

#[test]
fn test_two_members_converge_on_value_and_version() {
    let schema = node_schema();

    let channel = Arc::new(CapturingChannel::new());
    let master = MutationGateway::new(Arc::new(confreg::Registry::with_defaults(&schema)))
        .with_propagator(Arc::new(Propagator::new(
            Arc::clone(&channel) as Arc<dyn ReplicationChannel>
        )));

    let follower = MutationGateway::new(Arc::new(confreg::Registry::with_defaults(&schema)));
    let follower_propagator = Propagator::new(Arc::new(CapturingChannel::new()));

    // Two mutations on the master.
    master
        .mutate(MutationRequest::local("sys_log_level", "WARNING"))
        .unwrap();
    master
        .mutate(MutationRequest::local("sys_log_level", "ERROR"))
        .unwrap();

    // Deliver the captured records to the follower, with a redelivery.
    let records = channel.drain();
    assert_eq!(records.len(), 2);
    for record in records.iter().chain(records.last()) {
        follower_propagator
            .on_receive(&follower, record.clone())
            .unwrap();
    }

    assert_eq!(
        follower.registry().get("sys_log_level").unwrap(),
        master.registry().get("sys_log_level").unwrap()
    );
    assert_eq!(
        follower.registry().version_of("sys_log_level").unwrap(),
        master.registry().version_of("sys_log_level").unwrap()
    );
    assert_eq!(
        follower.registry().origin_of("sys_log_level").unwrap(),
        Origin::RuntimeReplicated
    );
}

#[test]
fn test_out_of_order_delivery_converges() {
    let schema = node_schema();

    let channel = Arc::new(CapturingChannel::new());
    let master = MutationGateway::new(Arc::new(confreg::Registry::with_defaults(&schema)))
        .with_propagator(Arc::new(Propagator::new(
            Arc::clone(&channel) as Arc<dyn ReplicationChannel>
        )));
    let follower = MutationGateway::new(Arc::new(confreg::Registry::with_defaults(&schema)));
    let follower_propagator = Propagator::new(Arc::new(CapturingChannel::new()));

    master
        .mutate(MutationRequest::local("qe_query_timeout_second", "600"))
        .unwrap();
    master
        .mutate(MutationRequest::local("qe_query_timeout_second", "900"))
        .unwrap();

    // Newest record first; the stale one is then skipped.
    let mut records = channel.drain();
    records.reverse();
    assert!(follower_propagator
        .on_receive(&follower, records[0].clone())
        .unwrap()
        .is_some());
    assert!(follower_propagator
        .on_receive(&follower, records[1].clone())
        .unwrap()
        .is_none());

    assert_eq!(
        follower.registry().get("qe_query_timeout_second").unwrap(),
        SettingValue::Int(900)
    );
}

#[test]
fn test_validator_guards_replicated_changes_too() {
    let schema = node_schema();
    let follower = MutationGateway::new(Arc::new(confreg::Registry::with_defaults(&schema)));
    let propagator = Propagator::new(Arc::new(CapturingChannel::new()));

    let err = propagator
        .on_receive(
            &follower,
            ChangeRecord {
                name: "sys_log_level".to_string(),
                raw_value: "LOUD".to_string(),
                version: 1,
            },
        )
        .unwrap_err();
    assert!(matches!(err, confreg::Error::ValidationFailed { .. }));
    assert_eq!(
        follower.registry().get("sys_log_level").unwrap(),
        SettingValue::String("INFO".into())
    );
}
