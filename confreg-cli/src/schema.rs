//! The node setting catalog.
//!
//! Every setting a warehouse node understands is declared here, with
//! its typed default, mutability class, risk tier and validator. The
//! catalog is the single source of truth: the loader, the registry and
//! every CLI command operate on this schema.

use confreg::{SettingDescriptor, SettingSchema, SettingValue};

/// Validator: a strictly positive integer.
fn positive_int(v: &SettingValue) -> Result<(), String> {
    match v {
        SettingValue::Int(n) if *n > 0 => Ok(()),
        _ => Err("must be a positive integer".to_string()),
    }
}

/// Validator: a strictly positive long.
fn positive_long(v: &SettingValue) -> Result<(), String> {
    match v {
        SettingValue::Long(n) if *n > 0 => Ok(()),
        _ => Err("must be a positive integer".to_string()),
    }
}

/// Validator: a usable TCP port.
fn port_number(v: &SettingValue) -> Result<(), String> {
    match v {
        SettingValue::Int(n) if (1..=65535).contains(n) => Ok(()),
        _ => Err("must be a port number between 1 and 65535".to_string()),
    }
}

/// Validator: a fraction in [0, 1].
fn fraction(v: &SettingValue) -> Result<(), String> {
    match v {
        SettingValue::Double(f) if (0.0..=1.0).contains(f) => Ok(()),
        _ => Err("must be between 0 and 1".to_string()),
    }
}

/// Validator: membership in a fixed keyword set.
fn one_of(allowed: &'static [&'static str]) -> impl Fn(&SettingValue) -> Result<(), String> {
    move |v| match v {
        SettingValue::String(s) if allowed.contains(&s.as_str()) => Ok(()),
        _ => Err(format!("expected one of {}", allowed.join(", "))),
    }
}

/// Build the full node schema.
///
/// Declaration order is the order `list` reports.
#[allow(clippy::too_many_lines)]
pub fn node_schema() -> SettingSchema {
    let schema = SettingSchema::builder()
        // --- logging ---
        .declare(SettingDescriptor::new(
            "sys_log_dir",
            SettingValue::String("${NODE_HOME}/log".into()),
        ))
        .declare(
            SettingDescriptor::new("sys_log_level", SettingValue::String("INFO".into()))
                .runtime_mutable()
                .with_validator(one_of(&["INFO", "WARNING", "ERROR", "FATAL"])),
        )
        .declare(
            SettingDescriptor::new("sys_log_roll_num", SettingValue::Int(10))
                .runtime_mutable()
                .with_validator(positive_int),
        )
        .declare(SettingDescriptor::new(
            "audit_log_dir",
            SettingValue::String("${NODE_HOME}/log".into()),
        ))
        .declare(
            SettingDescriptor::new(
                "audit_log_modules",
                SettingValue::StringList(vec!["slow_query".into(), "query".into()]),
            )
            .runtime_mutable(),
        )
        // --- metadata ---
        .declare(SettingDescriptor::new(
            "meta_dir",
            SettingValue::String("${NODE_HOME}/meta".into()),
        ))
        .declare(
            SettingDescriptor::new("edit_log_port", SettingValue::Int(9010))
                .with_validator(port_number),
        )
        .declare(
            SettingDescriptor::new("edit_log_roll_num", SettingValue::Int(50000))
                .runtime_mutable()
                .with_validator(positive_int),
        )
        .declare(
            SettingDescriptor::new("meta_delay_toleration_second", SettingValue::Int(300))
                .runtime_mutable()
                .with_validator(positive_int),
        )
        .declare(
            SettingDescriptor::new(
                "master_sync_policy",
                SettingValue::String("WRITE_NO_SYNC".into()),
            )
            .expert()
            .with_validator(one_of(&["SYNC", "NO_SYNC", "WRITE_NO_SYNC"])),
        )
        .declare(SettingDescriptor::new("cluster_id", SettingValue::Int(-1)).expert())
        .declare(
            SettingDescriptor::new("metadata_failure_recovery", SettingValue::Bool(false))
                .expert(),
        )
        // --- query engine ---
        .declare(
            SettingDescriptor::new("max_conn_per_user", SettingValue::Int(100))
                .runtime_mutable()
                .with_validator(positive_int),
        )
        .declare(
            SettingDescriptor::new("qe_query_timeout_second", SettingValue::Int(300))
                .runtime_mutable()
                .with_validator(positive_int),
        )
        .declare(
            SettingDescriptor::new("qe_slow_log_ms", SettingValue::Long(5000))
                .runtime_mutable()
                .with_validator(positive_long),
        )
        // --- load and storage ---
        .declare(
            SettingDescriptor::new("load_pending_thread_num", SettingValue::Int(10))
                .expert()
                .with_validator(positive_int),
        )
        .declare(
            SettingDescriptor::new(
                "clone_capacity_balance_threshold",
                SettingValue::Double(0.2),
            )
            .runtime_mutable()
            .expert()
            .with_validator(fraction),
        )
        .declare(
            SettingDescriptor::new(
                "storage_high_watermark_usage_percent",
                SettingValue::Double(0.85),
            )
            .runtime_mutable()
            .with_validator(fraction),
        )
        .build();

    // The catalog is static; a duplicate name is a programming error
    // caught by the tests below.
    schema.unwrap_or_else(|err| panic!("invalid setting catalog: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use confreg::{Mutability, RiskTier, SettingType};

    #[test]
    fn test_catalog_builds() {
        let schema = node_schema();
        assert_eq!(schema.len(), 18);
    }

    #[test]
    fn test_catalog_names_are_unique() {
        // SettingSchema::new would have rejected duplicates; building
        // at all proves uniqueness.
        let schema = node_schema();
        assert!(schema.get("sys_log_level").is_some());
    }

    #[test]
    fn test_immutable_boot_settings() {
        let schema = node_schema();
        for name in ["meta_dir", "edit_log_port", "cluster_id", "sys_log_dir"] {
            assert_eq!(
                schema.get(name).unwrap().mutability(),
                Mutability::Immutable,
                "{name} must be immutable"
            );
        }
    }

    #[test]
    fn test_expert_tier_settings() {
        let schema = node_schema();
        for name in [
            "master_sync_policy",
            "cluster_id",
            "metadata_failure_recovery",
            "load_pending_thread_num",
        ] {
            assert_eq!(
                schema.get(name).unwrap().risk(),
                RiskTier::Expert,
                "{name} must be expert tier"
            );
        }
    }

    #[test]
    fn test_metadata_failure_recovery_is_a_real_bool() {
        let desc = node_schema().get("metadata_failure_recovery").cloned().unwrap();
        assert_eq!(desc.value_type(), SettingType::Bool);
        assert_eq!(desc.default_value(), &SettingValue::Bool(false));
    }

    #[test]
    fn test_port_validator() {
        let schema = node_schema();
        let desc = schema.get("edit_log_port").unwrap();
        assert!(desc.validate(&SettingValue::Int(9010)).is_ok());
        assert!(desc.validate(&SettingValue::Int(0)).is_err());
        assert!(desc.validate(&SettingValue::Int(70000)).is_err());
    }

    #[test]
    fn test_fraction_validator() {
        let schema = node_schema();
        let desc = schema.get("storage_high_watermark_usage_percent").unwrap();
        assert!(desc.validate(&SettingValue::Double(0.85)).is_ok());
        assert!(desc.validate(&SettingValue::Double(1.5)).is_err());
    }

    #[test]
    fn test_log_level_validator() {
        let schema = node_schema();
        let desc = schema.get("sys_log_level").unwrap();
        assert!(desc.validate(&SettingValue::String("ERROR".into())).is_ok());
        assert!(desc.validate(&SettingValue::String("LOUD".into())).is_err());
    }
}
