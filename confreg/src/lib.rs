#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # confreg
//!
//! A runtime configuration registry for clustered data-warehouse nodes.
//!
//! This library provides the typed setting catalog, the start-up
//! resolution chain (compiled default, environment interpolation,
//! override file), the live registry, and the runtime mutation gateway
//! with cluster propagation and durable persistence.
//!
//! ## Core Types
//!
//! - [`SettingValue`] and [`SettingType`]: Typed values with text coercion
//! - [`SettingDescriptor`] and [`SettingSchema`]: The closed setting catalog
//! - [`OverrideLoader`] and [`Resolved`]: Start-up resolution
//! - [`Registry`]: The live name-to-value table
//! - [`MutationGateway`] and [`MutationRequest`]: Runtime changes
//! - [`Propagator`] and [`ReplicationChannel`]: Cluster convergence
//! - [`Persister`]: Restart-surviving overrides
//! - [`Error`] and [`Result`]: Error handling types
//! - [`Logger`] and [`LogLevel`]: Logging infrastructure
//!
//! ## Examples
//!
//! ```
//! use std::sync::Arc;
//! use confreg::{
//!     MutationGateway, MutationRequest, OverrideLoader, SettingDescriptor, SettingSchema,
//!     SettingValue,
//! };
//!
//! // Declare the catalog.
//! let schema = SettingSchema::builder()
//!     .declare(SettingDescriptor::new("sys_log_level", SettingValue::String("INFO".into()))
//!         .runtime_mutable())
//!     .build()
//!     .unwrap();
//!
//! // Resolve starting values, then mutate at runtime.
//! let resolved = OverrideLoader::new(&schema)
//!     .with_env(std::collections::HashMap::new())
//!     .resolve(Some("sys_log_level = WARNING\n"))
//!     .unwrap();
//! let gateway = MutationGateway::new(Arc::new(resolved.registry));
//! gateway.mutate(MutationRequest::local("sys_log_level", "ERROR")).unwrap();
//!
//! assert_eq!(
//!     gateway.registry().get("sys_log_level").unwrap(),
//!     SettingValue::String("ERROR".into()),
//! );
//! ```

pub mod error;
pub mod gateway;
pub mod loader;
pub mod logging;
pub mod persist;
pub mod propagate;
pub mod registry;
pub mod schema;
pub mod value;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use gateway::{Applied, MutationGateway, MutationRequest};
pub use loader::{LoadMode, OverrideLoader, Resolved};
pub use logging::{init_logger, LogLevel, Logger};
pub use persist::Persister;
pub use propagate::{ChangeRecord, Propagator, ReplicationChannel};
pub use registry::{Origin, Registry, SettingListing};
pub use schema::{
    Mutability, RiskTier, SchemaBuilder, SettingDescriptor, SettingSchema, Validator,
};
pub use value::{CoercionError, SettingType, SettingValue};
