//! Cluster propagation of runtime mutations.
//!
//! When the authoritative node applies a local mutation it broadcasts a
//! [`ChangeRecord`] over a [`ReplicationChannel`]; follower nodes feed
//! received records back through their own gateway so every member
//! converges on the same value and version. The channel itself (RPC,
//! edit log, gossip) is supplied by the embedding process; this module
//! only defines the hand-off seam.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gateway::{Applied, MutationGateway};

/// One runtime mutation, as it travels between cluster members.
///
/// The version is the authoritative node's post-apply counter; replicas
/// adopt it verbatim so that version numbers agree cluster-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Setting name.
    pub name: String,
    /// The value in canonical text form; replicas re-coerce it.
    pub raw_value: String,
    /// The authoritative post-apply version.
    pub version: u64,
}

/// Transport seam for broadcasting change records to other members.
///
/// Implementations must be safe to call from whichever thread applied
/// the mutation. Delivery retries and member tracking belong to the
/// implementation, not to the caller.
#[cfg_attr(test, mockall::automock)]
pub trait ReplicationChannel: Send + Sync {
    /// Hand a record to the transport for delivery to every other member.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be accepted for
    /// delivery. The local mutation has already been applied; the
    /// gateway reports this as a warning.
    fn publish(&self, record: &ChangeRecord) -> Result<()>;
}

/// Broadcasts local mutations and applies received ones.
pub struct Propagator {
    channel: Arc<dyn ReplicationChannel>,
}

impl Propagator {
    /// Create a propagator over a transport.
    #[must_use]
    pub fn new(channel: Arc<dyn ReplicationChannel>) -> Self {
        Self { channel }
    }

    /// Broadcast a locally applied mutation to the rest of the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PropagationFailure`] if the channel refused the
    /// record.
    pub fn broadcast(&self, record: &ChangeRecord) -> Result<()> {
        debug!(
            "broadcasting {} = {} (version {})",
            record.name, record.raw_value, record.version
        );
        self.channel
            .publish(record)
            .map_err(|err| Error::PropagationFailure {
                name: record.name.clone(),
                detail: err.to_string(),
            })
    }

    /// Apply a change record received from another member.
    ///
    /// Routes the record through
    /// [`MutationGateway::apply_replicated`]: coercion, mutability and
    /// validation are enforced on the replica exactly as they were on
    /// the sender, and the stale guard runs under the entry's write
    /// lock, so a record whose version is not newer than the local
    /// counter is dropped (`Ok(None)`) even while local mutations of
    /// the same setting race the delivery. Redelivery is idempotent.
    ///
    /// # Errors
    ///
    /// Propagates gateway rejections ([`Error::UnknownSetting`],
    /// [`Error::NotRuntimeMutable`], [`Error::TypeMismatch`],
    /// [`Error::ValidationFailed`]).
    pub fn on_receive(
        &self,
        gateway: &MutationGateway,
        record: ChangeRecord,
    ) -> Result<Option<Applied>> {
        gateway.apply_replicated(&record)
    }
}
