//! Store configuration.

use std::time::Duration;

use uuid::Uuid;

/// Default prefix applied to every table name.
pub const DEFAULT_TABLE_PREFIX: &str = "QRTZ_";

/// Configuration consumed by the store core.
///
/// `table_prefix` is substituted into every statement once at store
/// construction; `instance_id` identifies this scheduler instance in the
/// fired-trigger ledger and the heartbeat table.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prefix for all table names.
    pub table_prefix: String,
    /// Unique id of this scheduler instance within the cluster.
    pub instance_id: String,
    /// When true, job-data maps are persisted as key=value property text and
    /// constrained to string values; otherwise an opaque binary blob.
    pub use_properties: bool,
    /// How far past its fire time a waiting trigger may be before it is
    /// considered misfired.
    pub misfire_threshold: Duration,
    /// Cadence at which this instance refreshes its heartbeat row and scans
    /// for failed peers.
    pub cluster_checkin_interval: Duration,
}

impl StoreConfig {
    /// Configuration for the given instance id with default everything else.
    pub fn for_instance(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Self::default()
        }
    }

    pub(crate) fn misfire_threshold_ms(&self) -> i64 {
        self.misfire_threshold.as_millis() as i64
    }

    pub(crate) fn checkin_interval_ms(&self) -> i64 {
        self.cluster_checkin_interval.as_millis() as i64
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            instance_id: Uuid::new_v4().simple().to_string(),
            use_properties: false,
            misfire_threshold: Duration::from_secs(60),
            cluster_checkin_interval: Duration::from_millis(7500),
        }
    }
}
