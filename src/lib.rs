//! Chime — the persistent store behind a clustered job scheduler.
//!
//! Jobs, triggers and calendars live in PostgreSQL; any number of scheduler
//! instances share the same tables and coordinate purely through them. The
//! store guarantees that each scheduled fire is claimed by exactly one
//! instance, detects peers that stop heartbeating, and re-runs the work
//! they left behind.
//!
//! ## Key pieces
//!
//! - [`JobStore`]: repositories for jobs/triggers/calendars, the trigger
//!   state machine, acquisition and completion. Every operation takes a
//!   caller-owned transaction; the store never commits on its own.
//! - [`cluster::ClusterManager`]: the per-instance heartbeat/recovery loop.
//!   It owns its transactions and swallows tick failures.
//! - [`JobDataMap`] and the codec: job payload data, stored either as an
//!   opaque binary blob or as string-only property text.
//!
//! ## Connection
//!
//! Callers hold the `sqlx` pool. A typical transactional call site:
//!
//! ```text
//! let mut tx = pool.begin().await?;
//! store.store_job(&mut tx, &job, false).await?;
//! store.store_trigger(&mut tx, &trigger, false).await?;
//! tx.commit().await?;
//! ```

pub mod cluster;
pub mod codec;
pub mod config;
pub mod datamap;
pub mod error;
pub mod keys;
pub mod model;
pub mod resolver;
pub mod store;

pub use config::{StoreConfig, DEFAULT_TABLE_PREFIX};
pub use datamap::JobDataMap;
pub use error::{StoreError, StoreResult};
pub use keys::{JobKey, Key, TriggerKey};
pub use model::{
    misfire_policy, Calendar, CompletedInstruction, EntryState, FiredTriggerRecord, JobDetail,
    SchedulerStateRecord, Trigger, TriggerKind, TriggerState, TriggerStatus,
};
pub use resolver::{AcceptAllResolver, ClassResolver};
pub use store::{
    AcquiredTrigger, JobStore, TriggerFiredBundle, LOCK_STATE_ACCESS, LOCK_TRIGGER_ACCESS,
};

/// Reserved trigger group holding synthetic re-run triggers for jobs
/// orphaned by a failed instance. Shared with the hosting scheduler.
pub const RECOVERY_GROUP: &str = "RECOVERING_JOBS";

/// Job-data key naming the original trigger of a recovered job.
pub const FAILED_JOB_ORIG_TRIGGER_NAME_KEY: &str = "QRTZ_FAILED_JOB_ORIG_TRIGGER_NAME";
/// Job-data key naming the original trigger group of a recovered job.
pub const FAILED_JOB_ORIG_TRIGGER_GROUP_KEY: &str = "QRTZ_FAILED_JOB_ORIG_TRIGGER_GROUP";
/// Job-data key carrying the original scheduled fire time of a recovered
/// job, in epoch milliseconds.
pub const FAILED_JOB_ORIG_TRIGGER_FIRETIME_KEY: &str =
    "QRTZ_FAILED_JOB_ORIG_TRIGGER_FIRETIME_IN_MILLISECONDS";
