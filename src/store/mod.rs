//! The JDBC-style job store: repositories, state machine, acquisition and
//! recovery, all speaking to PostgreSQL through a caller-owned transaction.

mod acquisition;
mod calendars;
mod fired;
mod jobs;
mod lock;
mod misfire;
mod schema;
pub(crate) mod sql;
mod triggers;

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

pub use acquisition::{AcquiredTrigger, TriggerFiredBundle};
pub use lock::{LOCK_STATE_ACCESS, LOCK_TRIGGER_ACCESS};
pub use schema::ensure_schema;

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::keys::TriggerKey;
use crate::model::{misfire_policy, FiredTriggerRecord, Trigger, TriggerState};
use crate::resolver::{AcceptAllResolver, ClassResolver};
use crate::{
    FAILED_JOB_ORIG_TRIGGER_FIRETIME_KEY, FAILED_JOB_ORIG_TRIGGER_GROUP_KEY,
    FAILED_JOB_ORIG_TRIGGER_NAME_KEY, RECOVERY_GROUP,
};

/// The store core. Cheap to clone behind an `Arc`; holds no connection —
/// every operation runs inside a transaction owned by the caller, which is
/// responsible for commit and rollback.
pub struct JobStore {
    pub(crate) sql: sql::Sql,
    pub(crate) config: StoreConfig,
    pub(crate) resolver: Arc<dyn ClassResolver>,
}

impl JobStore {
    pub fn new(config: StoreConfig) -> Self {
        Self::with_resolver(config, Arc::new(AcceptAllResolver))
    }

    pub fn with_resolver(config: StoreConfig, resolver: Arc<dyn ClassResolver>) -> Self {
        Self {
            sql: sql::Sql::new(&config.table_prefix),
            config,
            resolver,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn instance_id(&self) -> &str {
        &self.config.instance_id
    }

    pub(crate) fn use_properties(&self) -> bool {
        self.config.use_properties
    }

    /// Create the schema for this store's table prefix.
    pub async fn ensure_schema(&self, conn: &mut PgConnection) -> StoreResult<()> {
        schema::ensure_schema(conn, &self.config.table_prefix).await
    }

    /// Recover work orphaned by this instance's previous incarnation:
    /// release stale claims, handle misfires accrued while down, replay
    /// recoverable fire instances and drop this instance's ledger entries.
    pub async fn recover_own_jobs(&self, conn: &mut PgConnection) -> StoreResult<()> {
        let released = self
            .update_trigger_states_from_other_states(
                conn,
                TriggerState::Waiting,
                TriggerState::Acquired,
                TriggerState::Blocked,
            )
            .await?;
        self.update_trigger_states_from_other_states(
            conn,
            TriggerState::Paused,
            TriggerState::PausedBlocked,
            TriggerState::PausedBlocked,
        )
        .await?;
        tracing::info!(released, "released stale trigger claims");

        self.recover_misfires(conn, Utc::now()).await?;

        let records = self
            .fired_trigger_records_for_instance(conn, &self.config.instance_id)
            .await?;
        let mut recovered = 0;
        for record in &records {
            if record.is_volatile {
                continue;
            }
            if let Some(trigger) = self.recovery_trigger_for(conn, record).await? {
                self.insert_trigger_in_state(conn, &trigger, TriggerState::Waiting)
                    .await?;
                recovered += 1;
            }
        }
        self.delete_instance_fired_triggers(conn, &self.config.instance_id)
            .await?;
        tracing::info!(
            in_flight = records.len(),
            recovered,
            "recovered own fire instances"
        );
        Ok(())
    }

    /// Drop volatile state: fired entries, triggers and jobs flagged as not
    /// surviving a restart.
    pub async fn clean_volatile_triggers_and_jobs(
        &self,
        conn: &mut PgConnection,
    ) -> StoreResult<()> {
        self.delete_volatile_fired_triggers(conn).await?;
        for key in self.volatile_trigger_keys(conn).await? {
            self.remove_trigger(conn, &key).await?;
        }
        for key in self.volatile_job_keys(conn).await? {
            self.remove_job(conn, &key).await?;
        }
        Ok(())
    }

    /// Build the synthetic recovery trigger for an orphaned fire instance,
    /// or `None` when its job does not request recovery (or is gone).
    ///
    /// Entries still in `ACQUIRED` carry no bound job columns, so the job
    /// flags are resolved through the trigger row instead.
    pub(crate) async fn recovery_trigger_for(
        &self,
        conn: &mut PgConnection,
        record: &FiredTriggerRecord,
    ) -> StoreResult<Option<Trigger>> {
        let (job_key, requests_recovery) = match &record.job_key {
            Some(key) => (key.clone(), record.requests_recovery),
            None => match self.job_ref_for_trigger(conn, &record.trigger_key).await? {
                Some(job) => (job.key, job.requests_recovery),
                None => return Ok(None),
            },
        };
        if !requests_recovery {
            return Ok(None);
        }

        let mut job_data = self
            .retrieve_trigger_data_map(conn, &record.trigger_key)
            .await?;
        job_data.put(
            FAILED_JOB_ORIG_TRIGGER_NAME_KEY,
            record.trigger_key.name.clone(),
        );
        job_data.put(
            FAILED_JOB_ORIG_TRIGGER_GROUP_KEY,
            record.trigger_key.group.clone(),
        );
        job_data.put(
            FAILED_JOB_ORIG_TRIGGER_FIRETIME_KEY,
            record.fired_time.timestamp_millis(),
        );

        let name = format!(
            "recover_{}_{}",
            record.instance_id,
            Uuid::new_v4().simple()
        );
        let mut trigger = Trigger::new_simple(
            TriggerKey::new(name, RECOVERY_GROUP),
            job_key,
            record.fired_time,
            0,
            0,
        );
        trigger.misfire_instruction = misfire_policy::FIRE_NOW;
        trigger.job_data = job_data;
        Ok(Some(trigger))
    }
}
