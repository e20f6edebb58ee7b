//! Cluster membership and failure recovery.
//!
//! Every instance runs one `ClusterManager`. On each tick it refreshes its
//! own heartbeat row, looks for peers whose heartbeats have gone stale, and
//! recovers the work a dead peer left in flight: claimed triggers are
//! released, stateful-job blocks are lifted, and recoverable jobs are
//! re-run through synthetic triggers in the recovery group.
//!
//! Errors during a tick are logged and retried on the next one; they never
//! take the hosting scheduler down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StoreResult;
use crate::model::{EntryState, SchedulerStateRecord, TriggerState};
use crate::store::{JobStore, LOCK_STATE_ACCESS, LOCK_TRIGGER_ACCESS};

pub struct ClusterManager {
    pool: PgPool,
    store: Arc<JobStore>,
    shutting_down: Arc<AtomicBool>,
}

impl ClusterManager {
    pub fn new(pool: PgPool, store: Arc<JobStore>) -> Self {
        Self {
            pool,
            store,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the check-in loop.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.store.config().cluster_checkin_interval);
            loop {
                ticker.tick().await;
                if self.shutting_down.load(Ordering::Relaxed) {
                    break;
                }
                if let Err(e) = self.check_in().await {
                    warn!(error = %e, "cluster check-in failed, retrying next tick");
                }
            }
        })
    }

    /// One check-in: refresh our heartbeat, detect failed peers and recover
    /// their orphaned work. Runs in a single transaction under the state
    /// lock (plus the trigger lock once recovery work exists).
    pub async fn check_in(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        self.store.obtain_lock(&mut tx, LOCK_STATE_ACCESS).await?;

        let now = Utc::now();
        if self.store.update_scheduler_checkin(&mut tx, now).await? == 0 {
            self.store.insert_scheduler_state(&mut tx, now).await?;
        }

        let records = self.store.scheduler_state_records(&mut tx, None).await?;
        let failed: Vec<&SchedulerStateRecord> = records
            .iter()
            .filter(|r| r.instance_id != self.store.instance_id() && r.is_failed_at(now))
            .collect();

        if !failed.is_empty() {
            self.store.obtain_lock(&mut tx, LOCK_TRIGGER_ACCESS).await?;
            for record in failed {
                self.recover_instance(&mut tx, record).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Recover one failed peer. The conditional recoverer claim makes sure
    /// a single surviving instance does the work even when several detect
    /// the failure in the same window.
    async fn recover_instance(
        &self,
        conn: &mut PgConnection,
        record: &SchedulerStateRecord,
    ) -> StoreResult<()> {
        if self.store.claim_recovery(conn, &record.instance_id).await? == 0 {
            debug!(instance = %record.instance_id, "recovery already claimed by a peer");
            return Ok(());
        }
        warn!(instance = %record.instance_id, "scheduler instance failed, recovering its work");

        let entries = self
            .store
            .fired_trigger_records_for_instance(conn, &record.instance_id)
            .await?;
        let mut released = 0u64;
        let mut recovered = 0usize;
        for entry in &entries {
            if entry.state == EntryState::Acquired {
                // claimed but never fired: hand the trigger back
                released += self
                    .store
                    .update_trigger_state_from_state(
                        conn,
                        &entry.trigger_key,
                        TriggerState::Waiting,
                        TriggerState::Acquired,
                    )
                    .await?;
            } else if entry.is_stateful {
                // the dead peer can no longer complete this job; unblock it
                if let Some(job_key) = &entry.job_key {
                    self.store
                        .update_trigger_states_for_job_from_state(
                            conn,
                            job_key,
                            TriggerState::Waiting,
                            TriggerState::Blocked,
                        )
                        .await?;
                    self.store
                        .update_trigger_states_for_job_from_state(
                            conn,
                            job_key,
                            TriggerState::Paused,
                            TriggerState::PausedBlocked,
                        )
                        .await?;
                }
            }
            if entry.is_volatile {
                continue;
            }
            if let Some(trigger) = self.store.recovery_trigger_for(conn, entry).await? {
                self.store
                    .insert_trigger_in_state(conn, &trigger, TriggerState::Waiting)
                    .await?;
                recovered += 1;
            }
        }

        self.store
            .delete_instance_fired_triggers(conn, &record.instance_id)
            .await?;
        self.store
            .delete_scheduler_state(conn, &record.instance_id)
            .await?;
        info!(
            instance = %record.instance_id,
            in_flight = entries.len(),
            released,
            recovered,
            "recovered failed scheduler instance"
        );
        Ok(())
    }

    /// Clean shutdown: stop the loop and retire this instance's heartbeat
    /// row so peers don't treat the exit as a failure.
    pub async fn shutdown(&self) -> StoreResult<()> {
        self.shutting_down.store(true, Ordering::Relaxed);
        let mut tx = self.pool.begin().await?;
        self.store
            .delete_scheduler_state(&mut tx, self.store.instance_id())
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
