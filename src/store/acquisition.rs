//! Trigger acquisition, fire dispatch and completion.
//!
//! Acquisition claims `WAITING` triggers with a conditional update; exactly
//! one instance in the cluster observes a non-zero row count per fire, so
//! no locks are needed on the hot path.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Row};

use crate::error::{StoreError, StoreResult};
use crate::keys::{new_fire_instance_id, JobKey, TriggerKey};
use crate::model::{CompletedInstruction, JobDetail, Trigger, TriggerState};
use crate::store::sql::from_millis;
use crate::store::JobStore;
use crate::RECOVERY_GROUP;

/// A trigger claimed by this instance, paired with its ledger entry id.
#[derive(Debug, Clone)]
pub struct AcquiredTrigger {
    pub fire_instance_id: String,
    pub trigger: Trigger,
}

/// Everything the executor needs to run one fire.
#[derive(Debug, Clone)]
pub struct TriggerFiredBundle {
    /// The trigger, already advanced past this fire.
    pub trigger: Trigger,
    pub job: JobDetail,
    /// Wall-clock instant of dispatch.
    pub fire_time: DateTime<Utc>,
    /// The instant the fire was scheduled for.
    pub scheduled_fire_time: Option<DateTime<Utc>>,
    /// True when this fire replays work orphaned by a failed instance.
    pub recovering: bool,
}

impl JobStore {
    /// Claim up to `max_count` waiting triggers due no later than
    /// `no_later_than`, oldest fire time first. Candidates lost to a racing
    /// instance are skipped; each claim inserts an `ACQUIRED` ledger entry
    /// owned by this instance. At most one trigger per stateful job is
    /// claimed per batch, so a single call cannot put two triggers of a
    /// serialized job in flight.
    pub async fn acquire_next_triggers(
        &self,
        conn: &mut PgConnection,
        no_later_than: DateTime<Utc>,
        max_count: i64,
    ) -> StoreResult<Vec<AcquiredTrigger>> {
        let candidates = sqlx::query(&self.sql.select_triggers_to_acquire)
            .bind(TriggerState::Waiting.as_str())
            .bind(no_later_than.timestamp_millis())
            .bind(max_count)
            .fetch_all(&mut *conn)
            .await?;

        let mut stateful_jobs_claimed: HashSet<JobKey> = HashSet::new();
        let mut acquired = Vec::new();
        for row in candidates {
            let key = TriggerKey::new(
                row.get::<String, _>("trigger_name"),
                row.get::<String, _>("trigger_group"),
            );
            let Some(job) = self.job_ref_for_trigger(conn, &key).await? else {
                continue;
            };
            if job.stateful && stateful_jobs_claimed.contains(&job.key) {
                // a trigger of this serialized job is already in this batch
                continue;
            }
            let claimed = self
                .update_trigger_state_from_state(
                    conn,
                    &key,
                    TriggerState::Acquired,
                    TriggerState::Waiting,
                )
                .await?;
            if claimed == 0 {
                // another instance won this trigger
                continue;
            }
            let Some(trigger) = self.retrieve_trigger(conn, &key).await? else {
                continue;
            };
            let Some(fired_time) = from_millis(row.get("next_fire_time")) else {
                continue;
            };
            let fire_instance_id = new_fire_instance_id();
            self.insert_fired_trigger(conn, &fire_instance_id, &trigger, fired_time)
                .await?;
            if job.stateful {
                stateful_jobs_claimed.insert(job.key);
            }
            tracing::debug!(trigger = %key, fire_instance_id, "acquired trigger");
            acquired.push(AcquiredTrigger {
                fire_instance_id,
                trigger,
            });
        }
        Ok(acquired)
    }

    /// Hand a claimed trigger back without firing it: the claim reverts to
    /// `WAITING` and the ledger entry is dropped.
    pub async fn release_acquired_trigger(
        &self,
        conn: &mut PgConnection,
        acquired: &AcquiredTrigger,
    ) -> StoreResult<()> {
        self.update_trigger_state_from_state(
            conn,
            &acquired.trigger.key,
            TriggerState::Waiting,
            TriggerState::Acquired,
        )
        .await?;
        self.delete_fired_trigger(conn, &acquired.fire_instance_id)
            .await?;
        Ok(())
    }

    /// Dispatch a fire: upgrade the ledger entry to `EXECUTING`, advance
    /// the trigger and move its state per the state machine. Returns `None`
    /// when the trigger vanished or was un-acquired since the claim (a
    /// benign race, not an error) or when its calendar has been deleted.
    pub async fn trigger_fired(
        &self,
        conn: &mut PgConnection,
        acquired: &AcquiredTrigger,
    ) -> StoreResult<Option<TriggerFiredBundle>> {
        let state = self.trigger_state(conn, &acquired.trigger.key).await?;
        if state != TriggerState::Acquired {
            // the claim was lost (deleted, paused or blocked since); the
            // ledger entry goes with it
            self.delete_fired_trigger(conn, &acquired.fire_instance_id)
                .await?;
            return Ok(None);
        }
        let Some(job) = self.retrieve_job(conn, &acquired.trigger.job_key).await? else {
            return Err(StoreError::Persistence(format!(
                "job {} of fired trigger {} no longer exists",
                acquired.trigger.job_key, acquired.trigger.key
            )));
        };
        if let Some(calendar_name) = &acquired.trigger.calendar_name {
            if !self.calendar_exists(conn, calendar_name).await? {
                self.delete_fired_trigger(conn, &acquired.fire_instance_id)
                    .await?;
                return Ok(None);
            }
        }

        self.update_fired_trigger_to_executing(conn, &acquired.fire_instance_id, &job)
            .await?;

        let mut trigger = acquired.trigger.clone();
        let scheduled_fire_time = trigger.next_fire_time;
        trigger.triggered();

        let mut state = TriggerState::Waiting;
        if job.stateful {
            // serialize this job: every other eligible trigger of it blocks
            state = TriggerState::Blocked;
            self.update_trigger_states_for_job_from_state(
                conn,
                &job.key,
                TriggerState::Blocked,
                TriggerState::Waiting,
            )
            .await?;
            self.update_trigger_states_for_job_from_state(
                conn,
                &job.key,
                TriggerState::Blocked,
                TriggerState::Acquired,
            )
            .await?;
            self.update_trigger_states_for_job_from_state(
                conn,
                &job.key,
                TriggerState::PausedBlocked,
                TriggerState::Paused,
            )
            .await?;
        }
        if trigger.next_fire_time.is_none() {
            state = TriggerState::Complete;
        }
        self.update_trigger_row(conn, &trigger, state).await?;

        let recovering = trigger.key.group == RECOVERY_GROUP;
        Ok(Some(TriggerFiredBundle {
            trigger,
            job,
            fire_time: Utc::now(),
            scheduled_fire_time,
            recovering,
        }))
    }

    /// Finish a fire: apply the executor's instruction, unblock stateful
    /// siblings, persist dirty job data and drop the ledger entry.
    pub async fn triggered_job_complete(
        &self,
        conn: &mut PgConnection,
        acquired: &AcquiredTrigger,
        job: &JobDetail,
        instruction: CompletedInstruction,
    ) -> StoreResult<()> {
        let key = &acquired.trigger.key;
        match instruction {
            CompletedInstruction::NoInstruction => {}
            CompletedInstruction::DeleteTrigger => {
                // don't delete a trigger that was rescheduled while the job
                // ran: only remove when both views agree it is exhausted
                if acquired.trigger.next_fire_time.is_some() {
                    self.remove_trigger(conn, key).await?;
                } else {
                    let stored = self.trigger_status(conn, key).await?;
                    if stored.map_or(false, |s| s.next_fire_time.is_none()) {
                        self.remove_trigger(conn, key).await?;
                    }
                }
            }
            CompletedInstruction::SetTriggerComplete => {
                self.update_trigger_state(conn, key, TriggerState::Complete)
                    .await?;
            }
            CompletedInstruction::SetTriggerError => {
                tracing::warn!(trigger = %key, "trigger completed with error instruction");
                self.update_trigger_state(conn, key, TriggerState::Error)
                    .await?;
            }
            CompletedInstruction::SetAllJobTriggersComplete => {
                self.update_trigger_states_for_job(conn, &job.key, TriggerState::Complete)
                    .await?;
            }
            CompletedInstruction::SetAllJobTriggersError => {
                tracing::warn!(job = %job.key, "all job triggers set to error state");
                self.update_trigger_states_for_job(conn, &job.key, TriggerState::Error)
                    .await?;
            }
        }

        if job.stateful {
            self.update_trigger_states_for_job_from_state(
                conn,
                &job.key,
                TriggerState::Waiting,
                TriggerState::Blocked,
            )
            .await?;
            self.update_trigger_states_for_job_from_state(
                conn,
                &job.key,
                TriggerState::Paused,
                TriggerState::PausedBlocked,
            )
            .await?;
            if job.job_data.is_dirty() {
                self.update_job_data(conn, job).await?;
            }
        }

        self.delete_fired_trigger(conn, &acquired.fire_instance_id)
            .await?;
        Ok(())
    }
}
