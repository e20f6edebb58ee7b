//! The fired-trigger ledger and scheduler-instance heartbeat rows.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Row};

use crate::error::{StoreError, StoreResult};
use crate::keys::{JobKey, TriggerKey};
use crate::model::{EntryState, FiredTriggerRecord, JobDetail, SchedulerStateRecord, Trigger};
use crate::store::sql::from_millis;
use crate::store::JobStore;

impl JobStore {
    /// Record a fire instance at acquisition time. Job columns stay unbound
    /// until the fire is dispatched.
    pub(crate) async fn insert_fired_trigger(
        &self,
        conn: &mut PgConnection,
        fire_instance_id: &str,
        trigger: &Trigger,
        fired_time: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(&self.sql.insert_fired_trigger)
            .bind(fire_instance_id)
            .bind(&trigger.key.name)
            .bind(&trigger.key.group)
            .bind(trigger.volatile)
            .bind(&self.config.instance_id)
            .bind(fired_time.timestamp_millis())
            .bind(EntryState::Acquired.as_str())
            .bind(Option::<String>::None)
            .bind(Option::<String>::None)
            .bind(false)
            .bind(false)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Upgrade a ledger entry to `EXECUTING`, binding the job it runs.
    pub(crate) async fn update_fired_trigger_to_executing(
        &self,
        conn: &mut PgConnection,
        fire_instance_id: &str,
        job: &JobDetail,
    ) -> StoreResult<()> {
        sqlx::query(&self.sql.update_fired_trigger)
            .bind(EntryState::Executing.as_str())
            .bind(&job.key.name)
            .bind(&job.key.group)
            .bind(job.stateful)
            .bind(job.requests_recovery)
            .bind(fire_instance_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn delete_fired_trigger(
        &self,
        conn: &mut PgConnection,
        fire_instance_id: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(&self.sql.delete_fired_trigger)
            .bind(fire_instance_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Ledger entries for one trigger, or for a whole trigger group when
    /// `name` is `None`.
    pub async fn fired_trigger_records(
        &self,
        conn: &mut PgConnection,
        name: Option<&str>,
        group: &str,
    ) -> StoreResult<Vec<FiredTriggerRecord>> {
        let rows = match name {
            Some(name) => {
                sqlx::query(&self.sql.select_fired_trigger)
                    .bind(name)
                    .bind(group)
                    .fetch_all(&mut *conn)
                    .await?
            }
            None => {
                sqlx::query(&self.sql.select_fired_trigger_group)
                    .bind(group)
                    .fetch_all(&mut *conn)
                    .await?
            }
        };
        rows.iter().map(fired_record_from_row).collect()
    }

    /// Ledger entries for one job, or for a whole job group when `name` is
    /// `None`.
    pub async fn fired_trigger_records_for_job(
        &self,
        conn: &mut PgConnection,
        name: Option<&str>,
        group: &str,
    ) -> StoreResult<Vec<FiredTriggerRecord>> {
        let rows = match name {
            Some(name) => {
                sqlx::query(&self.sql.select_fired_triggers_of_job)
                    .bind(name)
                    .bind(group)
                    .fetch_all(&mut *conn)
                    .await?
            }
            None => {
                sqlx::query(&self.sql.select_fired_triggers_of_job_group)
                    .bind(group)
                    .fetch_all(&mut *conn)
                    .await?
            }
        };
        rows.iter().map(fired_record_from_row).collect()
    }

    /// Every ledger entry owned by one scheduler instance.
    pub async fn fired_trigger_records_for_instance(
        &self,
        conn: &mut PgConnection,
        instance_id: &str,
    ) -> StoreResult<Vec<FiredTriggerRecord>> {
        let rows = sqlx::query(&self.sql.select_instance_fired_triggers)
            .bind(instance_id)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(fired_record_from_row).collect()
    }

    pub async fn delete_instance_fired_triggers(
        &self,
        conn: &mut PgConnection,
        instance_id: &str,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.delete_instance_fired_triggers)
            .bind(instance_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_volatile_fired_triggers(
        &self,
        conn: &mut PgConnection,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.delete_volatile_fired_triggers)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of currently executing fire instances for a job.
    pub async fn job_execution_count(
        &self,
        conn: &mut PgConnection,
        job_key: &JobKey,
    ) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&self.sql.select_job_execution_count)
            .bind(&job_key.name)
            .bind(&job_key.group)
            .bind(EntryState::Executing.as_str())
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    // ------------------------------------------------------------------
    // scheduler-instance heartbeats
    // ------------------------------------------------------------------

    pub(crate) async fn insert_scheduler_state(
        &self,
        conn: &mut PgConnection,
        checkin_time: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(&self.sql.insert_scheduler_state)
            .bind(&self.config.instance_id)
            .bind(checkin_time.timestamp_millis())
            .bind(self.config.checkin_interval_ms())
            .bind(Option::<String>::None)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Refresh this instance's heartbeat. A zero row count means the row is
    /// missing and must be re-inserted.
    pub(crate) async fn update_scheduler_checkin(
        &self,
        conn: &mut PgConnection,
        checkin_time: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_scheduler_checkin)
            .bind(checkin_time.timestamp_millis())
            .bind(&self.config.instance_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Atomically claim recovery of a failed peer. Only one instance in the
    /// cluster observes a non-zero row count.
    pub(crate) async fn claim_recovery(
        &self,
        conn: &mut PgConnection,
        failed_instance_id: &str,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_scheduler_recoverer)
            .bind(&self.config.instance_id)
            .bind(failed_instance_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_scheduler_state(
        &self,
        conn: &mut PgConnection,
        instance_id: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(&self.sql.delete_scheduler_state)
            .bind(instance_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All heartbeat rows, or a single instance's when `instance_id` is
    /// given.
    pub async fn scheduler_state_records(
        &self,
        conn: &mut PgConnection,
        instance_id: Option<&str>,
    ) -> StoreResult<Vec<SchedulerStateRecord>> {
        let rows = match instance_id {
            Some(id) => {
                sqlx::query(&self.sql.select_scheduler_state)
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await?
            }
            None => {
                sqlx::query(&self.sql.select_scheduler_states)
                    .fetch_all(&mut *conn)
                    .await?
            }
        };
        Ok(rows
            .iter()
            .map(|row| SchedulerStateRecord {
                instance_id: row.get("instance_name"),
                checkin_timestamp: from_millis(row.get("last_checkin_time"))
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                checkin_interval_ms: row.get("checkin_interval"),
                recoverer: row.get("recoverer"),
            })
            .collect())
    }
}

fn fired_record_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<FiredTriggerRecord> {
    let raw_state: String = row.get("entry_state");
    let state = EntryState::parse(&raw_state).ok_or_else(|| {
        StoreError::Persistence(format!("fired trigger entry has unknown state '{raw_state}'"))
    })?;
    // job columns are only meaningful once the entry reached EXECUTING
    let (job_key, is_stateful, requests_recovery) = if state == EntryState::Executing {
        let name: Option<String> = row.get("job_name");
        let group: Option<String> = row.get("job_group");
        (
            name.zip(group).map(|(n, g)| JobKey::new(n, g)),
            row.get("is_stateful"),
            row.get("requests_recovery"),
        )
    } else {
        (None, false, false)
    };
    Ok(FiredTriggerRecord {
        fire_instance_id: row.get("entry_id"),
        trigger_key: TriggerKey::new(
            row.get::<String, _>("trigger_name"),
            row.get::<String, _>("trigger_group"),
        ),
        is_volatile: row.get("is_volatile"),
        instance_id: row.get("instance_name"),
        fired_time: from_millis(row.get("fired_time")).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        state,
        job_key,
        is_stateful,
        requests_recovery,
    })
}
