//! Trigger repository and the conditional state-transition updates that
//! make the trigger state machine cluster-safe.
//!
//! Every legal transition is expressed as `SET TRIGGER_STATE = new WHERE
//! key AND TRIGGER_STATE IN (olds)`; the affected-row count is the race
//! resolver. A zero count is never an error.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Row};

use crate::codec::{deserialize_data_map, serialize_data_map};
use crate::datamap::JobDataMap;
use crate::error::{StoreError, StoreResult};
use crate::keys::{JobKey, TriggerKey};
use crate::model::{
    Trigger, TriggerKind, TriggerState, TriggerStatus, TRIGGER_TYPE_BLOB, TRIGGER_TYPE_CRON,
    TRIGGER_TYPE_SIMPLE,
};
use crate::store::sql::{from_millis, to_millis};
use crate::store::JobStore;

/// Sentinel row in the paused-groups table meaning "everything is paused".
pub(crate) const ALL_GROUPS_PAUSED: &str = "_$_ALL_GROUPS_PAUSED_$_";

#[derive(FromRow)]
struct TriggerBaseRow {
    job_name: String,
    job_group: String,
    is_volatile: bool,
    description: Option<String>,
    next_fire_time: i64,
    prev_fire_time: i64,
    trigger_type: String,
    start_time: i64,
    end_time: i64,
    calendar_name: Option<String>,
    misfire_instr: i32,
    job_data: Option<Vec<u8>>,
}

/// Job columns joined through a trigger row.
#[derive(Debug, Clone)]
pub(crate) struct JobRef {
    pub key: JobKey,
    pub durable: bool,
    pub stateful: bool,
    pub requests_recovery: bool,
}

impl JobStore {
    /// Store a trigger. The referenced job must exist. Fails with
    /// `ObjectAlreadyExists` when the key is taken and `replace_existing`
    /// is false.
    pub async fn store_trigger(
        &self,
        conn: &mut PgConnection,
        trigger: &Trigger,
        replace_existing: bool,
    ) -> StoreResult<()> {
        trigger.validate()?;
        let Some(stateful) = self.job_stateful(conn, &trigger.job_key).await? else {
            return Err(StoreError::Persistence(format!(
                "trigger {} references job {} which does not exist",
                trigger.key, trigger.job_key
            )));
        };

        let paused = self.is_trigger_group_paused(conn, &trigger.key.group).await?
            || self.is_trigger_group_paused(conn, ALL_GROUPS_PAUSED).await?;
        let blocked = stateful && self.job_execution_count(conn, &trigger.job_key).await? > 0;
        let state = match (paused, blocked) {
            (true, true) => TriggerState::PausedBlocked,
            (true, false) => TriggerState::Paused,
            (false, true) => TriggerState::Blocked,
            (false, false) => TriggerState::Waiting,
        };

        if self.trigger_exists(conn, &trigger.key).await? {
            if !replace_existing {
                return Err(StoreError::already_exists("trigger", trigger.key.to_string()));
            }
            self.update_trigger_row(conn, trigger, state).await
        } else {
            self.insert_trigger_in_state(conn, trigger, state).await
        }
    }

    pub(crate) async fn insert_trigger_in_state(
        &self,
        conn: &mut PgConnection,
        trigger: &Trigger,
        state: TriggerState,
    ) -> StoreResult<()> {
        let data = if trigger.job_data.is_empty() {
            None
        } else {
            Some(serialize_data_map(&trigger.job_data, self.use_properties())?)
        };
        sqlx::query(&self.sql.insert_trigger)
            .bind(&trigger.key.name)
            .bind(&trigger.key.group)
            .bind(&trigger.job_key.name)
            .bind(&trigger.job_key.group)
            .bind(trigger.volatile)
            .bind(&trigger.description)
            .bind(to_millis(trigger.next_fire_time))
            .bind(to_millis(trigger.prev_fire_time))
            .bind(state.as_str())
            .bind(trigger.kind.discriminator())
            .bind(trigger.start_time.timestamp_millis())
            .bind(to_millis(trigger.end_time))
            .bind(&trigger.calendar_name)
            .bind(trigger.misfire_instruction)
            .bind(&data)
            .execute(&mut *conn)
            .await?;
        self.insert_variant_row(conn, trigger).await?;
        self.insert_trigger_listeners(conn, trigger).await
    }

    /// Update the base row (and listeners and variant row). The job-data
    /// blob is rewritten only when the map is dirty.
    pub(crate) async fn update_trigger_row(
        &self,
        conn: &mut PgConnection,
        trigger: &Trigger,
        state: TriggerState,
    ) -> StoreResult<()> {
        if trigger.job_data.is_dirty() {
            let data = if trigger.job_data.is_empty() {
                None
            } else {
                Some(serialize_data_map(&trigger.job_data, self.use_properties())?)
            };
            sqlx::query(&self.sql.update_trigger)
                .bind(&trigger.job_key.name)
                .bind(&trigger.job_key.group)
                .bind(trigger.volatile)
                .bind(&trigger.description)
                .bind(to_millis(trigger.next_fire_time))
                .bind(to_millis(trigger.prev_fire_time))
                .bind(state.as_str())
                .bind(trigger.kind.discriminator())
                .bind(trigger.start_time.timestamp_millis())
                .bind(to_millis(trigger.end_time))
                .bind(&trigger.calendar_name)
                .bind(trigger.misfire_instruction)
                .bind(&data)
                .bind(&trigger.key.name)
                .bind(&trigger.key.group)
                .execute(&mut *conn)
                .await?;
        } else {
            sqlx::query(&self.sql.update_trigger_skip_data)
                .bind(&trigger.job_key.name)
                .bind(&trigger.job_key.group)
                .bind(trigger.volatile)
                .bind(&trigger.description)
                .bind(to_millis(trigger.next_fire_time))
                .bind(to_millis(trigger.prev_fire_time))
                .bind(state.as_str())
                .bind(trigger.kind.discriminator())
                .bind(trigger.start_time.timestamp_millis())
                .bind(to_millis(trigger.end_time))
                .bind(&trigger.calendar_name)
                .bind(trigger.misfire_instruction)
                .bind(&trigger.key.name)
                .bind(&trigger.key.group)
                .execute(&mut *conn)
                .await?;
        }

        sqlx::query(&self.sql.delete_trigger_listeners)
            .bind(&trigger.key.name)
            .bind(&trigger.key.group)
            .execute(&mut *conn)
            .await?;
        self.insert_trigger_listeners(conn, trigger).await?;
        self.update_variant_row(conn, trigger).await
    }

    async fn insert_variant_row(
        &self,
        conn: &mut PgConnection,
        trigger: &Trigger,
    ) -> StoreResult<()> {
        match &trigger.kind {
            TriggerKind::Simple {
                repeat_count,
                repeat_interval_ms,
                times_triggered,
            } => {
                sqlx::query(&self.sql.insert_simple_trigger)
                    .bind(&trigger.key.name)
                    .bind(&trigger.key.group)
                    .bind(repeat_count)
                    .bind(repeat_interval_ms)
                    .bind(times_triggered)
                    .execute(&mut *conn)
                    .await?;
            }
            TriggerKind::Cron {
                cron_expression,
                time_zone_id,
            } => {
                sqlx::query(&self.sql.insert_cron_trigger)
                    .bind(&trigger.key.name)
                    .bind(&trigger.key.group)
                    .bind(cron_expression)
                    .bind(time_zone_id)
                    .execute(&mut *conn)
                    .await?;
            }
            TriggerKind::Blob { payload } => {
                sqlx::query(&self.sql.insert_blob_trigger)
                    .bind(&trigger.key.name)
                    .bind(&trigger.key.group)
                    .bind(payload)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_variant_row(
        &self,
        conn: &mut PgConnection,
        trigger: &Trigger,
    ) -> StoreResult<()> {
        match &trigger.kind {
            TriggerKind::Simple {
                repeat_count,
                repeat_interval_ms,
                times_triggered,
            } => {
                sqlx::query(&self.sql.update_simple_trigger)
                    .bind(repeat_count)
                    .bind(repeat_interval_ms)
                    .bind(times_triggered)
                    .bind(&trigger.key.name)
                    .bind(&trigger.key.group)
                    .execute(&mut *conn)
                    .await?;
            }
            TriggerKind::Cron {
                cron_expression,
                time_zone_id,
            } => {
                sqlx::query(&self.sql.update_cron_trigger)
                    .bind(cron_expression)
                    .bind(time_zone_id)
                    .bind(&trigger.key.name)
                    .bind(&trigger.key.group)
                    .execute(&mut *conn)
                    .await?;
            }
            TriggerKind::Blob { payload } => {
                sqlx::query(&self.sql.update_blob_trigger)
                    .bind(payload)
                    .bind(&trigger.key.name)
                    .bind(&trigger.key.group)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn insert_trigger_listeners(
        &self,
        conn: &mut PgConnection,
        trigger: &Trigger,
    ) -> StoreResult<()> {
        for listener in &trigger.listeners {
            sqlx::query(&self.sql.insert_trigger_listener)
                .bind(&trigger.key.name)
                .bind(&trigger.key.group)
                .bind(listener)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Materialize a trigger: base row, variant dispatch on the stored
    /// discriminator, joined variant row, data map and listeners.
    pub async fn retrieve_trigger(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<Option<Trigger>> {
        let row = sqlx::query_as::<_, TriggerBaseRow>(&self.sql.select_trigger)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let kind = match row.trigger_type.as_str() {
            TRIGGER_TYPE_SIMPLE => {
                let variant = sqlx::query(&self.sql.select_simple_trigger)
                    .bind(&key.name)
                    .bind(&key.group)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| missing_variant(key, TRIGGER_TYPE_SIMPLE))?;
                TriggerKind::Simple {
                    repeat_count: variant.get("repeat_count"),
                    repeat_interval_ms: variant.get("repeat_interval"),
                    times_triggered: variant.get("times_triggered"),
                }
            }
            TRIGGER_TYPE_CRON => {
                let variant = sqlx::query(&self.sql.select_cron_trigger)
                    .bind(&key.name)
                    .bind(&key.group)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| missing_variant(key, TRIGGER_TYPE_CRON))?;
                TriggerKind::Cron {
                    cron_expression: variant.get("cron_expression"),
                    time_zone_id: variant
                        .get::<Option<String>, _>("time_zone_id")
                        .unwrap_or_else(|| "UTC".to_string()),
                }
            }
            TRIGGER_TYPE_BLOB => {
                let variant = sqlx::query(&self.sql.select_blob_trigger)
                    .bind(&key.name)
                    .bind(&key.group)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| missing_variant(key, TRIGGER_TYPE_BLOB))?;
                TriggerKind::Blob {
                    payload: variant
                        .get::<Option<Vec<u8>>, _>("blob_data")
                        .unwrap_or_default(),
                }
            }
            other => {
                return Err(StoreError::Persistence(format!(
                    "trigger {key} has unknown variant discriminator '{other}'"
                )))
            }
        };

        let job_data = match &row.job_data {
            Some(bytes) => deserialize_data_map(bytes, self.use_properties())?,
            None => JobDataMap::new(),
        };
        let listeners = self.trigger_listeners(conn, key).await?;
        let start_time = from_millis(row.start_time).unwrap_or(DateTime::UNIX_EPOCH);

        Ok(Some(Trigger {
            key: key.clone(),
            job_key: JobKey::new(row.job_name, row.job_group),
            description: row.description,
            volatile: row.is_volatile,
            start_time,
            end_time: from_millis(row.end_time),
            next_fire_time: from_millis(row.next_fire_time),
            prev_fire_time: from_millis(row.prev_fire_time),
            calendar_name: row.calendar_name,
            misfire_instruction: row.misfire_instr,
            job_data,
            listeners,
            kind,
        }))
    }

    /// A trigger's data map alone; empty when the blob is null or the
    /// trigger is gone.
    pub async fn retrieve_trigger_data_map(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<JobDataMap> {
        let row = sqlx::query(&self.sql.select_trigger_data)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        match row.and_then(|r| r.get::<Option<Vec<u8>>, _>("job_data")) {
            Some(bytes) => deserialize_data_map(&bytes, self.use_properties()),
            None => Ok(JobDataMap::new()),
        }
    }

    /// Remove a trigger and, when it was the last trigger of a non-durable
    /// job, that job too. Returns whether the trigger row existed.
    pub async fn remove_trigger(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<bool> {
        let job = self.job_ref_for_trigger(conn, key).await?;
        let existed = self.delete_trigger_rows(conn, key).await?;
        if existed {
            if let Some(job) = job {
                if !job.durable && self.num_triggers_for_job(conn, &job.key).await? == 0 {
                    self.delete_job_rows(conn, &job.key).await?;
                }
            }
        }
        Ok(existed)
    }

    /// Delete the base row and everything hanging off it: listeners, all
    /// variant rows, fired-trigger entries.
    pub(crate) async fn delete_trigger_rows(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<bool> {
        for statement in [
            &self.sql.delete_trigger_listeners,
            &self.sql.delete_simple_trigger,
            &self.sql.delete_cron_trigger,
            &self.sql.delete_blob_trigger,
            &self.sql.delete_fired_triggers_of_trigger,
        ] {
            sqlx::query(statement)
                .bind(&key.name)
                .bind(&key.group)
                .execute(&mut *conn)
                .await?;
        }
        let result = sqlx::query(&self.sql.delete_trigger)
            .bind(&key.name)
            .bind(&key.group)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn trigger_exists(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<bool> {
        let row = sqlx::query(&self.sql.select_trigger_exists)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }

    /// The persisted state, or `Deleted` when the row is absent.
    pub async fn trigger_state(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<TriggerState> {
        let row = sqlx::query(&self.sql.select_trigger_state)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            None => Ok(TriggerState::Deleted),
            Some(row) => {
                let raw: String = row.get("trigger_state");
                TriggerState::parse(&raw).ok_or_else(|| {
                    StoreError::Persistence(format!("trigger {key} has unknown state '{raw}'"))
                })
            }
        }
    }

    pub async fn trigger_status(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<Option<TriggerStatus>> {
        let row = sqlx::query(&self.sql.select_trigger_status)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.get("trigger_state");
        let state = TriggerState::parse(&raw).ok_or_else(|| {
            StoreError::Persistence(format!("trigger {key} has unknown state '{raw}'"))
        })?;
        Ok(Some(TriggerStatus {
            key: key.clone(),
            job_key: JobKey::new(
                row.get::<String, _>("job_name"),
                row.get::<String, _>("job_group"),
            ),
            state,
            next_fire_time: from_millis(row.get("next_fire_time")),
        }))
    }

    // ------------------------------------------------------------------
    // pause / resume
    // ------------------------------------------------------------------

    /// Pause a single trigger: `WAITING`/`ACQUIRED` become `PAUSED`,
    /// `BLOCKED` becomes `PAUSED_BLOCKED`.
    pub async fn pause_trigger(&self, conn: &mut PgConnection, key: &TriggerKey) -> StoreResult<()> {
        self.update_trigger_state_from_states(
            conn,
            key,
            TriggerState::Paused,
            [
                TriggerState::Waiting,
                TriggerState::Acquired,
                TriggerState::Waiting,
            ],
        )
        .await?;
        self.update_trigger_state_from_state(
            conn,
            key,
            TriggerState::PausedBlocked,
            TriggerState::Blocked,
        )
        .await?;
        Ok(())
    }

    /// Resume a paused trigger, applying the misfire policy when its fire
    /// time passed while paused.
    pub async fn resume_trigger(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<bool> {
        let Some(status) = self.trigger_status(conn, key).await? else {
            return Ok(false);
        };
        if status.state != TriggerState::Paused && status.state != TriggerState::PausedBlocked {
            return Ok(false);
        }
        let new_state = if status.state == TriggerState::PausedBlocked {
            TriggerState::Blocked
        } else {
            TriggerState::Waiting
        };

        let now = Utc::now();
        let misfired = status
            .next_fire_time
            .map_or(false, |next| next + self.config.misfire_threshold < now);
        if misfired {
            if let Some(mut trigger) = self.retrieve_trigger(conn, key).await? {
                trigger.apply_misfire(now);
                let state = if trigger.next_fire_time.is_none() {
                    TriggerState::Complete
                } else {
                    new_state
                };
                self.update_trigger_row(conn, &trigger, state).await?;
                return Ok(true);
            }
        }

        let updated = self
            .update_trigger_state_from_states(
                conn,
                key,
                new_state,
                [
                    TriggerState::Paused,
                    TriggerState::PausedBlocked,
                    TriggerState::Paused,
                ],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Pause every trigger in a group and remember the group as paused so
    /// later inserts land in `PAUSED`.
    pub async fn pause_trigger_group(
        &self,
        conn: &mut PgConnection,
        group: &str,
    ) -> StoreResult<()> {
        sqlx::query(&self.sql.update_trigger_group_state_from_states)
            .bind(TriggerState::Paused.as_str())
            .bind(group)
            .bind(TriggerState::Waiting.as_str())
            .bind(TriggerState::Acquired.as_str())
            .bind(TriggerState::Waiting.as_str())
            .execute(&mut *conn)
            .await?;
        sqlx::query(&self.sql.update_trigger_group_state_from_state)
            .bind(TriggerState::PausedBlocked.as_str())
            .bind(group)
            .bind(TriggerState::Blocked.as_str())
            .execute(&mut *conn)
            .await?;
        if !self.is_trigger_group_paused(conn, group).await? {
            sqlx::query(&self.sql.insert_paused_group)
                .bind(group)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Resume every trigger in a paused group, trigger by trigger so each
    /// gets its misfire check.
    pub async fn resume_trigger_group(
        &self,
        conn: &mut PgConnection,
        group: &str,
    ) -> StoreResult<()> {
        sqlx::query(&self.sql.delete_paused_group)
            .bind(group)
            .execute(&mut *conn)
            .await?;
        for name in self.trigger_names_in_group(conn, group).await? {
            self.resume_trigger(conn, &TriggerKey::new(name, group))
                .await?;
        }
        Ok(())
    }

    /// Pause every known trigger group plus the all-groups sentinel.
    pub async fn pause_all(&self, conn: &mut PgConnection) -> StoreResult<()> {
        for group in self.trigger_group_names(conn).await? {
            self.pause_trigger_group(conn, &group).await?;
        }
        if !self.is_trigger_group_paused(conn, ALL_GROUPS_PAUSED).await? {
            sqlx::query(&self.sql.insert_paused_group)
                .bind(ALL_GROUPS_PAUSED)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Resume every group and clear all paused-group rows.
    pub async fn resume_all(&self, conn: &mut PgConnection) -> StoreResult<()> {
        for group in self.trigger_group_names(conn).await? {
            self.resume_trigger_group(conn, &group).await?;
        }
        sqlx::query(&self.sql.delete_all_paused_groups)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn is_trigger_group_paused(
        &self,
        conn: &mut PgConnection,
        group: &str,
    ) -> StoreResult<bool> {
        let row = sqlx::query(&self.sql.select_paused_group)
            .bind(group)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }

    pub async fn paused_trigger_groups(&self, conn: &mut PgConnection) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_paused_groups)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("trigger_group")).collect())
    }

    // ------------------------------------------------------------------
    // conditional state transitions
    // ------------------------------------------------------------------

    /// `old -> new` for one trigger; the returned row count resolves races.
    pub(crate) async fn update_trigger_state_from_state(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
        new: TriggerState,
        old: TriggerState,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_trigger_state_from_state)
            .bind(new.as_str())
            .bind(&key.name)
            .bind(&key.group)
            .bind(old.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub(crate) async fn update_trigger_state_from_states(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
        new: TriggerState,
        olds: [TriggerState; 3],
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_trigger_state_from_states)
            .bind(new.as_str())
            .bind(&key.name)
            .bind(&key.group)
            .bind(olds[0].as_str())
            .bind(olds[1].as_str())
            .bind(olds[2].as_str())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Unconditional state set for one trigger.
    pub(crate) async fn update_trigger_state(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
        state: TriggerState,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_trigger_state)
            .bind(state.as_str())
            .bind(&key.name)
            .bind(&key.group)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// `old -> new` for every trigger of a job.
    pub(crate) async fn update_trigger_states_for_job_from_state(
        &self,
        conn: &mut PgConnection,
        job_key: &JobKey,
        new: TriggerState,
        old: TriggerState,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_trigger_states_for_job_from_state)
            .bind(new.as_str())
            .bind(&job_key.name)
            .bind(&job_key.group)
            .bind(old.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Unconditional state set for every trigger of a job.
    pub(crate) async fn update_trigger_states_for_job(
        &self,
        conn: &mut PgConnection,
        job_key: &JobKey,
        state: TriggerState,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_trigger_states_for_job)
            .bind(state.as_str())
            .bind(&job_key.name)
            .bind(&job_key.group)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// `old1|old2 -> new` across the whole trigger table; used by restart
    /// recovery to release orphaned claims.
    pub(crate) async fn update_trigger_states_from_other_states(
        &self,
        conn: &mut PgConnection,
        new: TriggerState,
        old1: TriggerState,
        old2: TriggerState,
    ) -> StoreResult<u64> {
        let result = sqlx::query(&self.sql.update_trigger_states_from_other_states)
            .bind(new.as_str())
            .bind(old1.as_str())
            .bind(old2.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    pub(crate) async fn job_ref_for_trigger(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<Option<JobRef>> {
        let row = sqlx::query(&self.sql.select_job_for_trigger)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| JobRef {
            key: JobKey::new(r.get::<String, _>("job_name"), r.get::<String, _>("job_group")),
            durable: r.get("is_durable"),
            stateful: r.get("is_stateful"),
            requests_recovery: r.get("requests_recovery"),
        }))
    }

    pub async fn trigger_keys_for_job(
        &self,
        conn: &mut PgConnection,
        job_key: &JobKey,
    ) -> StoreResult<Vec<TriggerKey>> {
        let rows = sqlx::query(&self.sql.select_triggers_for_job)
            .bind(&job_key.name)
            .bind(&job_key.group)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(trigger_key_from_row).collect())
    }

    pub(crate) async fn num_triggers_for_job(
        &self,
        conn: &mut PgConnection,
        job_key: &JobKey,
    ) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&self.sql.select_num_triggers_for_job)
            .bind(&job_key.name)
            .bind(&job_key.group)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn trigger_keys_for_calendar(
        &self,
        conn: &mut PgConnection,
        calendar_name: &str,
    ) -> StoreResult<Vec<TriggerKey>> {
        let rows = sqlx::query(&self.sql.select_triggers_for_calendar)
            .bind(calendar_name)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(trigger_key_from_row).collect())
    }

    pub async fn triggers_in_state(
        &self,
        conn: &mut PgConnection,
        state: TriggerState,
    ) -> StoreResult<Vec<TriggerKey>> {
        let rows = sqlx::query(&self.sql.select_triggers_in_state)
            .bind(state.as_str())
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(trigger_key_from_row).collect())
    }

    pub async fn volatile_trigger_keys(
        &self,
        conn: &mut PgConnection,
    ) -> StoreResult<Vec<TriggerKey>> {
        let rows = sqlx::query(&self.sql.select_volatile_triggers)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(trigger_key_from_row).collect())
    }

    pub async fn num_triggers(&self, conn: &mut PgConnection) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&self.sql.select_num_triggers)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn trigger_group_names(&self, conn: &mut PgConnection) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_trigger_groups)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("trigger_group")).collect())
    }

    pub async fn trigger_names_in_group(
        &self,
        conn: &mut PgConnection,
        group: &str,
    ) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_triggers_in_group)
            .bind(group)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("trigger_name")).collect())
    }

    pub async fn trigger_listeners(
        &self,
        conn: &mut PgConnection,
        key: &TriggerKey,
    ) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_trigger_listeners)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("trigger_listener")).collect())
    }
}

fn trigger_key_from_row(row: &sqlx::postgres::PgRow) -> TriggerKey {
    TriggerKey::new(
        row.get::<String, _>("trigger_name"),
        row.get::<String, _>("trigger_group"),
    )
}

fn missing_variant(key: &TriggerKey, kind: &str) -> StoreError {
    StoreError::Persistence(format!("trigger {key} is missing its {kind} variant row"))
}
