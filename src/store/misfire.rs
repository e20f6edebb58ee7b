//! Misfire detection and policy application.
//!
//! A trigger misfires when its next fire time passed by more than the
//! configured threshold while it sat in `WAITING`. Callers that scan the
//! whole table should hold the trigger-access lock row.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Row};

use crate::error::StoreResult;
use crate::keys::TriggerKey;
use crate::model::TriggerState;
use crate::store::JobStore;

impl JobStore {
    /// Keys of every trigger whose fire time passed the misfire boundary
    /// at `now`, regardless of state.
    pub async fn all_misfired_trigger_keys(
        &self,
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TriggerKey>> {
        let boundary = self.misfire_boundary(now);
        let rows = sqlx::query(&self.sql.select_misfired_triggers)
            .bind(boundary)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows
            .iter()
            .map(|r| {
                TriggerKey::new(
                    r.get::<String, _>("trigger_name"),
                    r.get::<String, _>("trigger_group"),
                )
            })
            .collect())
    }

    /// Keys of waiting triggers that have misfired as of `now`.
    pub async fn misfired_trigger_keys(
        &self,
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TriggerKey>> {
        let boundary = self.misfire_boundary(now);
        let rows = sqlx::query(&self.sql.select_misfired_triggers_in_state)
            .bind(boundary)
            .bind(TriggerState::Waiting.as_str())
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows
            .iter()
            .map(|r| {
                TriggerKey::new(
                    r.get::<String, _>("trigger_name"),
                    r.get::<String, _>("trigger_group"),
                )
            })
            .collect())
    }

    /// Misfired trigger names within one group and state.
    pub async fn misfired_trigger_names_in_group(
        &self,
        conn: &mut PgConnection,
        now: DateTime<Utc>,
        group: &str,
        state: TriggerState,
    ) -> StoreResult<Vec<String>> {
        let boundary = self.misfire_boundary(now);
        let rows = sqlx::query(&self.sql.select_misfired_triggers_in_group_in_state)
            .bind(boundary)
            .bind(group)
            .bind(state.as_str())
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("trigger_name")).collect())
    }

    /// Apply each misfired trigger's policy: the next fire time moves to or
    /// past `now`, or the trigger completes when its schedule is exhausted.
    /// Returns how many triggers were handled.
    pub async fn recover_misfires(
        &self,
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let keys = self.misfired_trigger_keys(conn, now).await?;
        let mut handled = 0;
        for key in keys {
            let Some(mut trigger) = self.retrieve_trigger(conn, &key).await? else {
                continue;
            };
            trigger.apply_misfire(now);
            let state = if trigger.next_fire_time.is_none() {
                tracing::info!(trigger = %key, "misfired trigger has no further fires, completing");
                TriggerState::Complete
            } else {
                TriggerState::Waiting
            };
            self.update_trigger_row(conn, &trigger, state).await?;
            handled += 1;
        }
        if handled > 0 {
            tracing::info!(count = handled, "handled misfired triggers");
        }
        Ok(handled)
    }

    fn misfire_boundary(&self, now: DateTime<Utc>) -> i64 {
        (now - self.config.misfire_threshold).timestamp_millis()
    }
}
