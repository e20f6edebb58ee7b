//! Calendar repository.

use sqlx::{PgConnection, Row};

use crate::error::{StoreError, StoreResult};
use crate::model::Calendar;
use crate::store::JobStore;

impl JobStore {
    /// Store a calendar. Fails with `ObjectAlreadyExists` when the name is
    /// taken and `replace_existing` is false.
    pub async fn store_calendar(
        &self,
        conn: &mut PgConnection,
        calendar: &Calendar,
        replace_existing: bool,
    ) -> StoreResult<()> {
        if self.calendar_exists(conn, &calendar.name).await? {
            if !replace_existing {
                return Err(StoreError::already_exists("calendar", &*calendar.name));
            }
            sqlx::query(&self.sql.update_calendar)
                .bind(&calendar.payload)
                .bind(&calendar.name)
                .execute(&mut *conn)
                .await?;
        } else {
            sqlx::query(&self.sql.insert_calendar)
                .bind(&calendar.name)
                .bind(&calendar.payload)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn retrieve_calendar(
        &self,
        conn: &mut PgConnection,
        name: &str,
    ) -> StoreResult<Option<Calendar>> {
        let row = sqlx::query(&self.sql.select_calendar)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| Calendar::new(name, r.get::<Vec<u8>, _>("calendar"))))
    }

    /// Delete a calendar. Fails with `CalendarInUse` while any trigger
    /// references it; the row is untouched in that case.
    pub async fn remove_calendar(&self, conn: &mut PgConnection, name: &str) -> StoreResult<bool> {
        let referencing = sqlx::query_scalar::<_, i64>(&self.sql.select_referencing_trigger_count)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        if referencing > 0 {
            return Err(StoreError::CalendarInUse(name.to_string()));
        }
        let result = sqlx::query(&self.sql.delete_calendar)
            .bind(name)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn calendar_exists(&self, conn: &mut PgConnection, name: &str) -> StoreResult<bool> {
        let row = sqlx::query(&self.sql.select_calendar_exists)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }

    pub async fn num_calendars(&self, conn: &mut PgConnection) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&self.sql.select_num_calendars)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn calendar_names(&self, conn: &mut PgConnection) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_calendar_names)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("calendar_name")).collect())
    }
}
