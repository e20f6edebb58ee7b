//! Job repository.

use sqlx::{FromRow, PgConnection, Row};

use crate::codec::{deserialize_data_map, serialize_data_map};
use crate::error::{StoreError, StoreResult};
use crate::keys::JobKey;
use crate::model::JobDetail;
use crate::store::JobStore;

#[derive(FromRow)]
struct JobRow {
    job_name: String,
    job_group: String,
    description: Option<String>,
    job_class_name: String,
    is_durable: bool,
    is_volatile: bool,
    is_stateful: bool,
    requests_recovery: bool,
    job_data: Option<Vec<u8>>,
}

impl JobStore {
    /// Store a job. Fails with `ObjectAlreadyExists` when a job with the
    /// same key is present and `replace_existing` is false.
    pub async fn store_job(
        &self,
        conn: &mut PgConnection,
        job: &JobDetail,
        replace_existing: bool,
    ) -> StoreResult<()> {
        if self.job_exists(conn, &job.key).await? {
            if !replace_existing {
                return Err(StoreError::already_exists("job", job.key.to_string()));
            }
            self.update_job_detail(conn, job).await
        } else {
            self.insert_job_detail(conn, job).await
        }
    }

    async fn insert_job_detail(&self, conn: &mut PgConnection, job: &JobDetail) -> StoreResult<()> {
        let data = serialize_data_map(&job.job_data, self.use_properties())?;
        sqlx::query(&self.sql.insert_job_detail)
            .bind(&job.key.name)
            .bind(&job.key.group)
            .bind(&job.description)
            .bind(&job.job_class)
            .bind(job.durable)
            .bind(job.volatile)
            .bind(job.stateful)
            .bind(job.requests_recovery)
            .bind(&data)
            .execute(&mut *conn)
            .await?;
        self.insert_job_listeners(conn, job).await
    }

    async fn update_job_detail(&self, conn: &mut PgConnection, job: &JobDetail) -> StoreResult<()> {
        let data = serialize_data_map(&job.job_data, self.use_properties())?;
        sqlx::query(&self.sql.update_job_detail)
            .bind(&job.description)
            .bind(&job.job_class)
            .bind(job.durable)
            .bind(job.volatile)
            .bind(job.stateful)
            .bind(job.requests_recovery)
            .bind(&data)
            .bind(&job.key.name)
            .bind(&job.key.group)
            .execute(&mut *conn)
            .await?;
        // listener associations are replaced wholesale
        sqlx::query(&self.sql.delete_job_listeners)
            .bind(&job.key.name)
            .bind(&job.key.group)
            .execute(&mut *conn)
            .await?;
        self.insert_job_listeners(conn, job).await
    }

    async fn insert_job_listeners(
        &self,
        conn: &mut PgConnection,
        job: &JobDetail,
    ) -> StoreResult<()> {
        for listener in &job.listeners {
            sqlx::query(&self.sql.insert_job_listener)
                .bind(&job.key.name)
                .bind(&job.key.group)
                .bind(listener)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Materialize a job. `None` when no row exists; `ClassLoad` when the
    /// stored class name is unknown to the resolver.
    pub async fn retrieve_job(
        &self,
        conn: &mut PgConnection,
        key: &JobKey,
    ) -> StoreResult<Option<JobDetail>> {
        let row = sqlx::query_as::<_, JobRow>(&self.sql.select_job_detail)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        if !self.resolver.resolve(&row.job_class_name) {
            return Err(StoreError::ClassLoad(row.job_class_name));
        }
        let job_data = match &row.job_data {
            Some(bytes) => deserialize_data_map(bytes, self.use_properties())?,
            None => Default::default(),
        };
        let listeners = self.job_listeners(conn, key).await?;
        Ok(Some(JobDetail {
            key: JobKey::new(row.job_name, row.job_group),
            description: row.description,
            job_class: row.job_class_name,
            durable: row.is_durable,
            volatile: row.is_volatile,
            stateful: row.is_stateful,
            requests_recovery: row.requests_recovery,
            job_data,
            listeners,
        }))
    }

    /// Remove a job and every trigger pointing at it. Returns whether the
    /// job row existed.
    pub async fn remove_job(&self, conn: &mut PgConnection, key: &JobKey) -> StoreResult<bool> {
        for trigger_key in self.trigger_keys_for_job(conn, key).await? {
            self.delete_trigger_rows(conn, &trigger_key).await?;
        }
        self.delete_job_rows(conn, key).await
    }

    pub(crate) async fn delete_job_rows(
        &self,
        conn: &mut PgConnection,
        key: &JobKey,
    ) -> StoreResult<bool> {
        sqlx::query(&self.sql.delete_job_listeners)
            .bind(&key.name)
            .bind(&key.group)
            .execute(&mut *conn)
            .await?;
        let result = sqlx::query(&self.sql.delete_job_detail)
            .bind(&key.name)
            .bind(&key.group)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn job_exists(&self, conn: &mut PgConnection, key: &JobKey) -> StoreResult<bool> {
        let row = sqlx::query(&self.sql.select_job_exists)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }

    /// Rewrite a job's data map, leaving every other column untouched.
    pub async fn update_job_data(
        &self,
        conn: &mut PgConnection,
        job: &JobDetail,
    ) -> StoreResult<()> {
        let data = serialize_data_map(&job.job_data, self.use_properties())?;
        sqlx::query(&self.sql.update_job_data)
            .bind(&data)
            .bind(&job.key.name)
            .bind(&job.key.group)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn job_listeners(
        &self,
        conn: &mut PgConnection,
        key: &JobKey,
    ) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_job_listeners)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("job_listener")).collect())
    }

    pub async fn num_jobs(&self, conn: &mut PgConnection) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&self.sql.select_num_jobs)
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn job_group_names(&self, conn: &mut PgConnection) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_job_groups)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("job_group")).collect())
    }

    pub async fn job_names_in_group(
        &self,
        conn: &mut PgConnection,
        group: &str,
    ) -> StoreResult<Vec<String>> {
        let rows = sqlx::query(&self.sql.select_jobs_in_group)
            .bind(group)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(|r| r.get("job_name")).collect())
    }

    pub async fn volatile_job_keys(&self, conn: &mut PgConnection) -> StoreResult<Vec<JobKey>> {
        let rows = sqlx::query(&self.sql.select_volatile_jobs)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows
            .iter()
            .map(|r| JobKey::new(r.get::<String, _>("job_name"), r.get::<String, _>("job_group")))
            .collect())
    }

    /// Whether the job exists and is stateful, without materializing its
    /// data map. `None` when there is no such job.
    pub(crate) async fn job_stateful(
        &self,
        conn: &mut PgConnection,
        key: &JobKey,
    ) -> StoreResult<Option<bool>> {
        let row = sqlx::query(&self.sql.select_job_detail)
            .bind(&key.name)
            .bind(&key.group)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| r.get("is_stateful")))
    }
}
