//! Programmatic schema bootstrap.
//!
//! Because every table name carries the configured prefix, the DDL is built
//! at runtime rather than shipped as migration files. All statements are
//! idempotent; running them against an existing schema is a no-op.

use sqlx::PgConnection;

use crate::error::StoreResult;
use crate::store::lock::{LOCK_STATE_ACCESS, LOCK_TRIGGER_ACCESS};

/// Create the store's tables and seed the lock rows.
pub async fn ensure_schema(conn: &mut PgConnection, prefix: &str) -> StoreResult<()> {
    for template in DDL {
        sqlx::query(&template.replace("{p}", prefix))
            .execute(&mut *conn)
            .await?;
    }
    for lock_name in [LOCK_TRIGGER_ACCESS, LOCK_STATE_ACCESS] {
        sqlx::query(&format!(
            "INSERT INTO {prefix}LOCKS (LOCK_NAME) VALUES ($1) ON CONFLICT (LOCK_NAME) DO NOTHING"
        ))
        .bind(lock_name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS {p}JOB_DETAILS (
        JOB_NAME VARCHAR(200) NOT NULL,
        JOB_GROUP VARCHAR(200) NOT NULL,
        DESCRIPTION VARCHAR(250),
        JOB_CLASS_NAME VARCHAR(250) NOT NULL,
        IS_DURABLE BOOLEAN NOT NULL,
        IS_VOLATILE BOOLEAN NOT NULL,
        IS_STATEFUL BOOLEAN NOT NULL,
        REQUESTS_RECOVERY BOOLEAN NOT NULL,
        JOB_DATA BYTEA,
        PRIMARY KEY (JOB_NAME, JOB_GROUP)
    )",
    "CREATE TABLE IF NOT EXISTS {p}JOB_LISTENERS (
        JOB_NAME VARCHAR(200) NOT NULL,
        JOB_GROUP VARCHAR(200) NOT NULL,
        JOB_LISTENER VARCHAR(200) NOT NULL,
        PRIMARY KEY (JOB_NAME, JOB_GROUP, JOB_LISTENER)
    )",
    "CREATE TABLE IF NOT EXISTS {p}TRIGGERS (
        TRIGGER_NAME VARCHAR(200) NOT NULL,
        TRIGGER_GROUP VARCHAR(200) NOT NULL,
        JOB_NAME VARCHAR(200) NOT NULL,
        JOB_GROUP VARCHAR(200) NOT NULL,
        IS_VOLATILE BOOLEAN NOT NULL,
        DESCRIPTION VARCHAR(250),
        NEXT_FIRE_TIME BIGINT,
        PREV_FIRE_TIME BIGINT,
        TRIGGER_STATE VARCHAR(16) NOT NULL,
        TRIGGER_TYPE VARCHAR(8) NOT NULL,
        START_TIME BIGINT NOT NULL,
        END_TIME BIGINT,
        CALENDAR_NAME VARCHAR(200),
        MISFIRE_INSTR INTEGER,
        JOB_DATA BYTEA,
        PRIMARY KEY (TRIGGER_NAME, TRIGGER_GROUP)
    )",
    "CREATE TABLE IF NOT EXISTS {p}SIMPLE_TRIGGERS (
        TRIGGER_NAME VARCHAR(200) NOT NULL,
        TRIGGER_GROUP VARCHAR(200) NOT NULL,
        REPEAT_COUNT INTEGER NOT NULL,
        REPEAT_INTERVAL BIGINT NOT NULL,
        TIMES_TRIGGERED INTEGER NOT NULL,
        PRIMARY KEY (TRIGGER_NAME, TRIGGER_GROUP)
    )",
    "CREATE TABLE IF NOT EXISTS {p}CRON_TRIGGERS (
        TRIGGER_NAME VARCHAR(200) NOT NULL,
        TRIGGER_GROUP VARCHAR(200) NOT NULL,
        CRON_EXPRESSION VARCHAR(120) NOT NULL,
        TIME_ZONE_ID VARCHAR(80),
        PRIMARY KEY (TRIGGER_NAME, TRIGGER_GROUP)
    )",
    "CREATE TABLE IF NOT EXISTS {p}BLOB_TRIGGERS (
        TRIGGER_NAME VARCHAR(200) NOT NULL,
        TRIGGER_GROUP VARCHAR(200) NOT NULL,
        BLOB_DATA BYTEA,
        PRIMARY KEY (TRIGGER_NAME, TRIGGER_GROUP)
    )",
    "CREATE TABLE IF NOT EXISTS {p}TRIGGER_LISTENERS (
        TRIGGER_NAME VARCHAR(200) NOT NULL,
        TRIGGER_GROUP VARCHAR(200) NOT NULL,
        TRIGGER_LISTENER VARCHAR(200) NOT NULL,
        PRIMARY KEY (TRIGGER_NAME, TRIGGER_GROUP, TRIGGER_LISTENER)
    )",
    "CREATE TABLE IF NOT EXISTS {p}CALENDARS (
        CALENDAR_NAME VARCHAR(200) NOT NULL,
        CALENDAR BYTEA NOT NULL,
        PRIMARY KEY (CALENDAR_NAME)
    )",
    "CREATE TABLE IF NOT EXISTS {p}PAUSED_TRIGGER_GRPS (
        TRIGGER_GROUP VARCHAR(200) NOT NULL,
        PRIMARY KEY (TRIGGER_GROUP)
    )",
    "CREATE TABLE IF NOT EXISTS {p}FIRED_TRIGGERS (
        ENTRY_ID VARCHAR(96) NOT NULL,
        TRIGGER_NAME VARCHAR(200) NOT NULL,
        TRIGGER_GROUP VARCHAR(200) NOT NULL,
        IS_VOLATILE BOOLEAN NOT NULL,
        INSTANCE_NAME VARCHAR(200) NOT NULL,
        FIRED_TIME BIGINT NOT NULL,
        ENTRY_STATE VARCHAR(16) NOT NULL,
        JOB_NAME VARCHAR(200),
        JOB_GROUP VARCHAR(200),
        IS_STATEFUL BOOLEAN NOT NULL,
        REQUESTS_RECOVERY BOOLEAN NOT NULL,
        PRIMARY KEY (ENTRY_ID)
    )",
    "CREATE TABLE IF NOT EXISTS {p}SCHEDULER_STATE (
        INSTANCE_NAME VARCHAR(200) NOT NULL,
        LAST_CHECKIN_TIME BIGINT NOT NULL,
        CHECKIN_INTERVAL BIGINT NOT NULL,
        RECOVERER VARCHAR(200),
        PRIMARY KEY (INSTANCE_NAME)
    )",
    "CREATE TABLE IF NOT EXISTS {p}LOCKS (
        LOCK_NAME VARCHAR(40) NOT NULL,
        PRIMARY KEY (LOCK_NAME)
    )",
    "CREATE INDEX IF NOT EXISTS {p}IDX_T_NEXT_FIRE_TIME
        ON {p}TRIGGERS (TRIGGER_STATE, NEXT_FIRE_TIME)",
    "CREATE INDEX IF NOT EXISTS {p}IDX_FT_INSTANCE
        ON {p}FIRED_TRIGGERS (INSTANCE_NAME)",
];
