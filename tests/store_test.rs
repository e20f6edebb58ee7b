//! Integration tests for the job store against a real PostgreSQL instance.
//!
//! Set `DATABASE_URL` to run these; without it every test skips. Tests are
//! serialized because they share one schema.

use std::env;
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde_json::json;
use serial_test::serial;
use sqlx::PgPool;

use chime::cluster::ClusterManager;
use chime::{
    Calendar, CompletedInstruction, EntryState, JobDetail, JobKey, JobStore, StoreConfig,
    StoreError, Trigger, TriggerKey, TriggerState, FAILED_JOB_ORIG_TRIGGER_FIRETIME_KEY,
    FAILED_JOB_ORIG_TRIGGER_GROUP_KEY, FAILED_JOB_ORIG_TRIGGER_NAME_KEY, RECOVERY_GROUP,
};

const PREFIX: &str = "QRTZ_";

static TRACING: Once = Once::new();

/// Send store logs to the test harness, filtered by `RUST_LOG`.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Connect, bootstrap the schema and wipe data tables. `None` (skip) when
/// no database is configured.
async fn setup() -> Option<PgPool> {
    init_tracing();
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping test: DATABASE_URL not set");
            return None;
        }
    };
    let pool = PgPool::connect(&database_url).await.ok()?;
    let store = store_for("bootstrap");
    let mut conn = pool.acquire().await.ok()?;
    store.ensure_schema(&mut conn).await.ok()?;
    drop(conn);
    cleanup_database(&pool).await.ok()?;
    Some(pool)
}

async fn cleanup_database(pool: &PgPool) -> Result<()> {
    sqlx::query(
        "TRUNCATE qrtz_job_details, qrtz_job_listeners, qrtz_triggers, qrtz_simple_triggers, \
         qrtz_cron_triggers, qrtz_blob_triggers, qrtz_trigger_listeners, qrtz_calendars, \
         qrtz_paused_trigger_grps, qrtz_fired_triggers, qrtz_scheduler_state CASCADE",
    )
    .execute(pool)
    .await?;
    Ok(())
}

fn store_for(instance_id: &str) -> JobStore {
    JobStore::new(StoreConfig {
        table_prefix: PREFIX.to_string(),
        instance_id: instance_id.to_string(),
        use_properties: false,
        misfire_threshold: Duration::from_millis(5_000),
        cluster_checkin_interval: Duration::from_millis(1_000),
    })
}

fn test_job(name: &str, group: &str) -> JobDetail {
    JobDetail::new(JobKey::new(name, group), "com.example.BackupJob")
}

fn simple_trigger(name: &str, group: &str, job: &JobKey, start_ms: i64) -> Trigger {
    Trigger::new_simple(
        TriggerKey::new(name, group),
        job.clone(),
        Utc.timestamp_millis_opt(start_ms).unwrap(),
        3,
        1_000,
    )
}

// =============================================================================
// Repositories
// =============================================================================

#[tokio::test]
#[serial]
async fn test_duplicate_job_insert_rejected() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;

    let err = store.store_job(&mut conn, &job, false).await.unwrap_err();
    assert!(matches!(err, StoreError::ObjectAlreadyExists { .. }));

    // replace_existing bypasses the collision
    store.store_job(&mut conn, &job, true).await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_job_roundtrip() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let mut job = test_job("j1", "g1");
    job.description = Some("nightly backup".to_string());
    job.durable = true;
    job.stateful = true;
    job.requests_recovery = true;
    job.listeners = vec!["audit".to_string(), "metrics".to_string()];
    job.job_data.put("bucket", "backups");
    job.job_data.put("retries", 5);
    job.job_data.put("opts", json!({"compress": true}));

    store.store_job(&mut conn, &job, false).await?;
    let loaded = store.retrieve_job(&mut conn, &job.key).await?.unwrap();

    assert_eq!(loaded.key, job.key);
    assert_eq!(loaded.description, job.description);
    assert_eq!(loaded.job_class, job.job_class);
    assert!(loaded.durable && loaded.stateful && loaded.requests_recovery);
    let mut listeners = loaded.listeners.clone();
    listeners.sort();
    assert_eq!(listeners, job.listeners);
    assert_eq!(loaded.job_data, job.job_data);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_simple_trigger_roundtrip() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;

    let mut trigger = simple_trigger("t1", "g1", &job.key, 1_000);
    trigger.description = Some("every second".to_string());
    trigger.end_time = Some(Utc.timestamp_millis_opt(60_000).unwrap());
    trigger.listeners = vec!["trace".to_string()];
    trigger.job_data.put("shard", "7");

    store.store_trigger(&mut conn, &trigger, false).await?;
    let loaded = store
        .retrieve_trigger(&mut conn, &trigger.key)
        .await?
        .unwrap();

    assert_eq!(loaded, trigger);
    assert_eq!(
        store.trigger_state(&mut conn, &trigger.key).await?,
        TriggerState::Waiting
    );
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_cron_trigger_roundtrip() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;

    let trigger = Trigger::new_cron(
        TriggerKey::new("c1", "g1"),
        job.key.clone(),
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        "0 30 9 * * *",
        "America/New_York",
    );
    store.store_trigger(&mut conn, &trigger, false).await?;

    let loaded = store
        .retrieve_trigger(&mut conn, &trigger.key)
        .await?
        .unwrap();
    assert_eq!(loaded, trigger);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_trigger_requires_existing_job() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let trigger = simple_trigger("t1", "g1", &JobKey::new("ghost", "g1"), 1_000);
    let err = store
        .store_trigger(&mut conn, &trigger, false)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Persistence(_)));
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_deleting_last_trigger_removes_non_durable_job() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1"); // durable = false
    store.store_job(&mut conn, &job, false).await?;
    let trigger = simple_trigger("t1", "g1", &job.key, 1_000);
    store.store_trigger(&mut conn, &trigger, false).await?;

    assert!(store.remove_trigger(&mut conn, &trigger.key).await?);
    assert!(!store.job_exists(&mut conn, &job.key).await?);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_calendar_delete_fails_while_referenced() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let calendar = Calendar::new("holidays", b"opaque payload".to_vec());
    store.store_calendar(&mut conn, &calendar, false).await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;
    let mut trigger = simple_trigger("t1", "g1", &job.key, 1_000);
    trigger.calendar_name = Some("holidays".to_string());
    store.store_trigger(&mut conn, &trigger, false).await?;

    let err = store
        .remove_calendar(&mut conn, "holidays")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::CalendarInUse(_)));
    assert!(store.calendar_exists(&mut conn, "holidays").await?);

    // removing the trigger unblocks the delete
    store.remove_trigger(&mut conn, &trigger.key).await?;
    assert!(store.remove_calendar(&mut conn, "holidays").await?);
    Ok(())
}

// =============================================================================
// Acquisition & completion
// =============================================================================

#[tokio::test]
#[serial]
async fn test_acquisition_claims_trigger() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;
    let trigger = simple_trigger("t1", "g1", &job.key, 1_000);
    store.store_trigger(&mut conn, &trigger, false).await?;

    let acquired = store
        .acquire_next_triggers(&mut conn, Utc::now(), 10)
        .await?;
    assert_eq!(acquired.len(), 1);
    assert_eq!(acquired[0].trigger.key, trigger.key);

    assert_eq!(
        store.trigger_state(&mut conn, &trigger.key).await?,
        TriggerState::Acquired
    );
    let entries = store
        .fired_trigger_records(&mut conn, Some("t1"), "g1")
        .await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].state, EntryState::Acquired);
    assert_eq!(entries[0].instance_id, "node-a");
    assert_eq!(entries[0].fired_time.timestamp_millis(), 1_000);
    assert!(entries[0].job_key.is_none());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_racing_acquisition_has_single_winner() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store_a = store_for("node-a");
    let store_b = store_for("node-b");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store_a.store_job(&mut conn, &job, false).await?;
    let trigger = simple_trigger("t1", "g1", &job.key, 1_000);
    store_a.store_trigger(&mut conn, &trigger, false).await?;

    let won_a = store_a
        .acquire_next_triggers(&mut conn, Utc::now(), 10)
        .await?;
    let won_b = store_b
        .acquire_next_triggers(&mut conn, Utc::now(), 10)
        .await?;

    assert_eq!(won_a.len(), 1);
    assert!(won_b.is_empty());
    let entries = store_a
        .fired_trigger_records(&mut conn, Some("t1"), "g1")
        .await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].instance_id, "node-a");
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_fire_and_complete_cycle() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;
    let trigger = simple_trigger("t1", "g1", &job.key, 1_000);
    store.store_trigger(&mut conn, &trigger, false).await?;

    let acquired = store
        .acquire_next_triggers(&mut conn, Utc::now(), 1)
        .await?
        .remove(0);
    let bundle = store.trigger_fired(&mut conn, &acquired).await?.unwrap();

    assert_eq!(
        bundle.scheduled_fire_time,
        Some(Utc.timestamp_millis_opt(1_000).unwrap())
    );
    assert_eq!(
        bundle.trigger.next_fire_time,
        Some(Utc.timestamp_millis_opt(2_000).unwrap())
    );
    // ledger entry is executing with the job bound
    let entries = store
        .fired_trigger_records(&mut conn, Some("t1"), "g1")
        .await?;
    assert_eq!(entries[0].state, EntryState::Executing);
    assert_eq!(entries[0].job_key.as_ref(), Some(&job.key));
    // non-stateful job with more fires ahead: back to waiting
    assert_eq!(
        store.trigger_state(&mut conn, &trigger.key).await?,
        TriggerState::Waiting
    );

    store
        .triggered_job_complete(&mut conn, &acquired, &bundle.job, CompletedInstruction::NoInstruction)
        .await?;
    let entries = store
        .fired_trigger_records(&mut conn, Some("t1"), "g1")
        .await?;
    assert!(entries.is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_exhausted_trigger_completes_on_fire() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let mut job = test_job("j1", "g1");
    job.durable = true;
    store.store_job(&mut conn, &job, false).await?;
    let trigger = Trigger::new_simple(
        TriggerKey::new("once", "g1"),
        job.key.clone(),
        Utc.timestamp_millis_opt(1_000).unwrap(),
        0,
        0,
    );
    store.store_trigger(&mut conn, &trigger, false).await?;

    let acquired = store
        .acquire_next_triggers(&mut conn, Utc::now(), 1)
        .await?
        .remove(0);
    let bundle = store.trigger_fired(&mut conn, &acquired).await?.unwrap();
    assert_eq!(bundle.trigger.next_fire_time, None);
    assert_eq!(
        store.trigger_state(&mut conn, &trigger.key).await?,
        TriggerState::Complete
    );
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_one_stateful_trigger_acquired_per_batch() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let mut job = test_job("j1", "g1");
    job.stateful = true;
    store.store_job(&mut conn, &job, false).await?;
    let first = simple_trigger("t1", "g1", &job.key, 1_000);
    let second = simple_trigger("t2", "g1", &job.key, 2_000);
    store.store_trigger(&mut conn, &first, false).await?;
    store.store_trigger(&mut conn, &second, false).await?;

    // both triggers are due, but only one claim per serialized job
    let acquired = store
        .acquire_next_triggers(&mut conn, Utc::now(), 10)
        .await?;
    assert_eq!(acquired.len(), 1);
    assert_eq!(acquired[0].trigger.key, first.key);
    assert_eq!(
        store.trigger_state(&mut conn, &second.key).await?,
        TriggerState::Waiting
    );
    let entries = store
        .fired_trigger_records(&mut conn, None, "g1")
        .await?;
    assert_eq!(entries.len(), 1);
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_stateful_job_blocks_and_unblocks_siblings() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let mut job = test_job("j1", "g1");
    job.stateful = true;
    store.store_job(&mut conn, &job, false).await?;
    let first = simple_trigger("t1", "g1", &job.key, 1_000);
    let second = simple_trigger("t2", "g1", &job.key, 2_000);
    store.store_trigger(&mut conn, &first, false).await?;
    store.store_trigger(&mut conn, &second, false).await?;

    let acquired = store
        .acquire_next_triggers(&mut conn, Utc::now(), 1)
        .await?
        .remove(0);
    assert_eq!(acquired.trigger.key, first.key);
    let bundle = store.trigger_fired(&mut conn, &acquired).await?.unwrap();

    // the fired trigger and its sibling are both blocked now
    assert_eq!(
        store.trigger_state(&mut conn, &first.key).await?,
        TriggerState::Blocked
    );
    assert_eq!(
        store.trigger_state(&mut conn, &second.key).await?,
        TriggerState::Blocked
    );

    store
        .triggered_job_complete(&mut conn, &acquired, &bundle.job, CompletedInstruction::NoInstruction)
        .await?;
    assert_eq!(
        store.trigger_state(&mut conn, &first.key).await?,
        TriggerState::Waiting
    );
    assert_eq!(
        store.trigger_state(&mut conn, &second.key).await?,
        TriggerState::Waiting
    );
    Ok(())
}

// =============================================================================
// Pause / resume
// =============================================================================

#[tokio::test]
#[serial]
async fn test_pause_and_resume_group() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;
    // fire times far in the future so resuming applies no misfire policy
    let far = Utc::now().timestamp_millis() + 3_600_000;
    let waiting = simple_trigger("tw", "g1", &job.key, far);
    let blocked = simple_trigger("tb", "g1", &job.key, far);
    store.store_trigger(&mut conn, &waiting, false).await?;
    store.store_trigger(&mut conn, &blocked, false).await?;
    sqlx::query("UPDATE qrtz_triggers SET trigger_state = 'BLOCKED' WHERE trigger_name = 'tb'")
        .execute(&mut *conn)
        .await?;

    store.pause_trigger_group(&mut conn, "g1").await?;
    assert_eq!(
        store.trigger_state(&mut conn, &waiting.key).await?,
        TriggerState::Paused
    );
    assert_eq!(
        store.trigger_state(&mut conn, &blocked.key).await?,
        TriggerState::PausedBlocked
    );
    assert_eq!(
        store.paused_trigger_groups(&mut conn).await?,
        vec!["g1".to_string()]
    );

    store.resume_trigger_group(&mut conn, "g1").await?;
    assert_eq!(
        store.trigger_state(&mut conn, &waiting.key).await?,
        TriggerState::Waiting
    );
    assert_eq!(
        store.trigger_state(&mut conn, &blocked.key).await?,
        TriggerState::Blocked
    );
    assert!(store.paused_trigger_groups(&mut conn).await?.is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_triggers_stored_into_paused_group_start_paused() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;
    store.pause_trigger_group(&mut conn, "g1").await?;

    let trigger = simple_trigger("late", "g1", &job.key, 1_000);
    store.store_trigger(&mut conn, &trigger, false).await?;
    assert_eq!(
        store.trigger_state(&mut conn, &trigger.key).await?,
        TriggerState::Paused
    );
    Ok(())
}

// =============================================================================
// Misfires
// =============================================================================

#[tokio::test]
#[serial]
async fn test_misfire_fire_now_updates_fire_time() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a"); // misfire threshold 5000ms
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;
    let mut trigger = simple_trigger("t1", "g1", &job.key, 3_000);
    trigger.misfire_instruction = chime::misfire_policy::FIRE_NOW;
    store.store_trigger(&mut conn, &trigger, false).await?;

    let now = Utc.timestamp_millis_opt(10_000).unwrap();
    let handled = store.recover_misfires(&mut conn, now).await?;
    assert_eq!(handled, 1);

    let status = store
        .trigger_status(&mut conn, &trigger.key)
        .await?
        .unwrap();
    assert_eq!(status.state, TriggerState::Waiting);
    assert_eq!(status.next_fire_time, Some(now));
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_misfire_within_threshold_is_ignored() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let job = test_job("j1", "g1");
    store.store_job(&mut conn, &job, false).await?;
    let trigger = simple_trigger("t1", "g1", &job.key, 8_000);
    store.store_trigger(&mut conn, &trigger, false).await?;

    // 8000 is late at now=10000 but inside the 5000ms tolerance
    let handled = store
        .recover_misfires(&mut conn, Utc.timestamp_millis_opt(10_000).unwrap())
        .await?;
    assert_eq!(handled, 0);
    Ok(())
}

// =============================================================================
// Cluster recovery
// =============================================================================

#[tokio::test]
#[serial]
async fn test_cluster_recovers_failed_instance() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store_a = store_for("node-a");
    let store_b = Arc::new(store_for("node-b"));
    let mut conn = pool.acquire().await?;

    let mut job = test_job("j1", "g1");
    job.requests_recovery = true;
    job.durable = true;
    store_a.store_job(&mut conn, &job, false).await?;
    let trigger = simple_trigger("t1", "g1", &job.key, 1_000);
    store_a.store_trigger(&mut conn, &trigger, false).await?;

    // node-a claims the trigger, heartbeats once, then goes silent
    let acquired = store_a
        .acquire_next_triggers(&mut conn, Utc::now(), 1)
        .await?;
    assert_eq!(acquired.len(), 1);
    sqlx::query(
        "INSERT INTO qrtz_scheduler_state (instance_name, last_checkin_time, checkin_interval, \
         recoverer) VALUES ('node-a', $1, 1000, NULL)",
    )
    .bind(Utc::now().timestamp_millis() - 60_000)
    .execute(&mut *conn)
    .await?;
    drop(conn);

    let manager = Arc::new(ClusterManager::new(pool.clone(), store_b.clone()));
    manager.check_in().await?;

    let mut conn = pool.acquire().await?;
    // the dead peer's heartbeat and ledger entries are gone
    assert!(store_b
        .scheduler_state_records(&mut conn, Some("node-a"))
        .await?
        .is_empty());
    assert!(store_b
        .fired_trigger_records_for_instance(&mut conn, "node-a")
        .await?
        .is_empty());
    // the claimed trigger was handed back
    assert_eq!(
        store_b.trigger_state(&mut conn, &trigger.key).await?,
        TriggerState::Waiting
    );

    // a recovery trigger re-runs the job with the original fire context
    let names = store_b
        .trigger_names_in_group(&mut conn, RECOVERY_GROUP)
        .await?;
    assert_eq!(names.len(), 1);
    let recovery = store_b
        .retrieve_trigger(&mut conn, &TriggerKey::new(names[0].clone(), RECOVERY_GROUP))
        .await?
        .unwrap();
    assert_eq!(recovery.job_key, job.key);
    assert_eq!(
        recovery.job_data.get(FAILED_JOB_ORIG_TRIGGER_NAME_KEY),
        Some(&json!("t1"))
    );
    assert_eq!(
        recovery.job_data.get(FAILED_JOB_ORIG_TRIGGER_GROUP_KEY),
        Some(&json!("g1"))
    );
    assert_eq!(
        recovery.job_data.get(FAILED_JOB_ORIG_TRIGGER_FIRETIME_KEY),
        Some(&json!(1_000))
    );
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_checkin_registers_and_refreshes_heartbeat() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = Arc::new(store_for("node-a"));
    let manager = Arc::new(ClusterManager::new(pool.clone(), store.clone()));

    manager.check_in().await?;
    let mut conn = pool.acquire().await?;
    let records = store.scheduler_state_records(&mut conn, Some("node-a")).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].checkin_interval_ms, 1_000);
    let first_checkin = records[0].checkin_timestamp;
    drop(conn);

    manager.check_in().await?;
    let mut conn = pool.acquire().await?;
    let records = store.scheduler_state_records(&mut conn, Some("node-a")).await?;
    assert!(records[0].checkin_timestamp >= first_checkin);
    drop(conn);

    manager.shutdown().await?;
    let mut conn = pool.acquire().await?;
    assert!(store
        .scheduler_state_records(&mut conn, Some("node-a"))
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
#[serial]
async fn test_restart_recovery_releases_stale_claims() -> Result<()> {
    let Some(pool) = setup().await else {
        return Ok(());
    };
    let store = store_for("node-a");
    let mut conn = pool.acquire().await?;

    let mut job = test_job("j1", "g1");
    job.durable = true;
    store.store_job(&mut conn, &job, false).await?;
    let far = Utc::now().timestamp_millis() + 3_600_000;
    let trigger = simple_trigger("t1", "g1", &job.key, far);
    store.store_trigger(&mut conn, &trigger, false).await?;
    sqlx::query("UPDATE qrtz_triggers SET trigger_state = 'ACQUIRED' WHERE trigger_name = 't1'")
        .execute(&mut *conn)
        .await?;

    store.recover_own_jobs(&mut conn).await?;
    assert_eq!(
        store.trigger_state(&mut conn, &trigger.key).await?,
        TriggerState::Waiting
    );
    Ok(())
}
