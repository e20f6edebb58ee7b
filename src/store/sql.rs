//! The SQL gateway: every statement the store executes, keyed by name.
//!
//! Statements are written against unprefixed table names with a `{p}`
//! marker; the configured table prefix is substituted once, at store
//! construction. Postgres folds the unquoted identifiers to lower case, so
//! row reads use lower-case column names throughout.
//!
//! Time columns hold integer epoch milliseconds; an absent instant is
//! encoded as `-1` and any value `<= 0` reads back as absent.

use chrono::{DateTime, TimeZone, Utc};

/// Encode an optional instant for a numeric time column.
pub(crate) fn to_millis(t: Option<DateTime<Utc>>) -> i64 {
    t.map(|t| t.timestamp_millis()).unwrap_or(-1)
}

/// Decode a numeric time column into an optional instant.
pub(crate) fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    if ms > 0 {
        Utc.timestamp_millis_opt(ms).single()
    } else {
        None
    }
}

/// The full statement set for one configured table prefix.
#[derive(Debug)]
pub(crate) struct Sql {
    // jobs
    pub insert_job_detail: String,
    pub update_job_detail: String,
    pub select_job_detail: String,
    pub select_job_exists: String,
    pub delete_job_detail: String,
    pub update_job_data: String,
    pub insert_job_listener: String,
    pub delete_job_listeners: String,
    pub select_job_listeners: String,
    pub select_num_jobs: String,
    pub select_job_groups: String,
    pub select_jobs_in_group: String,
    pub select_volatile_jobs: String,
    pub select_job_for_trigger: String,

    // triggers
    pub insert_trigger: String,
    pub update_trigger: String,
    pub update_trigger_skip_data: String,
    pub select_trigger: String,
    pub select_trigger_data: String,
    pub select_trigger_state: String,
    pub select_trigger_status: String,
    pub select_trigger_exists: String,
    pub delete_trigger: String,
    pub insert_simple_trigger: String,
    pub update_simple_trigger: String,
    pub select_simple_trigger: String,
    pub delete_simple_trigger: String,
    pub insert_cron_trigger: String,
    pub update_cron_trigger: String,
    pub select_cron_trigger: String,
    pub delete_cron_trigger: String,
    pub insert_blob_trigger: String,
    pub update_blob_trigger: String,
    pub select_blob_trigger: String,
    pub delete_blob_trigger: String,
    pub insert_trigger_listener: String,
    pub delete_trigger_listeners: String,
    pub select_trigger_listeners: String,
    pub select_triggers_for_job: String,
    pub select_num_triggers_for_job: String,
    pub select_triggers_for_calendar: String,
    pub select_num_triggers: String,
    pub select_trigger_groups: String,
    pub select_triggers_in_group: String,
    pub select_triggers_in_state: String,
    pub select_volatile_triggers: String,
    pub select_triggers_to_acquire: String,

    // conditional state transitions
    pub update_trigger_state: String,
    pub update_trigger_state_from_state: String,
    pub update_trigger_state_from_states: String,
    pub update_trigger_group_state_from_state: String,
    pub update_trigger_group_state_from_states: String,
    pub update_trigger_states_for_job: String,
    pub update_trigger_states_for_job_from_state: String,
    pub update_trigger_states_from_other_states: String,

    // misfire scans
    pub select_misfired_triggers: String,
    pub select_misfired_triggers_in_state: String,
    pub select_misfired_triggers_in_group_in_state: String,

    // paused trigger groups
    pub insert_paused_group: String,
    pub delete_paused_group: String,
    pub delete_all_paused_groups: String,
    pub select_paused_groups: String,
    pub select_paused_group: String,

    // calendars
    pub insert_calendar: String,
    pub update_calendar: String,
    pub select_calendar: String,
    pub select_calendar_exists: String,
    pub delete_calendar: String,
    pub select_referencing_trigger_count: String,
    pub select_num_calendars: String,
    pub select_calendar_names: String,

    // fired-trigger ledger
    pub insert_fired_trigger: String,
    pub update_fired_trigger: String,
    pub select_fired_trigger: String,
    pub select_fired_trigger_group: String,
    pub select_fired_triggers_of_job: String,
    pub select_fired_triggers_of_job_group: String,
    pub select_instance_fired_triggers: String,
    pub delete_fired_trigger: String,
    pub delete_fired_triggers_of_trigger: String,
    pub delete_instance_fired_triggers: String,
    pub delete_volatile_fired_triggers: String,
    pub select_job_execution_count: String,

    // scheduler-instance heartbeats
    pub insert_scheduler_state: String,
    pub update_scheduler_checkin: String,
    pub update_scheduler_recoverer: String,
    pub delete_scheduler_state: String,
    pub select_scheduler_state: String,
    pub select_scheduler_states: String,

    // cluster lock rows
    pub select_lock_row: String,
}

impl Sql {
    pub fn new(prefix: &str) -> Self {
        let q = |template: &str| template.replace("{p}", prefix);
        Self {
            insert_job_detail: q("INSERT INTO {p}JOB_DETAILS (JOB_NAME, JOB_GROUP, DESCRIPTION, \
                 JOB_CLASS_NAME, IS_DURABLE, IS_VOLATILE, IS_STATEFUL, REQUESTS_RECOVERY, JOB_DATA) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"),
            update_job_detail: q("UPDATE {p}JOB_DETAILS SET DESCRIPTION = $1, JOB_CLASS_NAME = $2, \
                 IS_DURABLE = $3, IS_VOLATILE = $4, IS_STATEFUL = $5, REQUESTS_RECOVERY = $6, \
                 JOB_DATA = $7 WHERE JOB_NAME = $8 AND JOB_GROUP = $9"),
            select_job_detail: q("SELECT JOB_NAME, JOB_GROUP, DESCRIPTION, JOB_CLASS_NAME, \
                 IS_DURABLE, IS_VOLATILE, IS_STATEFUL, REQUESTS_RECOVERY, JOB_DATA \
                 FROM {p}JOB_DETAILS WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            select_job_exists: q("SELECT JOB_NAME FROM {p}JOB_DETAILS \
                 WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            delete_job_detail: q("DELETE FROM {p}JOB_DETAILS WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            update_job_data: q("UPDATE {p}JOB_DETAILS SET JOB_DATA = $1 \
                 WHERE JOB_NAME = $2 AND JOB_GROUP = $3"),
            insert_job_listener: q("INSERT INTO {p}JOB_LISTENERS (JOB_NAME, JOB_GROUP, JOB_LISTENER) \
                 VALUES ($1, $2, $3)"),
            delete_job_listeners: q("DELETE FROM {p}JOB_LISTENERS \
                 WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            select_job_listeners: q("SELECT JOB_LISTENER FROM {p}JOB_LISTENERS \
                 WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            select_num_jobs: q("SELECT COUNT(JOB_NAME) FROM {p}JOB_DETAILS"),
            select_job_groups: q("SELECT DISTINCT JOB_GROUP FROM {p}JOB_DETAILS"),
            select_jobs_in_group: q("SELECT JOB_NAME FROM {p}JOB_DETAILS WHERE JOB_GROUP = $1"),
            select_volatile_jobs: q("SELECT JOB_NAME, JOB_GROUP FROM {p}JOB_DETAILS \
                 WHERE IS_VOLATILE = TRUE"),
            select_job_for_trigger: q("SELECT J.JOB_NAME, J.JOB_GROUP, J.IS_DURABLE, J.JOB_CLASS_NAME, \
                 J.IS_STATEFUL, J.REQUESTS_RECOVERY FROM {p}TRIGGERS T, {p}JOB_DETAILS J \
                 WHERE T.TRIGGER_NAME = $1 AND T.TRIGGER_GROUP = $2 \
                 AND T.JOB_NAME = J.JOB_NAME AND T.JOB_GROUP = J.JOB_GROUP"),

            insert_trigger: q("INSERT INTO {p}TRIGGERS (TRIGGER_NAME, TRIGGER_GROUP, JOB_NAME, \
                 JOB_GROUP, IS_VOLATILE, DESCRIPTION, NEXT_FIRE_TIME, PREV_FIRE_TIME, TRIGGER_STATE, \
                 TRIGGER_TYPE, START_TIME, END_TIME, CALENDAR_NAME, MISFIRE_INSTR, JOB_DATA) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"),
            update_trigger: q("UPDATE {p}TRIGGERS SET JOB_NAME = $1, JOB_GROUP = $2, \
                 IS_VOLATILE = $3, DESCRIPTION = $4, NEXT_FIRE_TIME = $5, PREV_FIRE_TIME = $6, \
                 TRIGGER_STATE = $7, TRIGGER_TYPE = $8, START_TIME = $9, END_TIME = $10, \
                 CALENDAR_NAME = $11, MISFIRE_INSTR = $12, JOB_DATA = $13 \
                 WHERE TRIGGER_NAME = $14 AND TRIGGER_GROUP = $15"),
            update_trigger_skip_data: q("UPDATE {p}TRIGGERS SET JOB_NAME = $1, JOB_GROUP = $2, \
                 IS_VOLATILE = $3, DESCRIPTION = $4, NEXT_FIRE_TIME = $5, PREV_FIRE_TIME = $6, \
                 TRIGGER_STATE = $7, TRIGGER_TYPE = $8, START_TIME = $9, END_TIME = $10, \
                 CALENDAR_NAME = $11, MISFIRE_INSTR = $12 \
                 WHERE TRIGGER_NAME = $13 AND TRIGGER_GROUP = $14"),
            select_trigger: q("SELECT JOB_NAME, JOB_GROUP, IS_VOLATILE, DESCRIPTION, NEXT_FIRE_TIME, \
                 PREV_FIRE_TIME, TRIGGER_TYPE, START_TIME, END_TIME, CALENDAR_NAME, MISFIRE_INSTR, \
                 JOB_DATA FROM {p}TRIGGERS WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            select_trigger_data: q("SELECT JOB_DATA FROM {p}TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            select_trigger_state: q("SELECT TRIGGER_STATE FROM {p}TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            select_trigger_status: q("SELECT TRIGGER_STATE, NEXT_FIRE_TIME, JOB_NAME, JOB_GROUP \
                 FROM {p}TRIGGERS WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            select_trigger_exists: q("SELECT TRIGGER_NAME FROM {p}TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            delete_trigger: q("DELETE FROM {p}TRIGGERS WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            insert_simple_trigger: q("INSERT INTO {p}SIMPLE_TRIGGERS (TRIGGER_NAME, TRIGGER_GROUP, \
                 REPEAT_COUNT, REPEAT_INTERVAL, TIMES_TRIGGERED) VALUES ($1, $2, $3, $4, $5)"),
            update_simple_trigger: q("UPDATE {p}SIMPLE_TRIGGERS SET REPEAT_COUNT = $1, \
                 REPEAT_INTERVAL = $2, TIMES_TRIGGERED = $3 \
                 WHERE TRIGGER_NAME = $4 AND TRIGGER_GROUP = $5"),
            select_simple_trigger: q("SELECT REPEAT_COUNT, REPEAT_INTERVAL, TIMES_TRIGGERED \
                 FROM {p}SIMPLE_TRIGGERS WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            delete_simple_trigger: q("DELETE FROM {p}SIMPLE_TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            insert_cron_trigger: q("INSERT INTO {p}CRON_TRIGGERS (TRIGGER_NAME, TRIGGER_GROUP, \
                 CRON_EXPRESSION, TIME_ZONE_ID) VALUES ($1, $2, $3, $4)"),
            update_cron_trigger: q("UPDATE {p}CRON_TRIGGERS SET CRON_EXPRESSION = $1, \
                 TIME_ZONE_ID = $2 WHERE TRIGGER_NAME = $3 AND TRIGGER_GROUP = $4"),
            select_cron_trigger: q("SELECT CRON_EXPRESSION, TIME_ZONE_ID FROM {p}CRON_TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            delete_cron_trigger: q("DELETE FROM {p}CRON_TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            insert_blob_trigger: q("INSERT INTO {p}BLOB_TRIGGERS (TRIGGER_NAME, TRIGGER_GROUP, \
                 BLOB_DATA) VALUES ($1, $2, $3)"),
            update_blob_trigger: q("UPDATE {p}BLOB_TRIGGERS SET BLOB_DATA = $1 \
                 WHERE TRIGGER_NAME = $2 AND TRIGGER_GROUP = $3"),
            select_blob_trigger: q("SELECT BLOB_DATA FROM {p}BLOB_TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            delete_blob_trigger: q("DELETE FROM {p}BLOB_TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            insert_trigger_listener: q("INSERT INTO {p}TRIGGER_LISTENERS (TRIGGER_NAME, \
                 TRIGGER_GROUP, TRIGGER_LISTENER) VALUES ($1, $2, $3)"),
            delete_trigger_listeners: q("DELETE FROM {p}TRIGGER_LISTENERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            select_trigger_listeners: q("SELECT TRIGGER_LISTENER FROM {p}TRIGGER_LISTENERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            select_triggers_for_job: q("SELECT TRIGGER_NAME, TRIGGER_GROUP FROM {p}TRIGGERS \
                 WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            select_num_triggers_for_job: q("SELECT COUNT(TRIGGER_NAME) FROM {p}TRIGGERS \
                 WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            select_triggers_for_calendar: q("SELECT TRIGGER_NAME, TRIGGER_GROUP FROM {p}TRIGGERS \
                 WHERE CALENDAR_NAME = $1"),
            select_num_triggers: q("SELECT COUNT(TRIGGER_NAME) FROM {p}TRIGGERS"),
            select_trigger_groups: q("SELECT DISTINCT TRIGGER_GROUP FROM {p}TRIGGERS"),
            select_triggers_in_group: q("SELECT TRIGGER_NAME FROM {p}TRIGGERS \
                 WHERE TRIGGER_GROUP = $1"),
            select_triggers_in_state: q("SELECT TRIGGER_NAME, TRIGGER_GROUP FROM {p}TRIGGERS \
                 WHERE TRIGGER_STATE = $1"),
            select_volatile_triggers: q("SELECT TRIGGER_NAME, TRIGGER_GROUP FROM {p}TRIGGERS \
                 WHERE IS_VOLATILE = TRUE"),
            select_triggers_to_acquire: q("SELECT TRIGGER_NAME, TRIGGER_GROUP, NEXT_FIRE_TIME \
                 FROM {p}TRIGGERS WHERE TRIGGER_STATE = $1 AND NEXT_FIRE_TIME > 0 \
                 AND NEXT_FIRE_TIME <= $2 ORDER BY NEXT_FIRE_TIME ASC LIMIT $3"),

            update_trigger_state: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE TRIGGER_NAME = $2 AND TRIGGER_GROUP = $3"),
            update_trigger_state_from_state: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE TRIGGER_NAME = $2 AND TRIGGER_GROUP = $3 AND TRIGGER_STATE = $4"),
            update_trigger_state_from_states: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE TRIGGER_NAME = $2 AND TRIGGER_GROUP = $3 \
                 AND TRIGGER_STATE IN ($4, $5, $6)"),
            update_trigger_group_state_from_state: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE TRIGGER_GROUP = $2 AND TRIGGER_STATE = $3"),
            update_trigger_group_state_from_states: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE TRIGGER_GROUP = $2 AND TRIGGER_STATE IN ($3, $4, $5)"),
            update_trigger_states_for_job: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE JOB_NAME = $2 AND JOB_GROUP = $3"),
            update_trigger_states_for_job_from_state: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE JOB_NAME = $2 AND JOB_GROUP = $3 AND TRIGGER_STATE = $4"),
            update_trigger_states_from_other_states: q("UPDATE {p}TRIGGERS SET TRIGGER_STATE = $1 \
                 WHERE TRIGGER_STATE = $2 OR TRIGGER_STATE = $3"),

            select_misfired_triggers: q("SELECT TRIGGER_NAME, TRIGGER_GROUP FROM {p}TRIGGERS \
                 WHERE NEXT_FIRE_TIME > 0 AND NEXT_FIRE_TIME < $1 ORDER BY NEXT_FIRE_TIME ASC"),
            select_misfired_triggers_in_state: q("SELECT TRIGGER_NAME, TRIGGER_GROUP \
                 FROM {p}TRIGGERS WHERE NEXT_FIRE_TIME > 0 AND NEXT_FIRE_TIME < $1 \
                 AND TRIGGER_STATE = $2 ORDER BY NEXT_FIRE_TIME ASC"),
            select_misfired_triggers_in_group_in_state: q("SELECT TRIGGER_NAME FROM {p}TRIGGERS \
                 WHERE NEXT_FIRE_TIME > 0 AND NEXT_FIRE_TIME < $1 AND TRIGGER_GROUP = $2 \
                 AND TRIGGER_STATE = $3 ORDER BY NEXT_FIRE_TIME ASC"),

            insert_paused_group: q("INSERT INTO {p}PAUSED_TRIGGER_GRPS (TRIGGER_GROUP) VALUES ($1)"),
            delete_paused_group: q("DELETE FROM {p}PAUSED_TRIGGER_GRPS WHERE TRIGGER_GROUP = $1"),
            delete_all_paused_groups: q("DELETE FROM {p}PAUSED_TRIGGER_GRPS"),
            select_paused_groups: q("SELECT TRIGGER_GROUP FROM {p}PAUSED_TRIGGER_GRPS"),
            select_paused_group: q("SELECT TRIGGER_GROUP FROM {p}PAUSED_TRIGGER_GRPS \
                 WHERE TRIGGER_GROUP = $1"),

            insert_calendar: q("INSERT INTO {p}CALENDARS (CALENDAR_NAME, CALENDAR) VALUES ($1, $2)"),
            update_calendar: q("UPDATE {p}CALENDARS SET CALENDAR = $1 WHERE CALENDAR_NAME = $2"),
            select_calendar: q("SELECT CALENDAR FROM {p}CALENDARS WHERE CALENDAR_NAME = $1"),
            select_calendar_exists: q("SELECT CALENDAR_NAME FROM {p}CALENDARS \
                 WHERE CALENDAR_NAME = $1"),
            delete_calendar: q("DELETE FROM {p}CALENDARS WHERE CALENDAR_NAME = $1"),
            select_referencing_trigger_count: q("SELECT COUNT(TRIGGER_NAME) FROM {p}TRIGGERS \
                 WHERE CALENDAR_NAME = $1"),
            select_num_calendars: q("SELECT COUNT(CALENDAR_NAME) FROM {p}CALENDARS"),
            select_calendar_names: q("SELECT CALENDAR_NAME FROM {p}CALENDARS"),

            insert_fired_trigger: q("INSERT INTO {p}FIRED_TRIGGERS (ENTRY_ID, TRIGGER_NAME, \
                 TRIGGER_GROUP, IS_VOLATILE, INSTANCE_NAME, FIRED_TIME, ENTRY_STATE, JOB_NAME, \
                 JOB_GROUP, IS_STATEFUL, REQUESTS_RECOVERY) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"),
            update_fired_trigger: q("UPDATE {p}FIRED_TRIGGERS SET ENTRY_STATE = $1, JOB_NAME = $2, \
                 JOB_GROUP = $3, IS_STATEFUL = $4, REQUESTS_RECOVERY = $5 WHERE ENTRY_ID = $6"),
            select_fired_trigger: q("SELECT ENTRY_ID, TRIGGER_NAME, TRIGGER_GROUP, IS_VOLATILE, \
                 INSTANCE_NAME, FIRED_TIME, ENTRY_STATE, JOB_NAME, JOB_GROUP, IS_STATEFUL, \
                 REQUESTS_RECOVERY FROM {p}FIRED_TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            select_fired_trigger_group: q("SELECT ENTRY_ID, TRIGGER_NAME, TRIGGER_GROUP, \
                 IS_VOLATILE, INSTANCE_NAME, FIRED_TIME, ENTRY_STATE, JOB_NAME, JOB_GROUP, \
                 IS_STATEFUL, REQUESTS_RECOVERY FROM {p}FIRED_TRIGGERS WHERE TRIGGER_GROUP = $1"),
            select_fired_triggers_of_job: q("SELECT ENTRY_ID, TRIGGER_NAME, TRIGGER_GROUP, \
                 IS_VOLATILE, INSTANCE_NAME, FIRED_TIME, ENTRY_STATE, JOB_NAME, JOB_GROUP, \
                 IS_STATEFUL, REQUESTS_RECOVERY FROM {p}FIRED_TRIGGERS \
                 WHERE JOB_NAME = $1 AND JOB_GROUP = $2"),
            select_fired_triggers_of_job_group: q("SELECT ENTRY_ID, TRIGGER_NAME, TRIGGER_GROUP, \
                 IS_VOLATILE, INSTANCE_NAME, FIRED_TIME, ENTRY_STATE, JOB_NAME, JOB_GROUP, \
                 IS_STATEFUL, REQUESTS_RECOVERY FROM {p}FIRED_TRIGGERS WHERE JOB_GROUP = $1"),
            select_instance_fired_triggers: q("SELECT ENTRY_ID, TRIGGER_NAME, TRIGGER_GROUP, \
                 IS_VOLATILE, INSTANCE_NAME, FIRED_TIME, ENTRY_STATE, JOB_NAME, JOB_GROUP, \
                 IS_STATEFUL, REQUESTS_RECOVERY FROM {p}FIRED_TRIGGERS WHERE INSTANCE_NAME = $1"),
            delete_fired_trigger: q("DELETE FROM {p}FIRED_TRIGGERS WHERE ENTRY_ID = $1"),
            delete_fired_triggers_of_trigger: q("DELETE FROM {p}FIRED_TRIGGERS \
                 WHERE TRIGGER_NAME = $1 AND TRIGGER_GROUP = $2"),
            delete_instance_fired_triggers: q("DELETE FROM {p}FIRED_TRIGGERS \
                 WHERE INSTANCE_NAME = $1"),
            delete_volatile_fired_triggers: q("DELETE FROM {p}FIRED_TRIGGERS \
                 WHERE IS_VOLATILE = TRUE"),
            select_job_execution_count: q("SELECT COUNT(TRIGGER_NAME) FROM {p}FIRED_TRIGGERS \
                 WHERE JOB_NAME = $1 AND JOB_GROUP = $2 AND ENTRY_STATE = $3"),

            insert_scheduler_state: q("INSERT INTO {p}SCHEDULER_STATE (INSTANCE_NAME, \
                 LAST_CHECKIN_TIME, CHECKIN_INTERVAL, RECOVERER) VALUES ($1, $2, $3, $4)"),
            update_scheduler_checkin: q("UPDATE {p}SCHEDULER_STATE SET LAST_CHECKIN_TIME = $1 \
                 WHERE INSTANCE_NAME = $2"),
            update_scheduler_recoverer: q("UPDATE {p}SCHEDULER_STATE SET RECOVERER = $1 \
                 WHERE INSTANCE_NAME = $2 AND RECOVERER IS NULL"),
            delete_scheduler_state: q("DELETE FROM {p}SCHEDULER_STATE WHERE INSTANCE_NAME = $1"),
            select_scheduler_state: q("SELECT INSTANCE_NAME, LAST_CHECKIN_TIME, CHECKIN_INTERVAL, \
                 RECOVERER FROM {p}SCHEDULER_STATE WHERE INSTANCE_NAME = $1"),
            select_scheduler_states: q("SELECT INSTANCE_NAME, LAST_CHECKIN_TIME, CHECKIN_INTERVAL, \
                 RECOVERER FROM {p}SCHEDULER_STATE"),

            select_lock_row: q("SELECT LOCK_NAME FROM {p}LOCKS WHERE LOCK_NAME = $1 FOR UPDATE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_substitution() {
        let sql = Sql::new("QRTZ_");
        assert!(sql.insert_job_detail.contains("QRTZ_JOB_DETAILS"));
        assert!(sql.select_lock_row.contains("QRTZ_LOCKS"));
        assert!(!sql.insert_trigger.contains("{p}"));
    }

    #[test]
    fn test_empty_prefix() {
        let sql = Sql::new("");
        assert!(sql.insert_job_detail.contains("INSERT INTO JOB_DETAILS"));
    }

    #[test]
    fn test_millis_encoding() {
        assert_eq!(to_millis(None), -1);
        let t = Utc.timestamp_millis_opt(1_234).unwrap();
        assert_eq!(to_millis(Some(t)), 1_234);
        assert_eq!(from_millis(1_234), Some(t));
        assert_eq!(from_millis(0), None);
        assert_eq!(from_millis(-1), None);
    }
}
