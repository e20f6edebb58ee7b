//! Row views used by acquisition, recovery and the cluster manager.

use chrono::{DateTime, Utc};

use crate::keys::{JobKey, TriggerKey};
use crate::model::state::{EntryState, TriggerState};

/// One in-flight fire instance from the fired-trigger ledger.
///
/// Job fields are only bound once the entry reaches `EXECUTING`; an entry
/// still in `ACQUIRED` carries the trigger key alone.
#[derive(Debug, Clone)]
pub struct FiredTriggerRecord {
    pub fire_instance_id: String,
    pub trigger_key: TriggerKey,
    pub is_volatile: bool,
    pub instance_id: String,
    pub fired_time: DateTime<Utc>,
    pub state: EntryState,
    pub job_key: Option<JobKey>,
    pub is_stateful: bool,
    pub requests_recovery: bool,
}

/// A scheduler-instance heartbeat row.
#[derive(Debug, Clone)]
pub struct SchedulerStateRecord {
    pub instance_id: String,
    pub checkin_timestamp: DateTime<Utc>,
    pub checkin_interval_ms: i64,
    /// Instance currently recovering this peer's orphaned work, if any.
    pub recoverer: Option<String>,
}

impl SchedulerStateRecord {
    /// Whether the instance has missed enough check-ins to be considered
    /// failed at `now`.
    pub fn is_failed_at(&self, now: DateTime<Utc>) -> bool {
        let deadline =
            self.checkin_timestamp + chrono::Duration::milliseconds(2 * self.checkin_interval_ms);
        deadline < now
    }
}

/// State and next fire time of a trigger, with its job reference.
#[derive(Debug, Clone)]
pub struct TriggerStatus {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub state: TriggerState,
    pub next_fire_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_failure_detection_window() {
        let record = SchedulerStateRecord {
            instance_id: "a".to_string(),
            checkin_timestamp: Utc.timestamp_millis_opt(10_000).unwrap(),
            checkin_interval_ms: 1_000,
            recoverer: None,
        };
        // alive through checkin + 2 * interval
        assert!(!record.is_failed_at(Utc.timestamp_millis_opt(12_000).unwrap()));
        assert!(record.is_failed_at(Utc.timestamp_millis_opt(12_001).unwrap()));
    }
}
