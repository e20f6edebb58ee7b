//! Triggers: when a job should run.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::datamap::JobDataMap;
use crate::error::{StoreError, StoreResult};
use crate::keys::{JobKey, TriggerKey};
use crate::model::state::misfire_policy;

/// Discriminator values persisted in `TRIGGER_TYPE`.
pub const TRIGGER_TYPE_SIMPLE: &str = "SIMPLE";
pub const TRIGGER_TYPE_CRON: &str = "CRON";
pub const TRIGGER_TYPE_BLOB: &str = "BLOB";

/// Repeat-count value meaning "repeat forever".
pub const REPEAT_INDEFINITELY: i32 = -1;

/// The variant payload of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerKind {
    /// Fires at `start_time` and then every `repeat_interval_ms` until the
    /// repeat count is exhausted.
    Simple {
        /// Number of repeats after the first fire; `REPEAT_INDEFINITELY`
        /// for no limit.
        repeat_count: i32,
        repeat_interval_ms: i64,
        times_triggered: i32,
    },
    /// Fires on a cron schedule evaluated in the named time zone.
    Cron {
        cron_expression: String,
        time_zone_id: String,
    },
    /// Opaque serialized trigger payload; scheduling is owned by the
    /// hosting scheduler, the store only carries the base-row fire times.
    Blob { payload: Vec<u8> },
}

impl TriggerKind {
    pub fn discriminator(&self) -> &'static str {
        match self {
            Self::Simple { .. } => TRIGGER_TYPE_SIMPLE,
            Self::Cron { .. } => TRIGGER_TYPE_CRON,
            Self::Blob { .. } => TRIGGER_TYPE_BLOB,
        }
    }
}

/// A stored trigger: base attributes plus one variant payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub description: Option<String>,
    pub volatile: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub prev_fire_time: Option<DateTime<Utc>>,
    pub calendar_name: Option<String>,
    pub misfire_instruction: i32,
    pub job_data: JobDataMap,
    pub listeners: Vec<String>,
    pub kind: TriggerKind,
}

impl Trigger {
    /// A simple trigger that first fires at `start_time`.
    pub fn new_simple(
        key: TriggerKey,
        job_key: JobKey,
        start_time: DateTime<Utc>,
        repeat_count: i32,
        repeat_interval_ms: i64,
    ) -> Self {
        Self {
            key,
            job_key,
            description: None,
            volatile: false,
            start_time,
            end_time: None,
            next_fire_time: Some(start_time),
            prev_fire_time: None,
            calendar_name: None,
            misfire_instruction: misfire_policy::SMART_POLICY,
            job_data: JobDataMap::new(),
            listeners: Vec::new(),
            kind: TriggerKind::Simple {
                repeat_count,
                repeat_interval_ms,
                times_triggered: 0,
            },
        }
    }

    /// A cron trigger. The first fire time is the first schedule match at
    /// or after `start_time`.
    pub fn new_cron(
        key: TriggerKey,
        job_key: JobKey,
        start_time: DateTime<Utc>,
        cron_expression: impl Into<String>,
        time_zone_id: impl Into<String>,
    ) -> Self {
        let mut trigger = Self {
            key,
            job_key,
            description: None,
            volatile: false,
            start_time,
            end_time: None,
            next_fire_time: None,
            prev_fire_time: None,
            calendar_name: None,
            misfire_instruction: misfire_policy::SMART_POLICY,
            job_data: JobDataMap::new(),
            listeners: Vec::new(),
            kind: TriggerKind::Cron {
                cron_expression: cron_expression.into(),
                time_zone_id: time_zone_id.into(),
            },
        };
        trigger.next_fire_time = trigger.next_fire_after(start_time - Duration::milliseconds(1));
        trigger
    }

    /// Validate the variant payload before it hits the database: the cron
    /// expression must parse and the time zone id must be known.
    pub fn validate(&self) -> StoreResult<()> {
        match &self.kind {
            TriggerKind::Cron {
                cron_expression,
                time_zone_id,
            } => {
                Schedule::from_str(cron_expression).map_err(|e| {
                    StoreError::Persistence(format!(
                        "invalid cron expression '{cron_expression}': {e}"
                    ))
                })?;
                time_zone_id.parse::<Tz>().map_err(|_| {
                    StoreError::Persistence(format!("unknown time zone id '{time_zone_id}'"))
                })?;
                Ok(())
            }
            TriggerKind::Simple {
                repeat_count,
                repeat_interval_ms,
                ..
            } => {
                if *repeat_count != 0 && *repeat_interval_ms <= 0 {
                    return Err(StoreError::Persistence(
                        "repeat interval must be positive for a repeating trigger".to_string(),
                    ));
                }
                Ok(())
            }
            TriggerKind::Blob { .. } => Ok(()),
        }
    }

    /// The first scheduled fire time strictly after `after`, ignoring how
    /// many times the trigger has already fired. `None` when the schedule
    /// has no further instants.
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let candidate = match &self.kind {
            TriggerKind::Simple {
                repeat_count,
                repeat_interval_ms,
                ..
            } => {
                if after < self.start_time {
                    Some(self.start_time)
                } else if *repeat_interval_ms <= 0 {
                    None
                } else {
                    let elapsed = after
                        .signed_duration_since(self.start_time)
                        .num_milliseconds();
                    let n = elapsed / repeat_interval_ms + 1;
                    if *repeat_count != REPEAT_INDEFINITELY && n > *repeat_count as i64 {
                        None
                    } else {
                        Some(self.start_time + Duration::milliseconds(n * repeat_interval_ms))
                    }
                }
            }
            TriggerKind::Cron {
                cron_expression,
                time_zone_id,
            } => {
                let schedule = Schedule::from_str(cron_expression).ok()?;
                let tz: Tz = time_zone_id.parse().unwrap_or(chrono_tz::UTC);
                let floor = after.max(self.start_time - Duration::milliseconds(1));
                schedule
                    .after(&floor.with_timezone(&tz))
                    .next()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            TriggerKind::Blob { .. } => None,
        };
        candidate.filter(|t| self.end_time.map_or(true, |end| *t <= end))
    }

    /// Advance the trigger past one fire: previous fire time becomes the
    /// fire just dispatched, the next fire time is recomputed by the
    /// variant, and the simple-trigger fire counter is bumped.
    pub fn triggered(&mut self) {
        let fired_at = self.next_fire_time;
        self.prev_fire_time = fired_at;
        let stepped = match &mut self.kind {
            TriggerKind::Simple {
                repeat_count,
                repeat_interval_ms,
                times_triggered,
            } => {
                *times_triggered += 1;
                let exhausted =
                    *repeat_count != REPEAT_INDEFINITELY && *times_triggered > *repeat_count;
                match fired_at {
                    Some(at) if !exhausted => {
                        Some(at + Duration::milliseconds(*repeat_interval_ms))
                    }
                    _ => None,
                }
            }
            TriggerKind::Cron { .. } | TriggerKind::Blob { .. } => None,
        };
        self.next_fire_time = if matches!(self.kind, TriggerKind::Cron { .. }) {
            fired_at.and_then(|at| self.next_fire_after(at))
        } else {
            stepped.filter(|t| self.end_time.map_or(true, |end| *t <= end))
        };
    }

    /// Apply the trigger's misfire instruction at `now`. Afterwards the
    /// next fire time is either at or past `now`, or `None` when the
    /// schedule is exhausted (the caller then completes the trigger).
    pub fn apply_misfire(&mut self, now: DateTime<Utc>) {
        match self.resolved_misfire_policy() {
            misfire_policy::FIRE_NOW | misfire_policy::RESCHEDULE_NOW => {
                self.next_fire_time = Some(now);
            }
            _ => {
                self.next_fire_time = self.next_fire_after(now);
            }
        }
    }

    fn resolved_misfire_policy(&self) -> i32 {
        if self.misfire_instruction != misfire_policy::SMART_POLICY {
            return self.misfire_instruction;
        }
        match self.kind {
            TriggerKind::Simple { .. } | TriggerKind::Cron { .. } => misfire_policy::FIRE_NOW,
            TriggerKind::Blob { .. } => misfire_policy::DO_NOTHING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn simple(repeat_count: i32, interval_ms: i64) -> Trigger {
        Trigger::new_simple(
            TriggerKey::new("t1", "g1"),
            JobKey::new("j1", "g1"),
            Utc.timestamp_millis_opt(1_000).unwrap(),
            repeat_count,
            interval_ms,
        )
    }

    #[test]
    fn test_simple_first_fire_is_start() {
        let trigger = simple(3, 1_000);
        assert_eq!(
            trigger.next_fire_time,
            Some(Utc.timestamp_millis_opt(1_000).unwrap())
        );
    }

    #[test]
    fn test_simple_triggered_advances() {
        let mut trigger = simple(3, 1_000);
        trigger.triggered();
        assert_eq!(
            trigger.prev_fire_time,
            Some(Utc.timestamp_millis_opt(1_000).unwrap())
        );
        assert_eq!(
            trigger.next_fire_time,
            Some(Utc.timestamp_millis_opt(2_000).unwrap())
        );
        match trigger.kind {
            TriggerKind::Simple {
                times_triggered, ..
            } => assert_eq!(times_triggered, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_simple_repeat_count_exhaustion() {
        // repeat_count = 1 means two fires in total
        let mut trigger = simple(1, 1_000);
        trigger.triggered();
        assert!(trigger.next_fire_time.is_some());
        trigger.triggered();
        assert_eq!(trigger.next_fire_time, None);
    }

    #[test]
    fn test_simple_end_time_cuts_schedule() {
        let mut trigger = simple(REPEAT_INDEFINITELY, 1_000);
        trigger.end_time = Some(Utc.timestamp_millis_opt(2_500).unwrap());
        trigger.triggered(); // next = 2000, within end
        assert!(trigger.next_fire_time.is_some());
        trigger.triggered(); // next would be 3000, past end
        assert_eq!(trigger.next_fire_time, None);
    }

    #[test]
    fn test_simple_next_fire_after_skips_missed() {
        let trigger = simple(REPEAT_INDEFINITELY, 1_000);
        let next = trigger
            .next_fire_after(Utc.timestamp_millis_opt(5_500).unwrap())
            .unwrap();
        assert_eq!(next, Utc.timestamp_millis_opt(6_000).unwrap());
    }

    #[test]
    fn test_simple_next_fire_after_respects_count() {
        let trigger = simple(2, 1_000);
        // fires at 1000, 2000, 3000; nothing after 3000
        assert!(trigger
            .next_fire_after(Utc.timestamp_millis_opt(2_500).unwrap())
            .is_some());
        assert!(trigger
            .next_fire_after(Utc.timestamp_millis_opt(3_000).unwrap())
            .is_none());
    }

    #[test]
    fn test_misfire_fire_now() {
        let mut trigger = simple(3, 1_000);
        trigger.misfire_instruction = misfire_policy::FIRE_NOW;
        let now = Utc.timestamp_millis_opt(10_000).unwrap();
        trigger.apply_misfire(now);
        assert_eq!(trigger.next_fire_time, Some(now));
    }

    #[test]
    fn test_misfire_do_nothing_advances_on_schedule() {
        let mut trigger = simple(REPEAT_INDEFINITELY, 1_000);
        trigger.misfire_instruction = misfire_policy::DO_NOTHING;
        trigger.apply_misfire(Utc.timestamp_millis_opt(10_500).unwrap());
        assert_eq!(
            trigger.next_fire_time,
            Some(Utc.timestamp_millis_opt(11_000).unwrap())
        );
    }

    #[test]
    fn test_misfire_exhausted_schedule_yields_none() {
        let mut trigger = simple(0, 0);
        trigger.misfire_instruction = misfire_policy::DO_NOTHING;
        trigger.apply_misfire(Utc.timestamp_millis_opt(10_000).unwrap());
        assert_eq!(trigger.next_fire_time, None);
    }

    #[test]
    fn test_cron_first_fire() {
        // every minute on the minute
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 30).unwrap();
        let trigger = Trigger::new_cron(
            TriggerKey::new("c1", "g1"),
            JobKey::new("j1", "g1"),
            start,
            "0 * * * * *",
            "UTC",
        );
        assert_eq!(
            trigger.next_fire_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap())
        );
    }

    #[test]
    fn test_cron_triggered_advances() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut trigger = Trigger::new_cron(
            TriggerKey::new("c1", "g1"),
            JobKey::new("j1", "g1"),
            start,
            "0 * * * * *",
            "UTC",
        );
        trigger.triggered();
        assert_eq!(
            trigger.next_fire_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap())
        );
    }

    #[test]
    fn test_cron_validate_rejects_garbage() {
        let trigger = Trigger::new_cron(
            TriggerKey::new("c1", "g1"),
            JobKey::new("j1", "g1"),
            Utc::now(),
            "not a cron line",
            "UTC",
        );
        assert!(trigger.validate().is_err());

        let trigger = Trigger::new_cron(
            TriggerKey::new("c2", "g1"),
            JobKey::new("j1", "g1"),
            Utc::now(),
            "0 * * * * *",
            "Mars/Olympus_Mons",
        );
        assert!(trigger.validate().is_err());
    }

    #[test]
    fn test_blob_completes_after_fire() {
        let mut trigger = Trigger {
            kind: TriggerKind::Blob {
                payload: vec![1, 2, 3],
            },
            ..simple(0, 0)
        };
        trigger.next_fire_time = Some(Utc.timestamp_millis_opt(1_000).unwrap());
        trigger.triggered();
        assert_eq!(trigger.next_fire_time, None);
    }
}
