//! Persistent data model: jobs, triggers, calendars and ledger rows.

mod calendar;
mod job;
mod records;
mod state;
mod trigger;

pub use calendar::Calendar;
pub use job::JobDetail;
pub use records::{FiredTriggerRecord, SchedulerStateRecord, TriggerStatus};
pub use state::{misfire_policy, CompletedInstruction, EntryState, TriggerState};
pub use trigger::{
    Trigger, TriggerKind, REPEAT_INDEFINITELY, TRIGGER_TYPE_BLOB, TRIGGER_TYPE_CRON,
    TRIGGER_TYPE_SIMPLE,
};
