//! Trigger and fire-instance state enumerations.

use std::fmt;

/// Persisted state of a trigger row.
///
/// `Deleted` is never written; state queries return it when the row is
/// absent so callers can distinguish "gone" from "not eligible".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerState {
    Waiting,
    Acquired,
    Executing,
    Paused,
    Blocked,
    PausedBlocked,
    Complete,
    Error,
    Deleted,
}

impl TriggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Acquired => "ACQUIRED",
            Self::Executing => "EXECUTING",
            Self::Paused => "PAUSED",
            Self::Blocked => "BLOCKED",
            Self::PausedBlocked => "PAUSED_BLOCKED",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
            Self::Deleted => "DELETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WAITING" => Some(Self::Waiting),
            "ACQUIRED" => Some(Self::Acquired),
            "EXECUTING" => Some(Self::Executing),
            "PAUSED" => Some(Self::Paused),
            "BLOCKED" => Some(Self::Blocked),
            "PAUSED_BLOCKED" => Some(Self::PausedBlocked),
            "COMPLETE" => Some(Self::Complete),
            "ERROR" => Some(Self::Error),
            "DELETED" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a fired-trigger ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Acquired,
    Executing,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acquired => "ACQUIRED",
            Self::Executing => "EXECUTING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACQUIRED" => Some(Self::Acquired),
            "EXECUTING" => Some(Self::Executing),
            _ => None,
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integer misfire policy codes persisted in `MISFIRE_INSTR`.
pub mod misfire_policy {
    /// Let the variant pick an appropriate default.
    pub const SMART_POLICY: i32 = 0;
    /// Move the next fire time to now.
    pub const FIRE_NOW: i32 = 1;
    /// Advance the next fire time past now along the natural schedule.
    pub const DO_NOTHING: i32 = 2;
    /// Fire now, keeping the existing repeat count and interval.
    pub const RESCHEDULE_NOW: i32 = 3;
}

/// Instruction returned by the job executor at completion, shaping the
/// trigger's post-execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletedInstruction {
    NoInstruction,
    DeleteTrigger,
    SetTriggerComplete,
    SetTriggerError,
    SetAllJobTriggersComplete,
    SetAllJobTriggersError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_state_roundtrip() {
        for state in [
            TriggerState::Waiting,
            TriggerState::Acquired,
            TriggerState::Executing,
            TriggerState::Paused,
            TriggerState::Blocked,
            TriggerState::PausedBlocked,
            TriggerState::Complete,
            TriggerState::Error,
            TriggerState::Deleted,
        ] {
            assert_eq!(TriggerState::parse(state.as_str()), Some(state));
        }
        assert_eq!(TriggerState::parse("bogus"), None);
    }

    #[test]
    fn test_entry_state_roundtrip() {
        assert_eq!(
            EntryState::parse(EntryState::Acquired.as_str()),
            Some(EntryState::Acquired)
        );
        assert_eq!(
            EntryState::parse(EntryState::Executing.as_str()),
            Some(EntryState::Executing)
        );
        assert_eq!(EntryState::parse(""), None);
    }
}
