//! Job definitions.

use crate::datamap::JobDataMap;
use crate::keys::JobKey;

/// A stored job: what to run, how it behaves across restarts, and the data
/// handed to each execution.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDetail {
    pub key: JobKey,
    pub description: Option<String>,
    /// Opaque class name resolved by the hosting scheduler's `ClassResolver`.
    pub job_class: String,
    /// A durable job survives the deletion of its last trigger.
    pub durable: bool,
    /// A volatile job is not recovered after a scheduler restart.
    pub volatile: bool,
    /// Executions of a stateful job are serialized across all its triggers.
    pub stateful: bool,
    /// Whether the job should be re-run if its instance dies mid-execution.
    pub requests_recovery: bool,
    pub job_data: JobDataMap,
    /// Ordered listener names, persisted as associations.
    pub listeners: Vec<String>,
}

impl JobDetail {
    pub fn new(key: JobKey, job_class: impl Into<String>) -> Self {
        Self {
            key,
            description: None,
            job_class: job_class.into(),
            durable: false,
            volatile: false,
            stateful: false,
            requests_recovery: false,
            job_data: JobDataMap::new(),
            listeners: Vec::new(),
        }
    }
}
