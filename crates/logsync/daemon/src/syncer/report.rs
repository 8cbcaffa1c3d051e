//! Cycle results

use chrono::{DateTime, Utc};

/// Result of one sync cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Pipelines are not deployed for the scope; nothing was touched
    Disabled,

    /// The engine pre-check failed; no records were read
    EngineUnavailable,

    /// Listing in-progress records failed
    ListFailed,

    /// Records were processed
    Completed(CycleReport),
}

impl CycleOutcome {
    /// Whether the cycle counts towards backoff
    pub fn is_failure(&self) -> bool {
        match self {
            CycleOutcome::Disabled => false,
            CycleOutcome::EngineUnavailable | CycleOutcome::ListFailed => true,
            CycleOutcome::Completed(report) => report.aborted,
        }
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Per-record tallies for a completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,

    /// Records returned by the selector
    pub listed: usize,

    /// Step not started yet; record left untouched
    pub skipped_waiting: usize,

    /// Log text refreshed and persisted
    pub synced: usize,

    /// Records marked finished this cycle, including faulted ones
    pub finished: usize,

    /// Malformed key, missing execution, bad index or log fetch failure
    pub faulted: usize,

    pub persist_failures: usize,

    /// Remaining records were abandoned after a persist failure
    pub aborted: bool,
}

impl CycleReport {
    pub fn new(listed: usize) -> Self {
        Self {
            started_at: Utc::now(),
            listed,
            skipped_waiting: 0,
            synced: 0,
            finished: 0,
            faulted: 0,
            persist_failures: 0,
            aborted: false,
        }
    }
}
