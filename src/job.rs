//! Job identity, state machine, counters, and status snapshots.
//!
//! The coordinator is the only writer of job state. Counters are atomics so
//! batch results can be folded in whatever order they arrive; a fold is
//! commutative increments only, never order-dependent logic.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::executor::BatchResult;

/// Job identifier, opaque to callers and unique within one engine.
pub type JobId = u64;

/// Lifecycle states. Completed, Failed, and Aborted are terminal; a job
/// never leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    Aborted,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Aborted => "aborted",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => JobState::Queued,
            "processing" => JobState::Processing,
            "completed" => JobState::Completed,
            "aborted" => JobState::Aborted,
            _ => JobState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Aborted
        )
    }
}

/// Final statistics handed to the finisher hook and recorded in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    pub job_id: JobId,
    pub state: JobState,
    /// Records fed by the source (authoritative once the cursor is exhausted).
    pub total_records: u64,
    pub processed_records: u64,
    pub error_records: u64,
    pub batches_dispatched: u64,
    pub batches_completed: u64,
    pub batches_failed: u64,
    /// Coordinator fault detail when state is Failed.
    pub fault: Option<String>,
}

/// Point-in-time view answered by the status query. Always reflects the
/// best-known aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub state: JobState,
    pub tenant: String,
    pub submitter: String,
    pub total_records: u64,
    pub processed_records: u64,
    pub error_records: u64,
    pub created_at: i64,
}

/// Shared mutable core of one job. Counters are the only state touched from
/// concurrent batch executions; everything else is coordinator-owned.
pub(crate) struct JobHandle {
    pub id: JobId,
    pub tenant: String,
    pub submitter: String,
    pub created_at: i64,
    state: Mutex<JobState>,
    total: AtomicU64,
    processed: AtomicU64,
    errors: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    fault: Mutex<Option<String>>,
}

impl JobHandle {
    pub fn new(id: JobId, tenant: String, submitter: String) -> Self {
        Self {
            id,
            tenant,
            submitter,
            created_at: unix_timestamp(),
            state: Mutex::new(JobState::Queued),
            total: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            fault: Mutex::new(None),
        }
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap()
    }

    /// Transition to `next`. Refused once terminal: returns false and leaves
    /// the job untouched.
    pub fn set_state(&self, next: JobState) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.is_terminal() {
            tracing::debug!(
                job_id = self.id,
                from = state.as_str(),
                to = next.as_str(),
                "ignoring transition out of terminal state"
            );
            return false;
        }
        *state = next;
        true
    }

    pub fn set_fault(&self, detail: String) {
        *self.fault.lock().unwrap() = Some(detail);
    }

    /// Account a batch handed to the worker pool.
    pub fn record_dispatch(&self, records: usize) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(records as u64, Ordering::Relaxed);
    }

    /// Fold one batch outcome into the aggregate counters. Order-independent:
    /// increments only, safe under any arrival interleaving.
    pub fn apply_result(&self, result: &BatchResult) {
        self.processed
            .fetch_add(result.processed as u64, Ordering::Relaxed);
        self.errors.fetch_add(result.failed as u64, Ordering::Relaxed);
        self.completed.fetch_add(1, Ordering::Relaxed);
        if result.error.is_some() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            state: self.state(),
            tenant: self.tenant.clone(),
            submitter: self.submitter.clone(),
            total_records: self.total.load(Ordering::Relaxed),
            processed_records: self.processed.load(Ordering::Relaxed),
            error_records: self.errors.load(Ordering::Relaxed),
            created_at: self.created_at,
        }
    }

    pub fn stats(&self) -> JobStats {
        JobStats {
            job_id: self.id,
            state: self.state(),
            total_records: self.total.load(Ordering::Relaxed),
            processed_records: self.processed.load(Ordering::Relaxed),
            error_records: self.errors.load(Ordering::Relaxed),
            batches_dispatched: self.dispatched.load(Ordering::Relaxed),
            batches_completed: self.completed.load(Ordering::Relaxed),
            batches_failed: self.failed.load(Ordering::Relaxed),
            fault: self.fault.lock().unwrap().clone(),
        }
    }
}

pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
