//! Error taxonomy: source faults, per-batch failures, and engine-level errors.
//!
//! Per-batch errors are recovered locally (recorded in counters, never abort
//! the job); source and coordinator errors are fatal to the job and reported
//! through the finisher hook, never thrown back to the submitter.

use thiserror::Error;

/// Failure raised by a record source or its cursor. Fatal to the job:
/// the coordinator transitions it to Failed.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backing store vanished or broke mid-iteration.
    #[error("record source exhausted: {0}")]
    Exhausted(String),

    /// A query-backed source produced more records than the configured ceiling.
    #[error("query result count {seen} exceeds ceiling {ceiling}")]
    QueryLimitExceeded { seen: u64, ceiling: u64 },
}

/// Failure of one record inside a batch (partial-failure reporting).
#[derive(Debug, Clone, Error)]
#[error("record {index}: {detail}")]
pub struct RecordError {
    /// Index of the record within its batch.
    pub index: usize,
    pub detail: String,
}

/// Failure returned by a batch processor. Per-batch and non-fatal: the job
/// keeps running; the failed batch is counted and later batches still execute.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Transient failure (lock contention, remote hiccup). The only
    /// retryable kind.
    #[error("transient: {0}")]
    Transient(String),

    /// The per-batch operations budget ran out. Deterministic, not retried.
    #[error("batch ops budget exhausted: used {used} of {budget}")]
    BudgetExceeded { used: u64, budget: u64 },

    /// A subset of records was rejected; the rest of the batch applied.
    #[error("{} record(s) rejected", .0.len())]
    Records(Vec<RecordError>),

    /// Any other processor failure. Not retried.
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the engine's submission/status/cancel API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The hard cap on live jobs for this tenant is saturated. Only raised
    /// when a cap is configured; the FIFO delay policy otherwise queues.
    #[error("admission denied for tenant {tenant}: {active} jobs active, cap {cap}")]
    AdmissionDenied {
        tenant: String,
        active: usize,
        cap: usize,
    },

    /// No job with this id is known to the engine.
    #[error("job {0} not found")]
    JobNotFound(u64),

    /// Coordinator-level fault (source failure, worker panic). Transitions
    /// the job to Failed; individual batch failures never raise this.
    #[error("coordinator fault: {0}")]
    CoordinatorFault(String),
}

impl From<SourceError> for EngineError {
    fn from(e: SourceError) -> Self {
        EngineError::CoordinatorFault(e.to_string())
    }
}
