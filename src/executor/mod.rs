//! Batch executor: run the user processor over one batch in isolation.
//!
//! Each invocation is batch-scoped: a fresh context (independent ops budget),
//! whole-batch success or failure accounting, and containment of failures —
//! a failed batch is recorded and never aborts the job or later batches.

mod context;

pub use context::BatchContext;

use std::sync::Arc;

use crate::chunker::Batch;
use crate::error::BatchError;
use crate::retry::{classify, RetryDecision, RetryPolicy};

/// User-supplied processing function, invoked once per batch attempt with a
/// fresh context. Shared across concurrent workers.
pub type BatchProcessor<R> =
    Arc<dyn Fn(&mut BatchContext, &[R]) -> Result<(), BatchError> + Send + Sync>;

/// Outcome of one batch's execution, folded into the job's counters.
#[derive(Debug)]
pub struct BatchResult {
    pub seq: u64,
    /// Records in the batch.
    pub records: usize,
    /// Records durably applied by the processor.
    pub processed: usize,
    /// Records not applied (whole batch on a batch-level error, or the
    /// rejected subset on a partial failure).
    pub failed: usize,
    /// Attempts spent (1 unless retry is configured).
    pub attempts: u32,
    /// The final error when the batch did not fully succeed.
    pub error: Option<BatchError>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs batches through the processor with per-batch retry. Cheap to clone;
/// one instance is shared by all workers of a job.
pub struct BatchExecutor<R> {
    processor: BatchProcessor<R>,
    policy: RetryPolicy,
    ops_budget: u64,
}

impl<R> Clone for BatchExecutor<R> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            policy: self.policy,
            ops_budget: self.ops_budget,
        }
    }
}

impl<R: Send + 'static> BatchExecutor<R> {
    pub fn new(processor: BatchProcessor<R>, policy: RetryPolicy, ops_budget: u64) -> Self {
        Self {
            processor,
            policy,
            ops_budget,
        }
    }

    /// Execute one batch to a final outcome. The batch is consumed: records
    /// are dropped with the result, only counts and errors survive.
    ///
    /// Batch-scoped atomicity contract: on `Ok` every record counts as
    /// processed; on a batch-level `Err` none do. `BatchError::Records`
    /// reports a partial failure (the rest of the batch applied).
    pub async fn execute(&self, batch: Batch<R>) -> BatchResult {
        let total = batch.len();
        let mut attempt = 1u32;
        loop {
            let mut ctx = BatchContext::new(self.ops_budget);
            match (self.processor)(&mut ctx, &batch.records) {
                Ok(()) => {
                    return BatchResult {
                        seq: batch.seq,
                        records: total,
                        processed: total,
                        failed: 0,
                        attempts: attempt,
                        error: None,
                    }
                }
                Err(e) => {
                    let kind = classify(&e);
                    match self.policy.decide(attempt, kind) {
                        RetryDecision::RetryAfter(delay) => {
                            tracing::debug!(
                                seq = batch.seq,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "batch failed, retrying after backoff"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        RetryDecision::NoRetry => {
                            let failed = match &e {
                                BatchError::Records(errors) => errors.len().min(total),
                                _ => total,
                            };
                            tracing::debug!(
                                seq = batch.seq,
                                attempts = attempt,
                                failed,
                                error = %e,
                                "batch failed"
                            );
                            return BatchResult {
                                seq: batch.seq,
                                records: total,
                                processed: total - failed,
                                failed,
                                attempts: attempt,
                                error: Some(e),
                            };
                        }
                    }
                }
            }
        }
    }
}
