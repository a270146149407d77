//! Drive one job from Queued to a terminal state.
//!
//! Single terminal path: whatever the outcome, the admission slot is
//! released, the control token unregistered, the ledger updated, and the
//! finisher fired exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::admission::AdmissionPool;
use crate::chunker::Chunker;
use crate::control::JobControl;
use crate::executor::BatchExecutor;
use crate::finisher::{self, Finisher};
use crate::job::{JobHandle, JobState};
use crate::ledger::JobLedger;
use crate::source::RecordSource;

use super::dispatch::dispatch_batches;

/// Everything the driver task needs for one job.
pub(super) struct JobRun<R> {
    pub handle: Arc<JobHandle>,
    pub source: Box<dyn RecordSource<R>>,
    pub executor: Arc<BatchExecutor<R>>,
    pub chunk_size: usize,
    pub max_workers: usize,
    pub finisher: Option<Finisher>,
    pub abort: Arc<AtomicBool>,
}

pub(super) async fn run_job<R: Send + 'static>(
    job: JobRun<R>,
    admission: Arc<AdmissionPool>,
    control: Arc<JobControl>,
    ledger: Option<JobLedger>,
) {
    let handle = Arc::clone(&job.handle);
    let job_id = handle.id;

    // Wait for an admission slot, FIFO, while staying responsive to a
    // cancellation arriving in Queued.
    let acquire = admission.acquire_future(&handle.tenant);
    tokio::pin!(acquire);
    let slot = loop {
        if job.abort.load(Ordering::Relaxed) {
            break None;
        }
        tokio::select! {
            slot = &mut acquire => break Some(slot),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
    };

    // The slot stays held until the terminal state is set below, so a waiting
    // job cannot start while this one is still Processing.
    let (final_state, fault) = if slot.is_none() || job.abort.load(Ordering::Relaxed) {
        (JobState::Aborted, None)
    } else {
        handle.set_state(JobState::Processing);
        ledger_set_state(&ledger, &handle).await;
        tracing::info!(job_id, tenant = %handle.tenant, "job processing");

        match job.source.open() {
            Err(e) => (JobState::Failed, Some(e.to_string())),
            Ok(cursor) => {
                let chunker = Chunker::new(cursor, job.chunk_size);
                let outcome = dispatch_batches(
                    chunker,
                    job.executor,
                    &handle,
                    &job.abort,
                    job.max_workers,
                )
                .await;
                if let Some(detail) = outcome.fault {
                    (JobState::Failed, Some(detail))
                } else if outcome.aborted {
                    (JobState::Aborted, None)
                } else {
                    (JobState::Completed, None)
                }
            }
        }
    };

    if let Some(detail) = &fault {
        tracing::warn!(job_id, fault = %detail, "job failed with coordinator fault");
        handle.set_fault(detail.clone());
    }
    handle.set_state(final_state);
    control.unregister(job_id);
    drop(slot);

    let stats = handle.stats();
    if let Some(ledger) = &ledger {
        if let Err(e) = ledger.record_final(&stats).await {
            tracing::warn!(job_id, error = %e, "ledger final update failed");
        }
    }

    tracing::info!(
        job_id,
        state = final_state.as_str(),
        total = stats.total_records,
        processed = stats.processed_records,
        errors = stats.error_records,
        "job reached terminal state"
    );
    finisher::fire(job_id, job.finisher, &stats);
}

async fn ledger_set_state(ledger: &Option<JobLedger>, handle: &JobHandle) {
    if let Some(ledger) = ledger {
        if let Err(e) = ledger.set_state(handle.id, handle.state()).await {
            tracing::warn!(job_id = handle.id, error = %e, "ledger state update failed");
        }
    }
}
