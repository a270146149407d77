//! Job coordinator: submission, status, cancellation, and the per-job driver.
//!
//! Owns the job table and the lifecycle of every job: admission-gated start,
//! chunk dispatch through a bounded worker pool, order-independent result
//! folding, and the single terminal path that releases the admission slot
//! and fires the finisher exactly once.

mod dispatch;
mod run;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::admission::AdmissionPool;
use crate::config::EngineConfig;
use crate::control::JobControl;
use crate::error::{BatchError, EngineError};
use crate::executor::{BatchContext, BatchExecutor, BatchProcessor};
use crate::finisher::Finisher;
use crate::job::{JobHandle, JobId, JobSnapshot, JobStats};
use crate::ledger::JobLedger;
use crate::retry::RetryPolicy;
use crate::source::RecordSource;

/// One job submission: the record source, the processing function, and the
/// optional knobs (chunk size, finisher, tenant, submitter).
pub struct SubmitRequest<R> {
    source: Box<dyn RecordSource<R>>,
    processor: BatchProcessor<R>,
    chunk_size: Option<usize>,
    finisher: Option<Finisher>,
    tenant: String,
    submitter: String,
}

impl<R> SubmitRequest<R> {
    pub fn new<S, F>(source: S, processor: F) -> Self
    where
        S: RecordSource<R> + 'static,
        F: Fn(&mut BatchContext, &[R]) -> Result<(), BatchError> + Send + Sync + 'static,
    {
        Self {
            source: Box::new(source),
            processor: Arc::new(processor),
            chunk_size: None,
            finisher: None,
            tenant: "default".to_string(),
            submitter: String::new(),
        }
    }

    /// Batch size for this job (clamped to the configured maximum).
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }

    /// Hook fired exactly once with the final statistics.
    pub fn finisher<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&JobStats) -> anyhow::Result<()> + Send + 'static,
    {
        self.finisher = Some(Box::new(f));
        self
    }

    /// Tenant whose admission slots this job competes for.
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn submitter(mut self, submitter: impl Into<String>) -> Self {
        self.submitter = submitter.into();
        self
    }
}

/// The record-batch job engine. Submission is fire-and-forget: the job runs
/// on a background driver task and outcomes are observed via `status` and
/// the finisher hook.
pub struct Engine<R> {
    cfg: EngineConfig,
    admission: Arc<AdmissionPool>,
    control: Arc<JobControl>,
    jobs: Arc<RwLock<HashMap<JobId, Arc<JobHandle>>>>,
    ledger: Option<JobLedger>,
    next_id: AtomicU64,
    _records: PhantomData<fn(R)>,
}

impl<R: Send + 'static> Engine<R> {
    pub fn new(cfg: EngineConfig) -> Self {
        let ceiling = cfg.admission_ceiling;
        Self {
            cfg,
            admission: Arc::new(AdmissionPool::new(ceiling)),
            control: Arc::new(JobControl::new()),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            ledger: None,
            next_id: AtomicU64::new(1),
            _records: PhantomData,
        }
    }

    /// Attach a durable audit ledger; job rows and state transitions are
    /// mirrored there. Ledger write failures are logged, never fatal.
    pub fn with_ledger(mut self, ledger: JobLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Submit a job. Returns once the job is recorded as Queued; execution
    /// proceeds asynchronously. Fails with `AdmissionDenied` only when a
    /// hard cap on live jobs is configured and saturated; otherwise the job
    /// waits its turn (FIFO) for an admission slot.
    pub async fn submit(&self, req: SubmitRequest<R>) -> Result<JobId, EngineError> {
        if let Some(cap) = self.cfg.max_live_jobs {
            let active = self.live_jobs(&req.tenant);
            if active >= cap {
                return Err(EngineError::AdmissionDenied {
                    tenant: req.tenant,
                    active,
                    cap,
                });
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(JobHandle::new(id, req.tenant, req.submitter));
        self.jobs.write().unwrap().insert(id, Arc::clone(&handle));

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.insert_job(&handle.snapshot()).await {
                tracing::warn!(job_id = id, error = %e, "ledger insert failed");
            }
        }

        let abort = self.control.register(id);
        let chunk_size = req
            .chunk_size
            .unwrap_or(self.cfg.default_chunk_size)
            .clamp(1, self.cfg.max_chunk_size);
        let policy = self
            .cfg
            .retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default();
        let executor = Arc::new(BatchExecutor::new(
            req.processor,
            policy,
            self.cfg.batch_ops_budget,
        ));

        let job = run::JobRun {
            handle,
            source: req.source,
            executor,
            chunk_size,
            max_workers: self.cfg.max_workers.max(1),
            finisher: req.finisher,
            abort,
        };
        let admission = Arc::clone(&self.admission);
        let control = Arc::clone(&self.control);
        let ledger = self.ledger.clone();
        tokio::spawn(run::run_job(job, admission, control, ledger));

        tracing::info!(job_id = id, chunk_size, "job submitted");
        Ok(id)
    }

    /// Best-known aggregate state of a job.
    pub fn status(&self, id: JobId) -> Result<JobSnapshot, EngineError> {
        self.jobs
            .read()
            .unwrap()
            .get(&id)
            .map(|h| h.snapshot())
            .ok_or(EngineError::JobNotFound(id))
    }

    /// Snapshots of all known jobs, newest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut out: Vec<JobSnapshot> = self
            .jobs
            .read()
            .unwrap()
            .values()
            .map(|h| h.snapshot())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }

    /// Request cancellation. Dispatch of further batches stops promptly;
    /// committed batch work stays committed. Idempotent: cancelling a job
    /// already at a terminal state is an acknowledged no-op.
    pub fn cancel(&self, id: JobId) -> Result<(), EngineError> {
        let handle = self
            .jobs
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(EngineError::JobNotFound(id))?;
        if handle.state().is_terminal() {
            return Ok(());
        }
        self.control.request_abort(id);
        tracing::info!(job_id = id, "cancellation requested");
        Ok(())
    }

    fn live_jobs(&self, tenant: &str) -> usize {
        self.jobs
            .read()
            .unwrap()
            .values()
            .filter(|h| h.tenant == tenant && !h.state().is_terminal())
            .count()
    }
}
