//! Bounded worker pool for one job's batches.
//!
//! Pulls batches from the chunker in sequence order, keeps up to
//! `max_workers` executing at once, and folds results as they land — in
//! whatever order. Correct at `max_workers = 1` too, where it degenerates
//! to sequential dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::chunker::Chunker;
use crate::executor::BatchExecutor;
use crate::job::JobHandle;

/// How the dispatch loop ended.
pub(super) struct DispatchOutcome {
    /// Coordinator-level fault (source failure, worker panic), if any.
    pub fault: Option<String>,
    /// True when an abort request cut dispatch short.
    pub aborted: bool,
}

/// Drive all batches of one job to completion. Every dispatched batch gets
/// its result folded into the job counters before this returns, even when a
/// fault or abort stops further dispatch.
pub(super) async fn dispatch_batches<R: Send + 'static>(
    mut chunker: Chunker<R>,
    executor: Arc<BatchExecutor<R>>,
    handle: &Arc<JobHandle>,
    abort: &Arc<AtomicBool>,
    max_workers: usize,
) -> DispatchOutcome {
    let mut join_set = JoinSet::new();
    let mut exhausted = false;
    let mut aborted = false;
    let mut fault: Option<String> = None;

    loop {
        while !exhausted && !aborted && fault.is_none() && join_set.len() < max_workers {
            if abort.load(Ordering::Relaxed) {
                aborted = true;
                break;
            }
            match chunker.next_batch() {
                Ok(Some(batch)) => {
                    handle.record_dispatch(batch.len());
                    let exec = Arc::clone(&executor);
                    join_set.spawn(async move { exec.execute(batch).await });
                }
                Ok(None) => exhausted = true,
                Err(e) => fault = Some(e.to_string()),
            }
        }

        if join_set.is_empty() {
            break;
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        match joined {
            Ok(result) => {
                tracing::debug!(
                    job_id = handle.id,
                    seq = result.seq,
                    processed = result.processed,
                    failed = result.failed,
                    "batch result folded"
                );
                handle.apply_result(&result);
            }
            Err(e) => {
                // A worker panic is a coordinator fault, not a batch failure:
                // the batch's outcome is unknowable. Keep draining the rest.
                fault = Some(format!("batch worker panicked: {e}"));
            }
        }
    }

    DispatchOutcome { fault, aborted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatchError;
    use crate::executor::BatchContext;
    use crate::retry::RetryPolicy;
    use crate::source::{EagerSource, RecordSource};

    fn handle() -> Arc<JobHandle> {
        Arc::new(JobHandle::new(1, "default".into(), "tests".into()))
    }

    fn chunker(records: Vec<u32>, chunk_size: usize) -> Chunker<u32> {
        let cursor = RecordSource::open(Box::new(EagerSource::new(records))).unwrap();
        Chunker::new(cursor, chunk_size)
    }

    fn executor<F>(f: F) -> Arc<BatchExecutor<u32>>
    where
        F: Fn(&mut BatchContext, &[u32]) -> Result<(), BatchError> + Send + Sync + 'static,
    {
        Arc::new(BatchExecutor::new(
            Arc::new(f),
            RetryPolicy::default(),
            u64::MAX,
        ))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn all_batches_accounted() {
        let h = handle();
        let abort = Arc::new(AtomicBool::new(false));
        let out = dispatch_batches(
            chunker((0..1000).collect(), 200),
            executor(|_, _| Ok(())),
            &h,
            &abort,
            4,
        )
        .await;
        assert!(out.fault.is_none());
        assert!(!out.aborted);
        let stats = h.stats();
        assert_eq!(stats.batches_dispatched, 5);
        assert_eq!(stats.batches_completed, 5);
        assert_eq!(stats.processed_records, 1000);
        assert_eq!(stats.error_records, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sequential_dispatch_matches_parallel() {
        for workers in [1usize, 4] {
            let h = handle();
            let abort = Arc::new(AtomicBool::new(false));
            let out = dispatch_batches(
                chunker((0..103).collect(), 10),
                executor(|_, _| Ok(())),
                &h,
                &abort,
                workers,
            )
            .await;
            assert!(out.fault.is_none());
            let stats = h.stats();
            assert_eq!(stats.batches_completed, 11, "workers={workers}");
            assert_eq!(stats.processed_records, 103, "workers={workers}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_batch_does_not_stop_the_rest() {
        let h = handle();
        let abort = Arc::new(AtomicBool::new(false));
        let out = dispatch_batches(
            chunker((0..1000).collect(), 200),
            executor(|_, records| {
                // Batch #3 (records 400..600) fails entirely.
                if records[0] == 400 {
                    Err(BatchError::Other("bad partition".into()))
                } else {
                    Ok(())
                }
            }),
            &h,
            &abort,
            2,
        )
        .await;
        assert!(out.fault.is_none());
        let stats = h.stats();
        assert_eq!(stats.batches_completed, 5);
        assert_eq!(stats.batches_failed, 1);
        assert_eq!(stats.processed_records, 800);
        assert_eq!(stats.error_records, 200);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn abort_stops_dispatch_but_counts_in_flight() {
        let h = handle();
        let abort = Arc::new(AtomicBool::new(true));
        let out = dispatch_batches(
            chunker((0..1000).collect(), 100),
            executor(|_, _| Ok(())),
            &h,
            &abort,
            2,
        )
        .await;
        assert!(out.aborted);
        let stats = h.stats();
        // Abort was set before the first pull: nothing dispatched.
        assert_eq!(stats.batches_dispatched, 0);
        assert_eq!(stats.batches_completed, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn source_fault_surfaces_after_drain() {
        use crate::source::{PageFn, QuerySource};
        let mut pages = 0u32;
        let pager: PageFn<u32> = Box::new(move |_page, _max| {
            pages += 1;
            if pages <= 2 {
                Ok(Some(vec![0; 10]))
            } else {
                Err(crate::error::SourceError::Exhausted("store gone".into()))
            }
        });
        let cursor = RecordSource::open(Box::new(QuerySource::new(pager, 1000))).unwrap();
        let h = handle();
        let abort = Arc::new(AtomicBool::new(false));
        let out = dispatch_batches(
            Chunker::new(cursor, 10),
            executor(|_, _| Ok(())),
            &h,
            &abort,
            2,
        )
        .await;
        assert!(out.fault.is_some());
        // Batches dispatched before the fault still have their results folded.
        let stats = h.stats();
        assert_eq!(stats.batches_dispatched, stats.batches_completed);
    }
}
