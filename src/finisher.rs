//! Finisher hook: the one callback fired after a job reaches terminal state.

use anyhow::Result;

use crate::job::{JobId, JobStats};

/// Callback invoked exactly once per job with its final statistics — after
/// Completed, Failed, or Aborted, even when zero batches executed.
pub type Finisher = Box<dyn FnOnce(&JobStats) -> Result<()> + Send>;

/// Fire the hook if one was supplied. Hook errors are logged and dropped;
/// they never re-open the job.
pub(crate) fn fire(job_id: JobId, finisher: Option<Finisher>, stats: &JobStats) {
    let Some(hook) = finisher else {
        return;
    };
    if let Err(e) = hook(stats) {
        tracing::warn!(job_id, error = %e, "finisher hook failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn stats(job_id: JobId) -> JobStats {
        JobStats {
            job_id,
            state: JobState::Completed,
            total_records: 0,
            processed_records: 0,
            error_records: 0,
            batches_dispatched: 0,
            batches_completed: 0,
            batches_failed: 0,
            fault: None,
        }
    }

    #[test]
    fn fires_supplied_hook() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let hook: Finisher = Box::new(move |s| {
            assert_eq!(s.job_id, 9);
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        fire(9, Some(hook), &stats(9));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_error_is_swallowed() {
        let hook: Finisher = Box::new(|_s| anyhow::bail!("notify endpoint down"));
        // Must not panic or propagate.
        fire(3, Some(hook), &stats(3));
        fire(4, None, &stats(4));
    }
}
