//! Cancellation: shared registry of per-job abort tokens.
//!
//! The coordinator registers a token when a job is submitted and checks it
//! at every suspension point (waiting for admission, before each dispatch).
//! `cancel` sets the token; dispatch stops promptly, in-flight batches run
//! to completion, and nothing already committed is undone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::job::JobId;

/// Shared registry of job id -> abort token.
#[derive(Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<JobId, Arc<AtomicBool>>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job; returns the abort token the driver watches.
    pub fn register(&self, job_id: JobId) -> Arc<AtomicBool> {
        let token = Arc::new(AtomicBool::new(false));
        self.jobs.write().unwrap().insert(job_id, Arc::clone(&token));
        token
    }

    /// Unregister a job (call at terminal state, whatever the outcome).
    pub fn unregister(&self, job_id: JobId) {
        self.jobs.write().unwrap().remove(&job_id);
    }

    /// Request abort. Returns false if the job is no longer registered
    /// (already terminal).
    pub fn request_abort(&self, job_id: JobId) -> bool {
        if let Some(token) = self.jobs.read().unwrap().get(&job_id) {
            token.store(true, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_sets_registered_token() {
        let control = JobControl::new();
        let token = control.register(7);
        assert!(!token.load(Ordering::Relaxed));
        assert!(control.request_abort(7));
        assert!(token.load(Ordering::Relaxed));
    }

    #[test]
    fn abort_after_unregister_is_a_noop() {
        let control = JobControl::new();
        let token = control.register(7);
        control.unregister(7);
        assert!(!control.request_abort(7));
        assert!(!token.load(Ordering::Relaxed));
    }
}
