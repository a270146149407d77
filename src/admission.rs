//! Per-tenant admission slots shared across all of a tenant's jobs.
//!
//! A job must hold a slot while Processing; with the ceiling saturated,
//! later jobs wait in Queued, FIFO, no priority. Slots are released when the
//! permit drops at the job's terminal state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Capacity token for one active job. Dropping it frees the slot.
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

/// Pool of admission slots, `ceiling` per tenant. Process-wide shared state:
/// one pool serves every job the engine runs.
pub struct AdmissionPool {
    ceiling: usize,
    tenants: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl AdmissionPool {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
            tenants: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, tenant: &str) -> Arc<Semaphore> {
        let mut tenants = self.tenants.lock().unwrap();
        Arc::clone(
            tenants
                .entry(tenant.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(self.ceiling))),
        )
    }

    /// Wait for a slot for this tenant. Waiters are served in FIFO order.
    pub async fn acquire(&self, tenant: &str) -> AdmissionSlot {
        let sem = self.semaphore(tenant);
        let permit = sem
            .acquire_owned()
            .await
            .expect("admission semaphore closed");
        AdmissionSlot { _permit: permit }
    }

    /// Future for a slot without awaiting it, so the caller can race it
    /// against an abort check.
    pub fn acquire_future(
        &self,
        tenant: &str,
    ) -> impl std::future::Future<Output = AdmissionSlot> + Send + 'static {
        let sem = self.semaphore(tenant);
        async move {
            let permit = sem
                .acquire_owned()
                .await
                .expect("admission semaphore closed");
            AdmissionSlot { _permit: permit }
        }
    }

    /// Free slots for a tenant right now (diagnostic; racy by nature).
    pub fn available(&self, tenant: &str) -> usize {
        self.semaphore(tenant).available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slots_free_on_drop() {
        let pool = AdmissionPool::new(2);
        assert_eq!(pool.available("t"), 2);
        let a = pool.acquire("t").await;
        let b = pool.acquire("t").await;
        assert_eq!(pool.available("t"), 0);
        drop(a);
        assert_eq!(pool.available("t"), 1);
        drop(b);
        assert_eq!(pool.available("t"), 2);
    }

    #[tokio::test]
    async fn tenants_do_not_share_slots() {
        let pool = AdmissionPool::new(1);
        let _a = pool.acquire("alpha").await;
        // A different tenant still gets in immediately.
        assert_eq!(pool.available("beta"), 1);
        let _b = pool.acquire("beta").await;
        assert_eq!(pool.available("alpha"), 0);
        assert_eq!(pool.available("beta"), 0);
    }

    #[tokio::test]
    async fn saturated_pool_blocks_until_release() {
        let pool = Arc::new(AdmissionPool::new(1));
        let held = pool.acquire("t").await;

        let p = Arc::clone(&pool);
        let waiter = tokio::spawn(async move { p.acquire("t").await });

        // Give the waiter time to park on the semaphore.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let _slot = waiter.await.unwrap();
    }
}
