//! Retry and backoff policy for batch execution.
//!
//! Encapsulates error classification and backoff decisions so the executor
//! applies one consistent policy. The default is a single attempt (no
//! automatic retry); opting in happens through the `[retry]` config section.

mod classify;
mod policy;

pub use classify::classify;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
