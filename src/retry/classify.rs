//! Map batch failures into retry error kinds.

use super::policy::ErrorKind;
use crate::error::BatchError;

/// Classify a batch failure for the retry policy.
pub fn classify(err: &BatchError) -> ErrorKind {
    match err {
        BatchError::Transient(_) => ErrorKind::Transient,
        BatchError::BudgetExceeded { .. } => ErrorKind::Budget,
        BatchError::Records(_) => ErrorKind::Rejected,
        BatchError::Other(_) => ErrorKind::Other,
    }
}
