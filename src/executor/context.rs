//! Per-batch execution context: an independent resource budget.
//!
//! A fresh context is handed to the processor for every batch attempt and
//! discarded afterwards, so no resource usage carries across batches.

use crate::error::BatchError;

/// Tracks the operations a processor spends on one batch. Charging past the
/// budget fails the batch with `BatchError::BudgetExceeded`.
#[derive(Debug)]
pub struct BatchContext {
    ops_used: u64,
    ops_budget: u64,
}

impl BatchContext {
    pub(crate) fn new(ops_budget: u64) -> Self {
        Self {
            ops_used: 0,
            ops_budget,
        }
    }

    /// Spend `n` operations from this batch's budget.
    pub fn charge(&mut self, n: u64) -> Result<(), BatchError> {
        let used = self.ops_used.saturating_add(n);
        if used > self.ops_budget {
            return Err(BatchError::BudgetExceeded {
                used,
                budget: self.ops_budget,
            });
        }
        self.ops_used = used;
        Ok(())
    }

    pub fn ops_used(&self) -> u64 {
        self.ops_used
    }

    pub fn ops_remaining(&self) -> u64 {
        self.ops_budget.saturating_sub(self.ops_used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_until_budget_runs_out() {
        let mut ctx = BatchContext::new(10);
        assert!(ctx.charge(4).is_ok());
        assert!(ctx.charge(6).is_ok());
        assert_eq!(ctx.ops_remaining(), 0);
        let err = ctx.charge(1).unwrap_err();
        assert!(matches!(err, BatchError::BudgetExceeded { used: 11, budget: 10 }));
        // A refused charge does not consume budget.
        assert_eq!(ctx.ops_used(), 10);
    }
}
