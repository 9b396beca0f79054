//! Cooperative cancellation through a caller-owned step budget

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{OomdpError, Result};

/// Monotonically decreasing allowance of work units
///
/// Clones share the same counter, so a caller can hand a budget to
/// several components and observe what is left. Components charge before
/// mutating anything; an exhausted budget fails with `Cancelled` and the
/// charged call has no effect.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    remaining: Option<Arc<AtomicU64>>,
}

impl Budget {
    /// A budget that never runs out
    #[must_use]
    pub fn unlimited() -> Self {
        Self { remaining: None }
    }

    /// A budget of `units`
    #[must_use]
    pub fn new(units: u64) -> Self {
        Self {
            remaining: Some(Arc::new(AtomicU64::new(units))),
        }
    }

    /// Consume `units`, or fail with `Cancelled` if fewer are left
    pub fn charge(&self, units: u64) -> Result<()> {
        let Some(remaining) = &self.remaining else {
            return Ok(());
        };
        match remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| r.checked_sub(units)) {
            Ok(_) => Ok(()),
            Err(_) => {
                remaining.store(0, Ordering::SeqCst);
                tracing::debug!(units, "budget exhausted");
                Err(OomdpError::Cancelled)
            }
        }
    }

    /// Units left, `None` when unlimited
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        self.remaining.as_ref().map(|r| r.load(Ordering::SeqCst))
    }

    /// Whether no work can be charged any more
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }
}
