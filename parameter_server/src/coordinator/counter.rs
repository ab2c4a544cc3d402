use std::sync::atomic::{AtomicU64, Ordering};

use super::RoundSummary;

/// Counts the rounds that finished without converging.
///
/// The counter only ever grows, the caller reads it to decide whether to schedule another round.
#[derive(Debug, Default)]
pub struct IterationCounter {
    not_converged: AtomicU64,
}

impl IterationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps the counter once if `summary` belongs to a round that did not converge.
    ///
    /// # Returns
    /// Whether the counter was incremented.
    pub fn record(&self, summary: &RoundSummary) -> bool {
        if summary.converged {
            return false;
        }

        self.not_converged.fetch_add(1, Ordering::AcqRel);
        true
    }

    pub fn get(&self) -> u64 {
        self.not_converged.load(Ordering::Acquire)
    }
}
