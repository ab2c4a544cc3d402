mod aggregation;
mod config;
mod coordinator;
mod error;
mod optimization;
mod residual;

pub use aggregation::{RoundState, aggregate};
pub use config::{Penalty, RoundConfig};
pub use coordinator::{
    Clock, IterationCounter, RoundDiagnostics, RoundOutcome, RoundSummary, SystemClock, combine,
    combine_encoded, combine_with_clock,
};
pub use error::{Result, RoundErr};
pub use optimization::{ConsensusUpdate, dual_update};
pub use residual::{CONVERGENCE_THRESHOLD, Residuals};
