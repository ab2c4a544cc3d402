mod clock;
mod counter;
mod round;

pub use clock::{Clock, RoundDiagnostics, SystemClock};
pub use counter::IterationCounter;
pub use round::{RoundOutcome, RoundSummary, combine, combine_encoded, combine_with_clock};
