/// A source of observability timestamps, in nanoseconds.
///
/// Timestamps never take part in any computation of the round.
pub trait Clock {
    fn now(&mut self) -> u64;
}

/// Reads the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> u64 {
        comms::unix_nanos()
    }
}

impl<F: FnMut() -> u64> Clock for F {
    fn now(&mut self) -> u64 {
        self()
    }
}

/// The instrumentation of a single round, returned alongside its result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundDiagnostics {
    pub round_start: u64,
    pub first_worker_done: u64,
    pub last_worker_done: u64,
}
