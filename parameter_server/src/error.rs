use std::{
    error::Error,
    fmt::{self, Display},
};

use comms::CodecErr;

/// The result type used by the combine step.
pub type Result<T> = std::result::Result<T, RoundErr>;

/// Every reason a round can be aborted.
///
/// None of them are retried internally, the whole round must be re-run from the previous output.
#[derive(Debug)]
pub enum RoundErr {
    Parse {
        index: usize,
        source: CodecErr,
    },
    Encode(CodecErr),
    ShapeMismatch {
        worker_id: String,
        vector: &'static str,
        got: usize,
        expected: usize,
    },
    ConsensusMismatch {
        worker_id: String,
        feature: usize,
    },
    EmptyRound,
    DivideByZero {
        rho: f64,
        lambda: f64,
    },
    InvalidConfig(String),
    DuplicateWorker {
        worker_id: String,
    },
    WorkerCountMismatch {
        got: usize,
        expected: usize,
    },
}

impl Display for RoundErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundErr::Parse { index, source } => {
                write!(f, "failed to parse record number {index}: {source}")
            }
            RoundErr::Encode(e) => write!(f, "failed to encode the round output: {e}"),
            RoundErr::ShapeMismatch {
                worker_id,
                vector,
                got,
                expected,
            } => write!(
                f,
                "worker {worker_id} sent a {vector} vector of {got} features, expected {expected}"
            ),
            RoundErr::ConsensusMismatch { worker_id, feature } => write!(
                f,
                "worker {worker_id} solved against a different consensus at feature {feature}"
            ),
            RoundErr::EmptyRound => write!(f, "the round has no records"),
            RoundErr::DivideByZero { rho, lambda } => write!(
                f,
                "the consensus multiplier is undefined for rho = {rho} and lambda = {lambda}"
            ),
            RoundErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            RoundErr::DuplicateWorker { worker_id } => {
                write!(f, "worker {worker_id} reported more than once")
            }
            RoundErr::WorkerCountMismatch { got, expected } => {
                write!(f, "got records from {got} workers, expected {expected}")
            }
        }
    }
}

impl Error for RoundErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RoundErr::Parse { source, .. } => Some(source),
            RoundErr::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecErr> for RoundErr {
    fn from(value: CodecErr) -> Self {
        Self::Encode(value)
    }
}
