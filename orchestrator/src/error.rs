use std::fmt;

use comms::CodecErr;
use parameter_server::RoundErr;

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before any round runs.
    InvalidConfig(String),
    /// A local solver failed to produce its record.
    WorkerError { worker_id: String, msg: String },
    /// The combine step aborted the round.
    Round(RoundErr),
    /// A record couldn't be exchanged as text.
    Codec(CodecErr),
    /// An underlying I/O error not covered by the above variants.
    Io(std::io::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::WorkerError { worker_id, msg } => {
                write!(f, "worker {worker_id} error: {msg}")
            }
            Self::Round(e) => write!(f, "round failed: {e}"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Round(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RoundErr> for OrchestratorError {
    fn from(e: RoundErr) -> Self {
        Self::Round(e)
    }
}

impl From<CodecErr> for OrchestratorError {
    fn from(e: CodecErr) -> Self {
        Self::Codec(e)
    }
}

impl From<std::io::Error> for OrchestratorError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
