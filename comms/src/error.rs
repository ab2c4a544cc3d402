use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used across the codec.
pub type Result<T> = std::result::Result<T, CodecErr>;

/// Failures while turning records into text and back.
#[derive(Debug)]
pub enum CodecErr {
    Malformed {
        line: Option<usize>,
        source: serde_json::Error,
    },
    NonFinite {
        worker_id: String,
        field: &'static str,
        index: usize,
    },
    KeyMismatch {
        key: String,
        worker_id: String,
    },
}

impl CodecErr {
    /// Attaches the 1-based line number of a batch to a malformed error.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            CodecErr::Malformed { source, .. } => CodecErr::Malformed {
                line: Some(line),
                source,
            },
            other => other,
        }
    }
}

impl Display for CodecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecErr::Malformed {
                line: Some(line),
                source,
            } => write!(f, "malformed record at line {line}: {source}"),
            CodecErr::Malformed { line: None, source } => write!(f, "malformed record: {source}"),
            CodecErr::NonFinite {
                worker_id,
                field,
                index,
            } => write!(
                f,
                "worker {worker_id} has a non finite value in {field} at index {index}"
            ),
            CodecErr::KeyMismatch { key, worker_id } => write!(
                f,
                "bundle entry {key} holds the record of worker {worker_id}"
            ),
        }
    }
}

impl Error for CodecErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CodecErr::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CodecErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed {
            line: None,
            source: value,
        }
    }
}
