mod bundle;
mod error;
mod record;

pub use bundle::{RoundBundle, decode_batch};
pub use error::{CodecErr, Result};
pub use record::{Timestamps, WorkerRecord, decode, encode, unix_nanos};
