use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{CodecErr, Result};

/// Observability timestamps carried along with a record.
///
/// Every value is in nanoseconds since the UNIX epoch, `0` meaning it was never recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timestamps {
    pub map_start: u64,
    pub optimization_start: u64,
    pub map_end: u64,
    pub reduce_start: u64,
    pub first_reduce_completed: u64,
    pub last_reduce_completed: u64,
}

/// The state of a single worker exchanged between rounds.
///
/// The local solver emits one of these per round, the combine step answers with
/// another one under the same `worker_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerRecord {
    pub worker_id: String,
    /// The worker's local parameters.
    pub x: Vec<f64>,
    /// The worker's scaled dual vector.
    pub u: Vec<f64>,
    /// The consensus vector this record was solved against.
    pub z: Vec<f64>,
    pub rho: f64,
    pub rho_multiplier: f64,
    pub lambda: f64,
    pub primal_objective: f64,
    pub r_norm: f64,
    pub s_norm: f64,
    pub timestamps: Timestamps,
}

impl WorkerRecord {
    /// Creates the record a worker starts the very first round with.
    ///
    /// # Arguments
    /// * `worker_id` - The stable identifier of the worker.
    /// * `features` - The length of every parameter vector.
    /// * `rho` - The initial penalty parameter.
    /// * `rho_multiplier` - The penalty annealing factor.
    /// * `lambda` - The regularization strength.
    ///
    /// # Returns
    /// A record with zeroed `x`, `u` and `z` vectors.
    pub fn initial(
        worker_id: impl Into<String>,
        features: usize,
        rho: f64,
        rho_multiplier: f64,
        lambda: f64,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            x: vec![0.0; features],
            u: vec![0.0; features],
            z: vec![0.0; features],
            rho,
            rho_multiplier,
            lambda,
            primal_objective: 0.0,
            r_norm: 0.0,
            s_norm: 0.0,
            timestamps: Timestamps::default(),
        }
    }

    /// Checks every float of the record can be written as text.
    pub(crate) fn check_finite(&self) -> Result<()> {
        let scalars = [
            ("rho", self.rho),
            ("rho_multiplier", self.rho_multiplier),
            ("lambda", self.lambda),
            ("primal_objective", self.primal_objective),
            ("r_norm", self.r_norm),
            ("s_norm", self.s_norm),
        ];

        let vectors = [("x", &self.x), ("u", &self.u), ("z", &self.z)]
            .into_iter()
            .flat_map(|(field, v)| v.iter().enumerate().map(move |(i, n)| (field, i, *n)));

        scalars
            .into_iter()
            .map(|(field, n)| (field, 0, n))
            .chain(vectors)
            .find(|(_, _, n)| !n.is_finite())
            .map_or(Ok(()), |(field, index, _)| {
                Err(CodecErr::NonFinite {
                    worker_id: self.worker_id.clone(),
                    field,
                    index,
                })
            })
    }
}

/// Parses a single text encoded record.
///
/// # Arguments
/// * `raw` - The compact JSON form of a record.
///
/// # Returns
/// The record or a `CodecErr::Malformed` if a field is missing, unknown or ill typed.
pub fn decode(raw: &str) -> Result<WorkerRecord> {
    Ok(serde_json::from_str(raw)?)
}

/// Writes a record as compact JSON.
///
/// # Arguments
/// * `record` - The record to encode.
///
/// # Returns
/// The text form, or `CodecErr::NonFinite` if a value can't be represented.
pub fn encode(record: &WorkerRecord) -> Result<String> {
    record.check_finite()?;
    Ok(serde_json::to_string(record)?)
}

/// Returns the current wall clock time in nanoseconds since the UNIX epoch.
pub fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
