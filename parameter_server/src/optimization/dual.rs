use comms::WorkerRecord;

use crate::{Result, RoundErr};

/// Computes the next dual vector of a single worker.
///
/// `u'[i] = (u[i] + x[i] - z[i]) / rho_multiplier`, only the given worker's vectors are read.
///
/// # Arguments
/// * `record` - The worker's record for the round.
/// * `z` - The freshly computed consensus vector.
/// * `rho_multiplier` - The penalty annealing factor.
///
/// # Returns
/// The new dual vector or `RoundErr::ShapeMismatch` if the worker's vectors don't match `z`.
pub fn dual_update(record: &WorkerRecord, z: &[f64], rho_multiplier: f64) -> Result<Vec<f64>> {
    for (vector, len) in [("x", record.x.len()), ("u", record.u.len())] {
        if len != z.len() {
            return Err(RoundErr::ShapeMismatch {
                worker_id: record.worker_id.clone(),
                vector,
                got: len,
                expected: z.len(),
            });
        }
    }

    let step = 1.0 / rho_multiplier;

    Ok(record
        .u
        .iter()
        .zip(&record.x)
        .zip(z)
        .map(|((u, x), z)| step * (u + x - z))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, x: Vec<f64>, u: Vec<f64>) -> WorkerRecord {
        let mut record = WorkerRecord::initial(id, x.len(), 1.0, 1.0, 0.0);
        record.x = x;
        record.u = u;
        record
    }

    #[test]
    fn test_dual_step() {
        let a = record("a", vec![2.0], vec![0.0]);
        let b = record("b", vec![4.0], vec![0.0]);

        assert_eq!(dual_update(&a, &[3.0], 1.0).unwrap(), [-1.0]);
        assert_eq!(dual_update(&b, &[3.0], 1.0).unwrap(), [1.0]);
    }

    #[test]
    fn test_multiplier_scales_the_step() {
        let a = record("a", vec![2.0, 1.0], vec![1.0, 0.0]);
        assert_eq!(dual_update(&a, &[1.0, 2.0], 2.0).unwrap(), [1.0, -0.5]);
    }

    #[test]
    fn test_workers_are_isolated() {
        let z = [1.5, -0.5];
        let a = record("a", vec![2.0, 1.0], vec![0.25, 0.0]);
        let before = dual_update(&a, &z, 1.0).unwrap();

        for b in [
            record("b", vec![9.0, 9.0], vec![0.0, 0.0]),
            record("b", vec![-3.0, 0.5], vec![7.0, -7.0]),
        ] {
            let _ = dual_update(&b, &z, 1.0).unwrap();
            assert_eq!(dual_update(&a, &z, 1.0).unwrap(), before);
        }
    }

    #[test]
    fn test_length_mismatch() {
        let a = record("a", vec![2.0, 1.0], vec![0.0, 0.0]);
        let err = dual_update(&a, &[1.0], 1.0).unwrap_err();
        assert!(matches!(err, RoundErr::ShapeMismatch { vector: "x", .. }));
    }
}
