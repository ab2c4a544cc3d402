use comms::WorkerRecord;

use crate::{Result, RoundErr};

/// The ephemeral aggregate of every record in a round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundState {
    pub workers: usize,
    pub features: usize,
    pub x_avg: Vec<f64>,
    pub u_avg: Vec<f64>,
    /// The consensus vector the workers solved against.
    pub z_prev: Vec<f64>,
    /// The sum of the local objective values reported by the workers.
    pub primal_objective: f64,
}

/// Averages the local parameter and dual vectors of every worker feature-wise.
///
/// The feature count and the previous consensus vector are taken from the first record.
/// Every other record must carry exactly the same `z`.
///
/// # Arguments
/// * `records` - Every record of the round, each worker exactly once.
///
/// # Returns
/// The round state, `RoundErr::EmptyRound` if there are no records or
/// `RoundErr::ShapeMismatch` naming the first worker whose vectors disagree in length or
/// `RoundErr::ConsensusMismatch` naming the first worker and feature whose `z` differs.
pub fn aggregate<'a, I>(records: I) -> Result<RoundState>
where
    I: IntoIterator<Item = &'a WorkerRecord>,
{
    let mut records = records.into_iter();
    let first = records.next().ok_or(RoundErr::EmptyRound)?;
    let features = first.x.len();

    let mut x_sum = vec![0.0; features];
    let mut u_sum = vec![0.0; features];
    let mut primal_objective = 0.0;
    let mut workers = 0;

    for record in std::iter::once(first).chain(records) {
        check_shape(record, features)?;
        check_consensus(record, &first.z)?;

        for (acc, x) in x_sum.iter_mut().zip(&record.x) {
            *acc += x;
        }
        for (acc, u) in u_sum.iter_mut().zip(&record.u) {
            *acc += u;
        }

        primal_objective += record.primal_objective;
        workers += 1;
    }

    let n = workers as f64;
    let x_avg = x_sum.into_iter().map(|s| s / n).collect();
    let u_avg = u_sum.into_iter().map(|s| s / n).collect();

    Ok(RoundState {
        workers,
        features,
        x_avg,
        u_avg,
        z_prev: first.z.clone(),
        primal_objective,
    })
}

fn check_shape(record: &WorkerRecord, expected: usize) -> Result<()> {
    let vectors = [("x", &record.x), ("u", &record.u), ("z", &record.z)];

    match vectors.into_iter().find(|(_, v)| v.len() != expected) {
        Some((vector, v)) => Err(RoundErr::ShapeMismatch {
            worker_id: record.worker_id.clone(),
            vector,
            got: v.len(),
            expected,
        }),
        None => Ok(()),
    }
}

fn check_consensus(record: &WorkerRecord, z_prev: &[f64]) -> Result<()> {
    match record.z.iter().zip(z_prev).position(|(z, prev)| z != prev) {
        Some(feature) => Err(RoundErr::ConsensusMismatch {
            worker_id: record.worker_id.clone(),
            feature,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, x: Vec<f64>, u: Vec<f64>, objective: f64) -> WorkerRecord {
        let mut record = WorkerRecord::initial(id, x.len(), 1.0, 1.0, 0.0);
        record.x = x;
        record.u = u;
        record.primal_objective = objective;
        record
    }

    #[test]
    fn test_averages_per_feature() {
        let records = [
            record("a", vec![2.0, 1.0], vec![0.0, 1.0], 1.5),
            record("b", vec![4.0, 3.0], vec![1.0, -1.0], 2.5),
        ];

        let state = aggregate(&records).unwrap();
        assert_eq!(state.workers, 2);
        assert_eq!(state.features, 2);
        assert_eq!(state.x_avg, [3.0, 2.0]);
        assert_eq!(state.u_avg, [0.5, 0.0]);
        assert_eq!(state.z_prev, [0.0, 0.0]);
        assert_eq!(state.primal_objective, 4.0);
    }

    #[test]
    fn test_empty_round() {
        let records: [WorkerRecord; 0] = [];
        assert!(matches!(aggregate(&records), Err(RoundErr::EmptyRound)));
    }

    #[test]
    fn test_shape_mismatch_names_the_worker() {
        let records = [
            record("a", vec![2.0, 1.0], vec![0.0, 1.0], 0.0),
            record("b", vec![4.0], vec![1.0], 0.0),
        ];

        match aggregate(&records).unwrap_err() {
            RoundErr::ShapeMismatch {
                worker_id,
                vector,
                got,
                expected,
            } => {
                assert_eq!(worker_id, "b");
                assert_eq!(vector, "x");
                assert_eq!(got, 1);
                assert_eq!(expected, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_shape_mismatch_inside_a_record() {
        let mut bad = record("a", vec![2.0, 1.0], vec![0.0, 1.0], 0.0);
        bad.z = vec![0.0];

        match aggregate([&bad]).unwrap_err() {
            RoundErr::ShapeMismatch { vector, .. } => assert_eq!(vector, "z"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_disagreeing_consensus_names_worker_and_feature() {
        let mut records = [
            record("a", vec![2.0, 1.0], vec![0.0, 1.0], 0.0),
            record("b", vec![4.0, 3.0], vec![1.0, -1.0], 0.0),
            record("c", vec![1.0, 0.0], vec![0.0, 0.0], 0.0),
        ];
        for r in &mut records {
            r.z = vec![1.5, 2.0];
        }
        records[2].z[1] = 2.5;

        match aggregate(&records).unwrap_err() {
            RoundErr::ConsensusMismatch { worker_id, feature } => {
                assert_eq!(worker_id, "c");
                assert_eq!(feature, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
