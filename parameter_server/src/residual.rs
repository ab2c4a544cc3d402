use comms::WorkerRecord;

/// The absolute tolerance both residual norms must reach for the run to converge.
pub const CONVERGENCE_THRESHOLD: f64 = 0.0001;

/// The primal and dual residual norms of a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residuals {
    /// Disagreement between the workers and the consensus, `r`.
    pub primal: f64,
    /// Movement of the consensus between rounds scaled by the penalty, `s`.
    pub dual: f64,
}

impl Residuals {
    /// Computes both residual norms.
    ///
    /// * `r = sqrt(Σ_p Σ_i (x_p[i] - z[i])²)`
    /// * `s = rho · sqrt(P) · ‖z - z_prev‖`
    ///
    /// # Arguments
    /// * `records` - Every record of the round.
    /// * `z` - The new consensus vector.
    /// * `z_prev` - The consensus vector the workers solved against.
    /// * `rho` - The penalty parameter of the round.
    pub fn evaluate<'a, I>(records: I, z: &[f64], z_prev: &[f64], rho: f64) -> Self
    where
        I: IntoIterator<Item = &'a WorkerRecord>,
    {
        let mut workers = 0;
        let mut primal_sq = 0.0;

        for record in records {
            primal_sq += squared_distance(&record.x, z);
            workers += 1;
        }

        let movement = squared_distance(z, z_prev).sqrt();

        Self {
            primal: primal_sq.sqrt(),
            dual: rho * (workers as f64).sqrt() * movement,
        }
    }

    /// Whether both norms are within `CONVERGENCE_THRESHOLD`, the boundary included.
    pub fn converged(&self) -> bool {
        self.primal <= CONVERGENCE_THRESHOLD && self.dual <= CONVERGENCE_THRESHOLD
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| (a - b) * (a - b)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, x: Vec<f64>) -> WorkerRecord {
        let mut record = WorkerRecord::initial(id, x.len(), 1.0, 1.0, 0.0);
        record.x = x;
        record
    }

    #[test]
    fn test_primal_residual_is_stacked() {
        let records = [record("a", vec![2.0, 0.0]), record("b", vec![4.0, 0.0])];
        let residuals = Residuals::evaluate(&records, &[3.0, 0.0], &[3.0, 0.0], 1.0);

        assert_eq!(residuals.primal, 2.0_f64.sqrt());
        assert_eq!(residuals.dual, 0.0);
    }

    #[test]
    fn test_dual_residual_is_scaled() {
        let records = [
            record("a", vec![1.0]),
            record("b", vec![1.0]),
            record("c", vec![1.0]),
            record("d", vec![1.0]),
        ];
        let residuals = Residuals::evaluate(&records, &[1.0], &[0.5], 3.0);

        assert_eq!(residuals.primal, 0.0);
        assert_eq!(residuals.dual, 3.0);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let at = Residuals {
            primal: CONVERGENCE_THRESHOLD,
            dual: CONVERGENCE_THRESHOLD,
        };
        assert!(at.converged());

        let above = Residuals {
            primal: CONVERGENCE_THRESHOLD,
            dual: f64::from_bits(CONVERGENCE_THRESHOLD.to_bits() + 1),
        };
        assert!(!above.converged());

        let primal_above = Residuals {
            primal: 2.0 * CONVERGENCE_THRESHOLD,
            dual: 0.0,
        };
        assert!(!primal_above.converged());
    }
}
