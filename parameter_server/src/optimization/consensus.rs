use crate::{Penalty, Result, RoundErr};

/// The closed form consensus update of an L2 regularized objective split across workers.
#[derive(Debug, Clone, Copy)]
pub struct ConsensusUpdate {
    multiplier: f64,
    regularize_intercept: bool,
}

impl ConsensusUpdate {
    /// Creates a new `ConsensusUpdate`.
    ///
    /// The shrinkage multiplier is `m = P·rho / (2·lambda + P·rho)`.
    ///
    /// # Arguments
    /// * `penalty` - The round's penalty scalars.
    /// * `workers` - The amount of workers `P` that reported in the round.
    /// * `regularize_intercept` - Whether feature `0` is shrunk as well.
    ///
    /// # Returns
    /// The update or `RoundErr::DivideByZero` if the denominator vanishes.
    pub fn new(penalty: Penalty, workers: usize, regularize_intercept: bool) -> Result<Self> {
        let weight = workers as f64 * penalty.rho();
        let denominator = 2.0 * penalty.lambda() + weight;

        if denominator == 0.0 {
            return Err(RoundErr::DivideByZero {
                rho: penalty.rho(),
                lambda: penalty.lambda(),
            });
        }

        Ok(Self {
            multiplier: weight / denominator,
            regularize_intercept,
        })
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Computes the new consensus vector from the round averages.
    ///
    /// # Arguments
    /// * `x_avg` - The feature-wise average of the local parameters.
    /// * `u_avg` - The feature-wise average of the dual vectors.
    pub fn apply(&self, x_avg: &[f64], u_avg: &[f64]) -> Vec<f64> {
        x_avg
            .iter()
            .zip(u_avg)
            .enumerate()
            .map(|(i, (x, u))| {
                if i == 0 && !self.regularize_intercept {
                    x + u
                } else {
                    self.multiplier * (x + u)
                }
            })
            .collect()
    }
}
