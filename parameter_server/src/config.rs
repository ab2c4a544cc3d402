use std::num::NonZeroUsize;

use crate::{Result, RoundErr};

/// The round-global penalty and regularization scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty {
    rho: f64,
    lambda: f64,
    rho_multiplier: f64,
}

impl Penalty {
    /// Creates a new validated `Penalty`.
    ///
    /// # Arguments
    /// * `rho` - The coupling strength between local and consensus variables.
    /// * `lambda` - The L2 regularization strength.
    /// * `rho_multiplier` - The per round annealing factor applied to `rho`.
    ///
    /// # Returns
    /// The penalty, `RoundErr::DivideByZero` if both `rho` and `lambda` are zero or
    /// `RoundErr::InvalidConfig` for negative, non finite or non positive multiplier values.
    pub fn new(rho: f64, lambda: f64, rho_multiplier: f64) -> Result<Self> {
        let values = [("rho", rho), ("lambda", lambda), ("rho_multiplier", rho_multiplier)];

        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RoundErr::InvalidConfig(format!(
                "{name} must be finite, got {value}"
            )));
        }

        if rho < 0.0 || lambda < 0.0 {
            return Err(RoundErr::InvalidConfig(format!(
                "rho and lambda must not be negative, got rho = {rho} and lambda = {lambda}"
            )));
        }

        if rho_multiplier <= 0.0 {
            return Err(RoundErr::InvalidConfig(format!(
                "rho_multiplier must be positive, got {rho_multiplier}"
            )));
        }

        if rho == 0.0 && lambda == 0.0 {
            return Err(RoundErr::DivideByZero { rho, lambda });
        }

        Ok(Self {
            rho,
            lambda,
            rho_multiplier,
        })
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn rho_multiplier(&self) -> f64 {
        self.rho_multiplier
    }

    /// Returns the penalty to use in the following round, `rho` scaled by the multiplier.
    pub fn annealed(&self) -> Result<Self> {
        Self::new(self.rho * self.rho_multiplier, self.lambda, self.rho_multiplier)
    }
}

/// Everything the combine step reads from the configuration for a single round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundConfig {
    iteration: usize,
    regularize_intercept: bool,
    workers: NonZeroUsize,
    penalty: Penalty,
}

impl RoundConfig {
    /// Creates a new round configuration.
    ///
    /// # Arguments
    /// * `iteration` - The number of the round, used for observability.
    /// * `regularize_intercept` - Whether feature `0` gets shrunk like the rest.
    /// * `workers` - The amount of distinct workers expected to report.
    /// * `penalty` - The already validated penalty scalars.
    pub fn new(
        iteration: usize,
        regularize_intercept: bool,
        workers: NonZeroUsize,
        penalty: Penalty,
    ) -> Self {
        Self {
            iteration,
            regularize_intercept,
            workers,
            penalty,
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn regularize_intercept(&self) -> bool {
        self.regularize_intercept
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    /// Returns the configuration of the following round using `penalty`.
    pub fn next(&self, penalty: Penalty) -> Self {
        Self {
            iteration: self.iteration + 1,
            penalty,
            ..*self
        }
    }
}
