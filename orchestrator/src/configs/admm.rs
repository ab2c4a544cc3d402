use std::{fs, num::NonZeroUsize, path::Path};

use parameter_server::{Penalty, RoundConfig};
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

const fn default_rho_multiplier() -> f64 {
    1.0
}

const fn default_max_rounds() -> usize {
    100
}

/// The user facing configuration of an ADMM run, read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdmmConfig {
    /// The amount of distinct workers reporting every round.
    pub workers: usize,
    pub rho: f64,
    #[serde(default)]
    pub lambda: f64,
    #[serde(default = "default_rho_multiplier")]
    pub rho_multiplier: f64,
    #[serde(default)]
    pub regularize_intercept: bool,
    /// The round budget of the in-process driver.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl AdmmConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    /// `OrchestratorError::Io` if the file can't be read, `OrchestratorError::InvalidConfig`
    /// if it can't be parsed and whatever `validate` rejects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OrchestratorError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let config = Self::from_json(&content).map_err(|e| match e {
            OrchestratorError::InvalidConfig(msg) => {
                OrchestratorError::InvalidConfig(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;

        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self, OrchestratorError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| OrchestratorError::InvalidConfig(format!("invalid JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration before any round executes.
    ///
    /// # Errors
    /// `OrchestratorError::InvalidConfig` for zero workers or rounds and
    /// `OrchestratorError::Round` for rejected penalty values, `rho = lambda = 0` included.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.workers == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }

        if self.max_rounds == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "max_rounds must be at least 1".into(),
            ));
        }

        self.penalty()?;
        Ok(())
    }

    /// Returns the validated penalty scalars.
    pub fn penalty(&self) -> Result<Penalty, OrchestratorError> {
        Ok(Penalty::new(self.rho, self.lambda, self.rho_multiplier)?)
    }

    /// Builds the configuration of round number `iteration`.
    ///
    /// The penalty is annealed once per previous round, so round `n` runs with
    /// `rho · rho_multiplier^n`, the same value its incoming records carry.
    pub fn round_config(&self, iteration: usize) -> Result<RoundConfig, OrchestratorError> {
        let workers = NonZeroUsize::new(self.workers).ok_or_else(|| {
            OrchestratorError::InvalidConfig("workers must be at least 1".into())
        })?;

        let mut penalty = self.penalty()?;
        for _ in 0..iteration {
            penalty = penalty.annealed()?;
        }

        Ok(RoundConfig::new(
            iteration,
            self.regularize_intercept,
            workers,
            penalty,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use parameter_server::RoundErr;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdmmConfig::from_json(r#"{"workers": 2, "rho": 1.0}"#).unwrap();

        assert_eq!(config.lambda, 0.0);
        assert_eq!(config.rho_multiplier, 1.0);
        assert!(!config.regularize_intercept);
        assert_eq!(config.max_rounds, 100);
    }

    #[test]
    fn test_degenerate_penalty_is_rejected_up_front() {
        let err = AdmmConfig::from_json(r#"{"workers": 2, "rho": 0.0, "lambda": 0.0}"#)
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Round(RoundErr::DivideByZero { .. })
        ));
    }

    #[test]
    fn test_zero_workers_is_rejected() {
        let err = AdmmConfig::from_json(r#"{"workers": 0, "rho": 1.0}"#).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = AdmmConfig::from_json(r#"{"workers": 1, "rho": 1.0, "bogus": 3}"#).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidConfig(_)));
    }

    #[test]
    fn test_round_config() {
        let config = AdmmConfig::from_json(
            r#"{"workers": 3, "rho": 2.0, "lambda": 0.5, "regularize_intercept": true}"#,
        )
        .unwrap();

        let round = config.round_config(7).unwrap();
        assert_eq!(round.iteration(), 7);
        assert_eq!(round.workers(), 3);
        assert!(round.regularize_intercept());
        assert_eq!(round.penalty().rho(), 2.0);
        assert_eq!(round.penalty().lambda(), 0.5);
    }

    #[test]
    fn test_round_config_anneals_per_iteration() {
        let config = AdmmConfig::from_json(
            r#"{"workers": 2, "rho": 1.0, "lambda": 1.0, "rho_multiplier": 2.0}"#,
        )
        .unwrap();

        assert_eq!(config.round_config(0).unwrap().penalty().rho(), 1.0);
        assert_eq!(config.round_config(3).unwrap().penalty().rho(), 8.0);

        let chained = config
            .round_config(0)
            .unwrap()
            .next(config.round_config(1).unwrap().penalty());
        assert_eq!(chained, config.round_config(1).unwrap());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"workers": 4, "rho": 1.5, "max_rounds": 10}}"#).unwrap();

        let config = AdmmConfig::load(file.path()).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_rounds, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AdmmConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, OrchestratorError::Io(_)));
    }
}
