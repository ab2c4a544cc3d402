use std::{collections::BTreeMap, io, sync::Arc};

use comms::{RoundBundle, WorkerRecord};
use log::{debug, info, warn};
use parameter_server::{IterationCounter, RoundConfig, RoundSummary};
use tokio::task::JoinSet;

use crate::{AdmmConfig, LocalSolver, OrchestratorError};

/// What an ADMM run ended with.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// The amount of rounds that were combined.
    pub rounds: usize,
    pub converged: bool,
    /// The last consensus vector.
    pub consensus: Vec<f64>,
    /// The value of the not-converged counter when the run stopped.
    pub not_converged: u64,
    pub last_round: RoundSummary,
    /// The contexts the workers would start another round with.
    pub contexts: RoundBundle,
}

/// An in-process ADMM run, standing in for the batch substrate.
///
/// Every round runs one local solver per worker concurrently, waits for all of them,
/// exchanges their records as text and invokes the combine step exactly once.
pub struct Session<S> {
    config: AdmmConfig,
    features: usize,
    solvers: BTreeMap<String, Arc<S>>,
    counter: Arc<IterationCounter>,
}

impl<S: LocalSolver> Session<S> {
    /// Creates a new `Session`.
    ///
    /// # Arguments
    /// * `config` - The run configuration.
    /// * `solvers` - One local solver per worker id.
    ///
    /// # Returns
    /// A new session or `OrchestratorError::InvalidConfig` if the solvers don't match the
    /// configured worker count or disagree on the amount of features.
    pub fn new(config: AdmmConfig, solvers: BTreeMap<String, S>) -> Result<Self, OrchestratorError> {
        config.validate()?;

        if solvers.len() != config.workers {
            return Err(OrchestratorError::InvalidConfig(format!(
                "got {} solvers for {} workers",
                solvers.len(),
                config.workers
            )));
        }

        let mut features = solvers.values().map(|s| s.features());
        let expected = features.next().unwrap_or_default();

        if expected == 0 || features.any(|f| f != expected) {
            return Err(OrchestratorError::InvalidConfig(
                "every solver must work on the same non zero amount of features".into(),
            ));
        }

        let solvers = solvers
            .into_iter()
            .map(|(id, solver)| (id, Arc::new(solver)))
            .collect();

        Ok(Self {
            config,
            features: expected,
            solvers,
            counter: Arc::new(IterationCounter::new()),
        })
    }

    /// Returns the shared not-converged counter, it can be observed while the session runs.
    pub fn counter(&self) -> Arc<IterationCounter> {
        Arc::clone(&self.counter)
    }

    /// Runs rounds until one doesn't bump the counter or the round budget is exhausted.
    ///
    /// # Errors
    /// The first error raised by a solver, the codec or the combine step.
    pub async fn run(self) -> Result<TrainingReport, OrchestratorError> {
        let penalty = self.config.penalty()?;
        let mut round = self.config.round_config(0)?;

        let mut contexts: RoundBundle = self
            .solvers
            .keys()
            .map(|id| {
                WorkerRecord::initial(
                    id.as_str(),
                    self.features,
                    penalty.rho(),
                    penalty.rho_multiplier(),
                    penalty.lambda(),
                )
            })
            .collect();

        let mut rounds = 0;
        let mut converged = false;
        let mut last_round = None;

        while rounds < self.config.max_rounds {
            let raw = self.solve_round(&contexts).await?;
            let (encoded, summary) = parameter_server::combine_encoded(&raw, &round)?;
            contexts = RoundBundle::decode(&encoded)?;
            rounds += 1;

            let bumped = self.counter.record(&summary);
            last_round = Some(summary);

            if !bumped {
                converged = true;
                break;
            }

            round = next_round(&round, &summary);
        }

        let Some(last_round) = last_round else {
            return Err(OrchestratorError::InvalidConfig(
                "max_rounds must be at least 1".into(),
            ));
        };

        if converged {
            info!(rounds = rounds; "converged");
        } else {
            warn!(rounds = rounds; "round budget exhausted before converging");
        }

        let consensus = contexts
            .iter()
            .next()
            .map(|r| r.z.clone())
            .unwrap_or_default();

        Ok(TrainingReport {
            rounds,
            converged,
            consensus,
            not_converged: self.counter.get(),
            last_round,
            contexts,
        })
    }

    /// Runs every local solver against its own context and waits for all of them.
    ///
    /// # Returns
    /// One encoded record per worker, in completion order.
    async fn solve_round(&self, contexts: &RoundBundle) -> Result<Vec<String>, OrchestratorError> {
        let mut join_set = JoinSet::new();

        for (id, solver) in &self.solvers {
            let context = contexts.get(id).cloned().ok_or_else(|| {
                OrchestratorError::WorkerError {
                    worker_id: id.clone(),
                    msg: "missing context from the previous round".into(),
                }
            })?;

            let solver = Arc::clone(solver);
            join_set.spawn_blocking(move || solve_one(solver.as_ref(), &context));
        }

        let mut raw = Vec::with_capacity(self.solvers.len());
        while let Some(res) = join_set.join_next().await {
            raw.push(res.map_err(io::Error::from)??);
        }

        debug!(records = raw.len(); "every worker reported");
        Ok(raw)
    }
}

fn solve_one<S: LocalSolver>(
    solver: &S,
    context: &WorkerRecord,
) -> Result<String, OrchestratorError> {
    let worker_id = context.worker_id.clone();
    let record = solver
        .solve(context)
        .map_err(|e| OrchestratorError::WorkerError {
            worker_id: worker_id.clone(),
            msg: e.to_string(),
        })?;

    if record.worker_id != worker_id {
        return Err(OrchestratorError::WorkerError {
            msg: format!("solver answered as {}", record.worker_id),
            worker_id,
        });
    }

    Ok(comms::encode(&record)?)
}

fn next_round(round: &RoundConfig, summary: &RoundSummary) -> RoundConfig {
    round.next(summary.next_penalty)
}
