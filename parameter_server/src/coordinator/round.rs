use std::collections::{BTreeMap, btree_map::Entry};

use comms::{RoundBundle, Timestamps, WorkerRecord};
use log::{debug, info, warn};

use super::{Clock, RoundDiagnostics, SystemClock};
use crate::{
    ConsensusUpdate, Penalty, Residuals, Result, RoundConfig, RoundErr, aggregate, dual_update,
};

#[derive(Debug, Clone, Copy)]
enum Phase {
    AwaitingRecords,
    Aggregating,
    Updating,
    Emitting,
    Done,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::AwaitingRecords => "awaiting_records",
            Phase::Aggregating => "aggregating",
            Phase::Updating => "updating",
            Phase::Emitting => "emitting",
            Phase::Done => "done",
        }
    }

    fn enter(self, iteration: usize) {
        debug!(iteration = iteration, phase = self.as_str(); "round phase");
    }
}

/// What the caller learns about a round besides the worker records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundSummary {
    pub iteration: usize,
    pub workers: usize,
    pub features: usize,
    /// The sum of the local objectives reported by the workers.
    pub primal_objective: f64,
    pub residuals: Residuals,
    pub converged: bool,
    /// The penalty the following round must be configured with.
    pub next_penalty: Penalty,
    pub diagnostics: RoundDiagnostics,
}

/// The complete output of a round.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// One record per reporting worker, for the local solvers of the next round.
    pub bundle: RoundBundle,
    pub summary: RoundSummary,
}

impl RoundOutcome {
    /// Returns the new consensus vector, shared by every record of the bundle.
    pub fn consensus(&self) -> &[f64] {
        self.bundle
            .iter()
            .next()
            .map(|r| r.z.as_slice())
            .unwrap_or_default()
    }
}

/// Runs the combine step of a round timing it with the wall clock.
///
/// See `combine_with_clock`.
pub fn combine(records: Vec<WorkerRecord>, config: &RoundConfig) -> Result<RoundOutcome> {
    combine_with_clock(records, config, &mut SystemClock)
}

/// Runs the combine step of a round over text encoded records.
///
/// # Arguments
/// * `raw` - Every encoded record of the round.
/// * `config` - The round configuration.
///
/// # Returns
/// The encoded bundle and the round summary, or `RoundErr::Parse` naming the index of the
/// first record that couldn't be decoded.
pub fn combine_encoded<I, S>(raw: I, config: &RoundConfig) -> Result<(String, RoundSummary)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let records = raw
        .into_iter()
        .enumerate()
        .map(|(index, s)| {
            comms::decode(s.as_ref()).map_err(|source| RoundErr::Parse { index, source })
        })
        .collect::<Result<Vec<_>>>()?;

    let outcome = combine(records, config)?;
    let encoded = outcome.bundle.encode()?;
    Ok((encoded, outcome.summary))
}

/// Runs the combine step of a round.
///
/// Averages every worker's vectors, computes the new consensus vector, every worker's new
/// dual vector and both residual norms, and packs one record per worker id.
/// Nothing is emitted unless every step succeeds.
///
/// # Arguments
/// * `records` - The complete set of records of the round, in any order.
/// * `config` - The round configuration.
/// * `clock` - The source of the diagnostic timestamps.
///
/// # Returns
/// The round's outcome or the `RoundErr` that aborted it.
pub fn combine_with_clock<C: Clock>(
    records: Vec<WorkerRecord>,
    config: &RoundConfig,
    clock: &mut C,
) -> Result<RoundOutcome> {
    let iteration = config.iteration();
    let penalty = config.penalty();

    let mut diagnostics = RoundDiagnostics {
        round_start: clock.now(),
        ..Default::default()
    };

    Phase::AwaitingRecords.enter(iteration);
    let keyed = key_by_worker(records, config)?;

    Phase::Aggregating.enter(iteration);
    let state = aggregate(keyed.values())?;

    Phase::Updating.enter(iteration);
    let update = ConsensusUpdate::new(penalty, state.workers, config.regularize_intercept())?;
    let z = update.apply(&state.x_avg, &state.u_avg);
    let residuals = Residuals::evaluate(keyed.values(), &z, &state.z_prev, penalty.rho());

    let mut duals = Vec::with_capacity(keyed.len());
    for (i, record) in keyed.values().enumerate() {
        if i == 0 {
            diagnostics.first_worker_done = clock.now();
        }

        duals.push(dual_update(record, &z, penalty.rho_multiplier())?);
        diagnostics.last_worker_done = clock.now();
    }

    Phase::Emitting.enter(iteration);
    let next_penalty = penalty.annealed()?;

    let bundle = keyed
        .into_values()
        .zip(duals)
        .map(|(record, u)| {
            debug!(iteration = iteration, worker_id = record.worker_id.as_str(); "emitting worker context");

            WorkerRecord {
                worker_id: record.worker_id,
                x: record.x,
                u,
                z: z.clone(),
                rho: next_penalty.rho(),
                rho_multiplier: next_penalty.rho_multiplier(),
                lambda: next_penalty.lambda(),
                primal_objective: state.primal_objective,
                r_norm: residuals.primal,
                s_norm: residuals.dual,
                timestamps: Timestamps {
                    reduce_start: diagnostics.round_start,
                    first_reduce_completed: diagnostics.first_worker_done,
                    last_reduce_completed: diagnostics.last_worker_done,
                    ..record.timestamps
                },
            }
        })
        .collect();

    let converged = residuals.converged();
    Phase::Done.enter(iteration);

    info!(
        iteration = iteration,
        workers = state.workers,
        objective = state.primal_objective,
        r_norm = residuals.primal,
        s_norm = residuals.dual,
        converged = converged;
        "round combined"
    );

    Ok(RoundOutcome {
        bundle,
        summary: RoundSummary {
            iteration,
            workers: state.workers,
            features: state.features,
            primal_objective: state.primal_objective,
            residuals,
            converged,
            next_penalty,
            diagnostics,
        },
    })
}

/// Keys the records by worker id, checking every configured worker reported exactly once.
fn key_by_worker(
    records: Vec<WorkerRecord>,
    config: &RoundConfig,
) -> Result<BTreeMap<String, WorkerRecord>> {
    if records.is_empty() {
        return Err(RoundErr::EmptyRound);
    }

    let mut keyed = BTreeMap::new();

    for record in records {
        if record.rho != config.penalty().rho() {
            warn!(
                worker_id = record.worker_id.as_str(),
                got = record.rho,
                expected = config.penalty().rho();
                "worker solved with a different rho"
            );
        }

        match keyed.entry(record.worker_id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(record);
            }
            Entry::Occupied(entry) => {
                return Err(RoundErr::DuplicateWorker {
                    worker_id: entry.key().clone(),
                });
            }
        }
    }

    if keyed.len() != config.workers() {
        return Err(RoundErr::WorkerCountMismatch {
            got: keyed.len(),
            expected: config.workers(),
        });
    }

    Ok(keyed)
}
