pub mod configs;
pub mod error;
mod session;
pub mod solvers;

use std::collections::BTreeMap;

use tokio::runtime::Runtime;

pub use configs::AdmmConfig;
pub use error::OrchestratorError;
pub use session::{Session, TrainingReport};
pub use solvers::{LocalSolver, QuadraticSolver, SolverErr};

/// Runs the whole ADMM loop in-process until convergence or the round budget is exhausted.
///
/// Builds its own tokio runtime, use `Session::run` from async contexts.
///
/// # Arguments
/// * `config` - The run configuration.
/// * `solvers` - One local solver per worker id.
///
/// # Errors
/// Returns an `OrchestratorError` if the configuration is invalid or any round fails.
pub fn train<S: LocalSolver>(
    config: AdmmConfig,
    solvers: BTreeMap<String, S>,
) -> Result<TrainingReport, OrchestratorError> {
    log::info!("starting session with {} worker(s)", solvers.len());
    let session = Session::new(config, solvers)?;
    let runtime = Runtime::new()?;
    runtime.block_on(session.run())
}
