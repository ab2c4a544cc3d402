use std::{
    error::Error,
    fmt::{self, Display},
};

use comms::{WorkerRecord, unix_nanos};

/// Error returned by a `LocalSolver` that couldn't solve its subproblem.
#[derive(Debug)]
pub struct SolverErr(String);

impl SolverErr {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl Display for SolverErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for SolverErr {}

/// Solves the regularized local subproblem of a single worker.
///
/// Given the context the combine step emitted for the worker, an implementation
/// must return a record under the same worker id holding its new local parameters `x`,
/// its local objective value and the untouched `u`, `z` and penalty values.
pub trait LocalSolver: Send + Sync + 'static {
    /// The length of the parameter vector this solver works with.
    fn features(&self) -> usize;

    /// Minimizes `f(x) + rho/2 · ‖x - z + u‖²` for the worker owning `context`.
    ///
    /// # Arguments
    /// * `context` - The worker's record emitted by the previous round.
    ///
    /// # Returns
    /// The worker's record for the current round or a `SolverErr`.
    fn solve(&self, context: &WorkerRecord) -> Result<WorkerRecord, SolverErr>;
}

/// The exact local solver of the quadratic loss `f(x) = ½‖x - a‖²`.
///
/// Its minimizer is `x = (a + rho·(z - u)) / (1 + rho)`.
#[derive(Debug, Clone)]
pub struct QuadraticSolver {
    target: Vec<f64>,
}

impl QuadraticSolver {
    /// Creates a new `QuadraticSolver`.
    ///
    /// # Arguments
    /// * `target` - The point `a` this worker's loss is centered on.
    pub fn new(target: Vec<f64>) -> Self {
        Self { target }
    }
}

impl LocalSolver for QuadraticSolver {
    fn features(&self) -> usize {
        self.target.len()
    }

    fn solve(&self, context: &WorkerRecord) -> Result<WorkerRecord, SolverErr> {
        let map_start = unix_nanos();
        let n = self.target.len();

        if context.z.len() != n || context.u.len() != n {
            return Err(SolverErr::new(format!(
                "context has {} consensus and {} dual features, expected {n}",
                context.z.len(),
                context.u.len()
            )));
        }

        let rho = context.rho;
        let optimization_start = unix_nanos();

        let x: Vec<f64> = self
            .target
            .iter()
            .zip(&context.z)
            .zip(&context.u)
            .map(|((a, z), u)| (a + rho * (z - u)) / (1.0 + rho))
            .collect();

        let primal_objective = 0.5
            * x.iter()
                .zip(&self.target)
                .map(|(x, a)| (x - a) * (x - a))
                .sum::<f64>();

        let mut record = context.clone();
        record.x = x;
        record.primal_objective = primal_objective;
        record.timestamps.map_start = map_start;
        record.timestamps.optimization_start = optimization_start;
        record.timestamps.map_end = unix_nanos();

        Ok(record)
    }
}
