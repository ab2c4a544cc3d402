use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use orchestrator::{AdmmConfig, QuadraticSolver};
use parameter_server::RoundSummary;

/// Exit code telling the caller another round must be scheduled.
const NOT_CONVERGED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "admm", version, about = "Consensus ADMM round coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Combines one round of worker records into the contexts of the next round.
    Combine {
        /// JSON run configuration.
        #[arg(long)]
        config: PathBuf,
        /// The number of the round being combined.
        #[arg(long, default_value_t = 0)]
        iteration: usize,
        /// Newline delimited worker records.
        #[arg(long)]
        input: PathBuf,
        /// Where to write the round bundle, stdout if missing.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Runs a whole in-process ADMM loop over quadratic local losses.
    Simulate {
        /// JSON run configuration.
        #[arg(long)]
        config: PathBuf,
        /// JSON object mapping every worker id to the center of its loss.
        #[arg(long)]
        targets: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let converged = match Cli::parse().command {
        Command::Combine {
            config,
            iteration,
            input,
            output,
        } => {
            let (bundle, summary) = combine_file(&config, iteration, &input)?;

            match output {
                Some(path) => fs::write(&path, &bundle)
                    .with_context(|| format!("cannot write '{}'", path.display()))?,
                None => writeln!(io::stdout().lock(), "{bundle}")?,
            }

            summary.converged
        }
        Command::Simulate { config, targets } => {
            let (consensus, converged) = simulate(&config, &targets)?;
            println!("{}", serde_json::to_string(&consensus)?);
            converged
        }
    };

    Ok(if converged {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(NOT_CONVERGED)
    })
}

/// Runs the combine step over the records stored in `input`.
fn combine_file(
    config: &Path,
    iteration: usize,
    input: &Path,
) -> anyhow::Result<(String, RoundSummary)> {
    let round = AdmmConfig::load(config)?.round_config(iteration)?;

    let raw = fs::read_to_string(input)
        .with_context(|| format!("cannot read '{}'", input.display()))?;
    let records = comms::decode_batch(&raw)
        .with_context(|| format!("cannot parse '{}'", input.display()))?;

    let outcome = parameter_server::combine(records, &round)?;
    let (bundle, summary) = (outcome.bundle.encode()?, outcome.summary);

    info!(
        iteration = summary.iteration,
        r_norm = summary.residuals.primal,
        s_norm = summary.residuals.dual,
        converged = summary.converged;
        "combined {} worker record(s)",
        summary.workers
    );

    Ok((bundle, summary))
}

/// Runs the in-process driver, returning the final consensus and whether it converged.
fn simulate(config: &Path, targets: &Path) -> anyhow::Result<(Vec<f64>, bool)> {
    let config = AdmmConfig::load(config)?;

    let raw = fs::read_to_string(targets)
        .with_context(|| format!("cannot read '{}'", targets.display()))?;
    let targets: BTreeMap<String, Vec<f64>> =
        serde_json::from_str(&raw).context("targets must map worker ids to vectors")?;

    let solvers = targets
        .into_iter()
        .map(|(id, target)| (id, QuadraticSolver::new(target)))
        .collect();

    let report = orchestrator::train(config, solvers)?;
    info!(
        rounds = report.rounds,
        not_converged = report.not_converged;
        "simulation finished"
    );

    Ok((report.consensus, report.converged))
}
