//! Call center capacity planner
//!
//! Runs every scenario of an experiment and prints the summary table.
//!
//! Usage:
//!   cargo run --release --bin call_center
//!   cargo run --release --bin call_center -- --config experiments/baseline.toml --replications 100
//!   cargo run --release --bin call_center -- --agents 4 --arrival-rate 0.6 --trace calls.csv

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use call_center::output::{self, ScenarioResult};
use call_center::replication::{ReplicationSummary, replicate};
use call_center::{ExperimentFile, ScenarioSpec, simulation};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "call_center", about = "Call center queueing simulation with caller abandonment")]
struct Cli {
    /// TOML experiment file; defaults to the three built-in scenarios
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated minutes per run
    #[arg(long)]
    sim_time: Option<f64>,

    /// Mean service time in minutes
    #[arg(long)]
    service_time: Option<f64>,

    /// Minutes a caller waits before hanging up
    #[arg(long)]
    wait_threshold: Option<f64>,

    #[arg(long, conflicts_with = "entropy")]
    seed: Option<u64>,

    /// Seed from OS entropy instead of a fixed seed
    #[arg(long)]
    entropy: bool,

    /// Run a single scenario with this many agents (needs --arrival-rate)
    #[arg(long, requires = "arrival_rate")]
    agents: Option<usize>,

    /// Calls per minute for the single scenario
    #[arg(long, requires = "agents")]
    arrival_rate: Option<f64>,

    /// Independent runs per scenario
    #[arg(long)]
    replications: Option<usize>,

    /// Worker threads for replications
    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    json: Option<PathBuf>,

    #[arg(long)]
    csv: Option<PathBuf>,

    /// Per-call CSV of the first scenario's run
    #[arg(long)]
    trace: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn experiment(&self) -> call_center::Result<ExperimentFile> {
        let mut experiment = match &self.config {
            Some(path) => ExperimentFile::load(path)?,
            None => ExperimentFile::default(),
        };

        let settings = &mut experiment.simulation;
        if let Some(sim_time) = self.sim_time {
            settings.sim_time = sim_time;
        }
        if let Some(service_time) = self.service_time {
            settings.service_time = service_time;
        }
        if let Some(wait_threshold) = self.wait_threshold {
            settings.wait_threshold = wait_threshold;
        }
        if self.seed.is_some() {
            settings.random_seed = self.seed;
        }
        if self.entropy {
            settings.random_seed = None;
        }
        if let Some(replications) = self.replications {
            settings.replications = replications;
        }
        if let (Some(agents), Some(arrival_rate)) = (self.agents, self.arrival_rate) {
            experiment.scenarios = vec![ScenarioSpec::new("Custom", agents, arrival_rate)];
        }
        Ok(experiment)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<Vec<ScenarioResult>, Box<dyn std::error::Error>> {
    let experiment = cli.experiment()?;
    let replications = experiment.simulation.replications;
    let scenarios = experiment.scenario_configs()?;

    let mut results = Vec::with_capacity(scenarios.len());
    for (index, (scenario, config)) in scenarios.into_iter().enumerate() {
        info!(
            "running {} ({} agents, {} calls/min)",
            scenario.label, config.agent_count, config.arrival_rate
        );
        let start = Instant::now();

        let metrics = if index == 0 && cli.trace.is_some() {
            let trace = simulation::trace(&config)?;
            if let Some(path) = &cli.trace {
                output::write_trace_csv(&trace.calls, path)?;
                info!("wrote {} call records to {}", trace.calls.len(), path.display());
            }
            trace.metrics
        } else {
            simulation::run(&config)?
        };

        let replication = if replications > 1 {
            let runs = replicate(&config, replications, cli.threads)?;
            Some(ReplicationSummary::from_results(&runs))
        } else {
            None
        };

        info!(
            "{}: served {} abandoned {} in {:.2}s",
            scenario.label,
            metrics.calls_served,
            metrics.calls_abandoned,
            start.elapsed().as_secs_f64()
        );

        results.push(ScenarioResult {
            label: scenario.label.clone(),
            arrival_rate: config.arrival_rate,
            metrics,
            replication,
        });
    }
    Ok(results)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let results = match run(&cli) {
        Ok(results) => results,
        Err(e) => {
            error!("simulation aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("\n=== Simulation Results Summary ===");
    println!("{}", output::summary_table(&results));

    let spread = output::replication_table(&results);
    if !spread.is_empty() {
        println!("\n=== Replication Spread ===");
        println!("{}", spread);
    }

    if let Some(path) = &cli.json {
        if let Err(e) = output::write_json(&results, path) {
            error!("failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }
    if let Some(path) = &cli.csv {
        if let Err(e) = output::write_csv(&results, path) {
            error!("failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
