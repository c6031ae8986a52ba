use anyhow::{bail, Context, Result};
use market_simulator_core_rs::dataset::{self, DatasetConfig};
use market_simulator_core_rs::{
    FeatureEncoder, MlpOracle, Orchestrator, PolicyOracle, PriceDomain, RunSummary,
    SimulationConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_help() {
    eprintln!(
        r#"Market Simulator - single-slot continuous double auction

USAGE:
    market-sim --config <PATH> [OPTIONS]

OPTIONS:
    --config <PATH>     Experiment file (JSON)
    --oracle <PATH>     MLP weights (JSON) for policy agents; overrides oracle_model
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter

EXAMPLES:
    # Run every experiment in a file
    market-sim --config experiments.json

    # Same, with a trained policy network
    market-sim --config experiments.json --oracle mlp.json
"#
    );
}

#[derive(Debug, Deserialize)]
struct ExperimentFile {
    #[serde(default)]
    oracle_model: Option<PathBuf>,
    experiments: Vec<Experiment>,
    #[serde(default)]
    training_data: Option<DatasetConfig>,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    label: String,
    simulation: SimulationConfig,
}

#[derive(Debug, Serialize)]
struct ExperimentReport<'a> {
    label: &'a str,
    #[serde(flatten)]
    summary: RunSummary,
}

#[derive(Debug, Serialize)]
struct TrainingReport {
    samples: usize,
    class_counts: [usize; 5],
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_simulator_core_rs=info,market_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut oracle_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    bail!("--config requires a path argument");
                }
                config_path = Some(PathBuf::from(&args[i]));
            }
            "--oracle" | "-o" => {
                i += 1;
                if i >= args.len() {
                    bail!("--oracle requires a path argument");
                }
                oracle_path = Some(PathBuf::from(&args[i]));
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(config_path) = config_path else {
        print_help();
        std::process::exit(1);
    };

    tracing::info!("Loading experiments from: {}", config_path.display());
    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let file: ExperimentFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", config_path.display()))?;
    tracing::info!("Experiments: {}", file.experiments.len());

    let oracle = match oracle_path.or(file.oracle_model) {
        Some(path) => Some(load_oracle(&path, &file.experiments)?),
        None => None,
    };

    let summaries = run_all(&file.experiments, oracle.as_ref())?;
    for (experiment, summary) in file.experiments.iter().zip(summaries) {
        let report = ExperimentReport {
            label: &experiment.label,
            summary,
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    if let Some(config) = &file.training_data {
        let set = dataset::generate(config).context("generating training data")?;
        let report = TrainingReport {
            samples: set.len(),
            class_counts: set.class_counts(),
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    Ok(())
}

/// Load the MLP and check it fits every experiment that uses it
fn load_oracle(path: &Path, experiments: &[Experiment]) -> Result<Arc<dyn PolicyOracle>> {
    tracing::info!("Loading policy network from: {}", path.display());
    let mlp = MlpOracle::from_json(path)?;
    for experiment in experiments.iter().filter(|e| e.simulation.agent_mix.policy > 0) {
        let domain = PriceDomain::new(experiment.simulation.price_max)
            .with_context(|| format!("experiment {}", experiment.label))?;
        mlp.expect_input_width(FeatureEncoder::new(domain).width())
            .with_context(|| format!("experiment {}", experiment.label))?;
    }
    Ok(Arc::new(mlp))
}

fn run_one(experiment: &Experiment, oracle: Option<&Arc<dyn PolicyOracle>>) -> Result<RunSummary> {
    tracing::info!(label = %experiment.label, "starting experiment");
    let config = experiment.simulation.clone();
    let mut orchestrator = match oracle {
        Some(oracle) => Orchestrator::with_oracle(config, Arc::clone(oracle)),
        None => Orchestrator::new(config),
    }
    .with_context(|| format!("experiment {}", experiment.label))?;
    orchestrator
        .run()
        .with_context(|| format!("experiment {}", experiment.label))
}

#[cfg(feature = "parallel")]
fn run_all(
    experiments: &[Experiment],
    oracle: Option<&Arc<dyn PolicyOracle>>,
) -> Result<Vec<RunSummary>> {
    use rayon::prelude::*;

    experiments
        .par_iter()
        .map(|experiment| run_one(experiment, oracle))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_all(
    experiments: &[Experiment],
    oracle: Option<&Arc<dyn PolicyOracle>>,
) -> Result<Vec<RunSummary>> {
    experiments
        .iter()
        .map(|experiment| run_one(experiment, oracle))
        .collect()
}
