//! StairLab CLI — validate experiment configs, simulate sessions, replay
//! recorded responses, and run Monte Carlo batches.
//!
//! Commands:
//! - `validate` — load and check an experiment TOML
//! - `simulate` — run every condition interleaved against simulated listeners
//! - `replay` — drive one condition's staircase from recorded scores
//! - `batch` — repeat each condition N times and summarise the estimates

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stairlab_core::{estimate_threshold, StaircaseController};
use stairlab_runner::export::{
    export_experiment_json, generate_batch_report, generate_report, save_experiment_artifacts,
};
use stairlab_runner::{run_batch, run_experiment, ExperimentConfig};

#[derive(Parser)]
#[command(
    name = "stairlab",
    about = "StairLab CLI — adaptive staircase experiments"
)]
struct Cli {
    /// Log filter (e.g. `info`, `stairlab_runner=debug`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as newline-delimited JSON.
    #[arg(long, global = true, default_value_t = false)]
    json_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an experiment TOML and report whether it is valid.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
    /// Simulate every condition, interleaved, against simulated listeners.
    Simulate {
        #[arg(long)]
        config: PathBuf,

        /// Override the master seed from the config.
        #[arg(long)]
        seed: Option<u64>,

        /// Write experiment artifacts here.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full result as JSON instead of a Markdown report.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Drive one condition's staircase from recorded scores and print levels.
    Replay {
        #[arg(long)]
        config: PathBuf,

        /// Condition name. Defaults to the first condition.
        #[arg(long)]
        condition: Option<String>,

        /// Comma-separated scores, e.g. "1,1,-1".
        #[arg(long, allow_hyphen_values = true)]
        responses: String,
    },
    /// Repeat each condition N times and summarise the threshold estimates.
    Batch {
        #[arg(long)]
        config: PathBuf,

        /// Sessions per condition.
        #[arg(long, default_value_t = 100)]
        runs: usize,

        /// Override the master seed from the config.
        #[arg(long)]
        seed: Option<u64>,

        /// Write the summaries as JSON to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Validate { .. } => "validate",
            Commands::Simulate { .. } => "simulate",
            Commands::Replay { .. } => "replay",
            Commands::Batch { .. } => "batch",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.json_log)?;
    tracing::debug!(command = cli.command.name(), "dispatch");

    match cli.command {
        Commands::Validate { config } => run_validate(&config),
        Commands::Simulate {
            config,
            seed,
            output_dir,
            json,
        } => run_simulate(&config, seed, output_dir.as_deref(), json),
        Commands::Replay {
            config,
            condition,
            responses,
        } => run_replay(&config, condition.as_deref(), &responses),
        Commands::Batch {
            config,
            runs,
            seed,
            output,
        } => run_batch_cmd(&config, runs, seed, output.as_deref()),
    }
}

fn init_tracing(level: Option<&str>, json: bool) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid --log-level '{directives}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn load_config(path: &Path, seed: Option<u64>) -> Result<ExperimentConfig> {
    let mut config = ExperimentConfig::from_file(path)
        .with_context(|| format!("invalid experiment config {}", path.display()))?;
    if let Some(seed) = seed {
        config.run.seed = seed;
    }
    tracing::info!(
        path = %path.display(),
        experiment_id = %config.experiment_id(),
        conditions = config.conditions.len(),
        seed = config.run.seed,
        "experiment config loaded"
    );
    Ok(config)
}

fn run_validate(path: &Path) -> Result<()> {
    let config = load_config(path, None)?;
    println!("{}: OK", path.display());
    println!("  experiment id: {}", config.experiment_id());
    println!(
        "  seed {}, max trials {}, repetitions {}",
        config.run.seed, config.run.max_trials, config.run.repetitions
    );
    for c in &config.conditions {
        let s = &c.staircase;
        println!(
            "  - {}: start {} in [{}, {}], {}-down, steps {:?}, >= {} trials / {} reversals{}",
            c.name,
            s.start_level,
            s.min_level,
            s.max_level,
            s.n_down,
            s.step_sizes,
            s.n_trials,
            s.n_reversals,
            if s.rapid_descend { ", rapid descend" } else { "" },
        );
    }
    Ok(())
}

fn run_simulate(path: &Path, seed: Option<u64>, output_dir: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(path, seed)?;
    let result = run_experiment(&config)?;

    if json {
        println!("{}", export_experiment_json(&result)?);
    } else {
        print!("{}", generate_report(&result));
    }

    if let Some(dir) = output_dir {
        let written = save_experiment_artifacts(&result, dir)?;
        tracing::info!(dir = %written.display(), sessions = result.sessions().count(), "simulation saved");
        eprintln!("artifacts saved to {}", written.display());
    }
    Ok(())
}

fn parse_scores(text: &str) -> Result<Vec<i64>> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .with_context(|| format!("'{s}' is not an integer score"))
        })
        .collect()
}

fn run_replay(path: &Path, condition: Option<&str>, responses: &str) -> Result<()> {
    let config = load_config(path, None)?;
    let cond = match condition {
        Some(name) => config
            .condition(name)
            .ok_or_else(|| anyhow!("condition '{name}' not found in {}", path.display()))?,
        None => match config.conditions.first() {
            Some(c) => c,
            None => bail!("{} has no conditions", path.display()),
        },
    };

    let scores = parse_scores(responses)?;
    let mut controller = StaircaseController::new(cond.staircase.clone())?;

    println!("condition: {}", cond.name);
    println!("{:>5}  {:>8}  {:>5}  {:>8}  {:>8}", "trial", "level", "resp", "reversal", "next");
    for score in scores {
        let record = controller
            .record_score(score)
            .with_context(|| format!("trial {}", controller.trial_count()))?;
        println!(
            "{:>5}  {:>8.2}  {:>5}  {:>8}  {:>8.2}",
            record.trial_number,
            record.level,
            record.response.score(),
            if record.reversal { "*" } else { "" },
            controller.current_level(),
        );
    }

    println!(
        "status: {:?} after {} trials, {} reversals",
        controller.status(),
        controller.trial_count(),
        controller.reversal_count()
    );
    match estimate_threshold(controller.log(), cond.threshold_rule) {
        Some(t) => println!(
            "threshold: {:.2} (sd {:.2}, {} reversals)",
            t.mean, t.std_dev, t.reversals_used
        ),
        None => println!("threshold: not enough reversals"),
    }
    Ok(())
}

fn run_batch_cmd(path: &Path, runs: usize, seed: Option<u64>, output: Option<&Path>) -> Result<()> {
    if runs == 0 {
        bail!("--runs must be at least 1");
    }
    let config = load_config(path, seed)?;
    let summaries = run_batch(&config, runs)?;
    print!("{}", generate_batch_report(&summaries));

    if let Some(out) = output {
        let json = serde_json::to_string_pretty(&summaries).context("failed to serialize batch")?;
        std::fs::write(out, json).with_context(|| format!("failed to write {}", out.display()))?;
        tracing::info!(path = %out.display(), conditions = summaries.len(), "batch summary saved");
        eprintln!("summary saved to {}", out.display());
    }
    Ok(())
}
