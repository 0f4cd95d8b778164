//! Thin command-line entry point: configure, run, export.
//!
//! Mirrors the research workflow: a Monte-Carlo loop over repeated runs and
//! a sweep of green-delivery costs, each run executed on a fresh clone of
//! the configured simulation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sim_core::{Engine, Mode, SimConfig};

#[derive(Parser)]
#[command(
    name = "greensim",
    about = "Agent-based simulation of green vs normal delivery adoption"
)]
struct Cli {
    /// JSON configuration file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulation mode; `all` runs benchmark, independent and social in turn.
    #[arg(long, value_enum, default_value_t = CliMode::All)]
    mode: CliMode,

    /// Number of periods per run.
    #[arg(long, default_value_t = 24)]
    periods: usize,

    /// Monte-Carlo repetitions of the full sweep.
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Green-delivery costs to sweep, comma separated. Falls back to the
    /// configured cost when empty.
    #[arg(long, value_delimiter = ',')]
    sweep_green: Vec<f64>,

    /// Directory for the CSV tables.
    #[arg(long, default_value = "saved-stats")]
    out_dir: PathBuf,

    /// Directory for error logs of recoverable solve failures.
    #[arg(long, default_value = "error-logs")]
    log_dir: PathBuf,

    /// Agents in the sampled per-agent table.
    #[arg(long, default_value_t = 3)]
    agent_sample: usize,

    /// RNG seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CliMode {
    Benchmark,
    Independent,
    Social,
    All,
}

impl CliMode {
    fn modes(self) -> Vec<Mode> {
        match self {
            CliMode::Benchmark => vec![Mode::Benchmark],
            CliMode::Independent => vec![Mode::Independent],
            CliMode::Social => vec![Mode::Social],
            CliMode::All => vec![Mode::Benchmark, Mode::Independent, Mode::Social],
        }
    }
}

fn mode_slug(mode: Mode) -> &'static str {
    match mode {
        Mode::Benchmark => "benchmark",
        Mode::Independent => "normal",
        Mode::Social => "social",
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let base_config = match &cli.config {
        Some(path) => SimConfig::from_json_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    base_config.validate().context("invalid configuration")?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let sweep = if cli.sweep_green.is_empty() {
        vec![base_config.cost_green]
    } else {
        cli.sweep_green.clone()
    };
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    for run in 0..cli.runs {
        for &cost_green in &sweep {
            for mode in cli.mode.modes() {
                // Each run gets a fresh clone of the configured simulation.
                let mut config = base_config.clone();
                config.cost_green = cost_green;

                let mut engine = Engine::new(config, &mut rng)?;
                engine.run(mode, cli.periods)?;

                let aggs = report::aggregate_all(&engine.agents, cli.periods);
                report::print_period_table(&aggs)?;

                let slug = mode_slug(mode);
                let frame =
                    report::simulation_frame(&aggs, cost_green, engine.config().cost_normal)?;
                report::append_simulation_csv(
                    &cli.out_dir.join(format!("{slug}_simulation.csv")),
                    &frame,
                )?;

                if mode != Mode::Benchmark {
                    let sample = report::agent_sample_frame(
                        &engine.agents,
                        cli.agent_sample,
                        cli.periods,
                        &mut rng,
                    )?;
                    report::write_agent_sample_csv(
                        &cli.out_dir.join(format!("{slug}_agent.csv")),
                        &sample,
                    )?;
                }

                let (green, normal) = engine.delivery_share();
                tracing::info!(
                    run = run as u64,
                    mode = slug,
                    cost_green,
                    green_users = green as u64,
                    normal_users = normal as u64,
                    "run complete"
                );

                if let Some(path) = engine.error_log.save(&cli.log_dir)? {
                    tracing::warn!(
                        log = %path.display(),
                        failures = engine.error_log.entries().len() as u64,
                        "recoverable solve failures recorded"
                    );
                }
            }
        }
    }

    Ok(())
}
