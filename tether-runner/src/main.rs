//! Tether Runner
//!
//! Launches one host's share of a parameter-server training job.
//!
//! Architecture:
//! - Configuration: flags with environment fallbacks, validated up front
//! - Environment: job inputs translated into arguments and variables
//! - Runtime: installs and starts the training module
//! - Liveness: waits for the master to exit on parameter server hosts
//! - Coordinator: plans and runs the launches for this host
//!
//! The exit code is the training process's own on failure, 2 for
//! configuration errors.

mod config;
mod coordinator;
mod env;
mod error;
mod liveness;
mod runtime;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, ProbeKind};
use crate::coordinator::JobCoordinator;
use crate::env::{TrainingEnv, parse_hosts, parse_object};
use crate::error::CONFIG_EXIT_CODE;
use crate::liveness::{HttpProbe, LivenessPoller, MasterProbe, TcpProbe};
use crate::runtime::ProcessRuntime;

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(about = "Launch a host's share of a parameter-server training job", long_about = None)]
struct Cli {
    /// Hosts in the job, master first (JSON array or comma separated)
    #[arg(long, env = "SM_HOSTS")]
    hosts: String,

    /// Host this launcher runs on
    #[arg(long, env = "SM_CURRENT_HOST")]
    current_host: String,

    /// Directory holding the training module
    #[arg(long, env = "SM_MODULE_DIR")]
    module_dir: PathBuf,

    /// Training entry point (module name or script)
    #[arg(long, env = "SM_MODULE_NAME")]
    module_name: String,

    /// Hyperparameters as a JSON object
    #[arg(long, env = "SM_HPS", default_value = "{}")]
    hyperparameters: String,

    /// Framework parameters as a JSON object
    #[arg(long, env = "SM_FRAMEWORK_PARAMS", default_value = "{}")]
    framework_params: String,

    /// Log level for the launcher and the training module
    #[arg(long, env = "SM_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Seconds between liveness probes
    #[arg(long, env = "TETHER_POLL_INTERVAL", default_value_t = 10)]
    poll_interval: u64,

    /// Stop waiting for the master after this many probes
    #[arg(long, env = "TETHER_MAX_PROBES")]
    max_probes: Option<u32>,

    /// Liveness probe implementation
    #[arg(long, env = "TETHER_PROBE", value_enum, default_value_t = ProbeKind::Tcp)]
    probe: ProbeKind,

    /// Seconds before a single probe gives up connecting
    #[arg(long, env = "TETHER_PROBE_TIMEOUT", default_value_t = 5)]
    probe_timeout: u64,

    /// Python interpreter used to install and run the module
    #[arg(long, env = "TETHER_PYTHON", default_value = "python3")]
    python: String,

    /// File the training environment is written to for runs without install
    #[arg(long, env = "TETHER_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = log_filter(&cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tether Runner");

    let (config, env) = match load(cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    info!(
        "Loaded configuration: current_host={}, hosts={:?}, probe={:?}",
        env.current_host, env.hosts, config.probe
    );

    let coordinator = match build_coordinator(&config) {
        Ok(coordinator) => coordinator,
        Err(e) => {
            error!("Failed to initialize: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match coordinator.run(&env).await {
        Ok(plan) => {
            info!(
                "Training job finished on {} ({} launch(es))",
                env.current_host,
                plan.launch_count()
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_config_error() => {
            error!("Training job misconfigured, not retrying: {}", e);
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!("Training job failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Builds the default filter directives for the given log level
fn log_filter(log_level: &str) -> String {
    let level = tracing_level(log_level);
    format!("tether_runner={level},tether_core={level}")
}

/// Maps a log level to a tracing level name
///
/// Accepts Python's numeric levels (`10`, `20`, ...) as the platform passes
/// them, as well as level names.
fn tracing_level(log_level: &str) -> &'static str {
    let trimmed = log_level.trim();

    if let Ok(number) = trimmed.parse::<i64>() {
        return match number {
            i64::MIN..=10 => "debug",
            11..=20 => "info",
            21..=30 => "warn",
            _ => "error",
        };
    }

    match trimmed.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        "off" => "off",
        _ => "info",
    }
}

/// Splits the command line into runner configuration and job environment
fn load(cli: Cli) -> Result<(Config, TrainingEnv)> {
    let env_file = cli
        .env_file
        .unwrap_or_else(|| Config::default().env_file);

    let mut config = Config::new(env_file);
    config.poll_interval = Duration::from_secs(cli.poll_interval);
    config.probe = cli.probe;
    config.probe_timeout = Duration::from_secs(cli.probe_timeout);
    config.python = cli.python;
    if let Some(max_probes) = cli.max_probes {
        config = config.with_max_probes(max_probes);
    }
    config.validate()?;

    let env = TrainingEnv {
        hosts: parse_hosts(&cli.hosts).context("Failed to parse hosts")?,
        current_host: cli.current_host,
        module_dir: cli.module_dir,
        module_name: cli.module_name,
        hyperparameters: parse_object("hyperparameters", &cli.hyperparameters)?,
        additional_framework_parameters: parse_object("framework params", &cli.framework_params)?,
        log_level: cli.log_level,
    };

    Ok((config, env))
}

fn build_coordinator(config: &Config) -> Result<JobCoordinator> {
    let probe: Arc<dyn MasterProbe> = match config.probe {
        ProbeKind::Tcp => Arc::new(TcpProbe::new(config.control_port, config.probe_timeout)),
        ProbeKind::Http => Arc::new(
            HttpProbe::new(config.control_port, config.probe_timeout)
                .context("Failed to build HTTP probe client")?,
        ),
    };

    let poller = LivenessPoller::new(probe, config.poll_interval, config.max_probes);
    let runtime = Arc::new(ProcessRuntime::new(
        config.python.clone(),
        config.env_file.clone(),
    ));

    Ok(JobCoordinator::new(runtime, poller))
}
