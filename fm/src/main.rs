//! fm - planner-driven file organizer
//!
//! CLI entry point: loads config, wires the planner, file operations and
//! orchestrator together and prints the run report.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, eyre};
use tokio::sync::watch;
use tracing::{info, warn};

use agentfm::catalog::Catalog;
use agentfm::cli::{Cli, Command, OutputFormat, format_operations, get_log_path};
use agentfm::config::Config;
use agentfm::llm::create_client;
use agentfm::ops::{OpsContext, OpsExecutor};
use agentfm::oracle::{LlmOracle, PlanningOracle, ScriptedOracle};
use agentfm::orchestrator::Orchestrator;
use agentfm::prompts::PromptLoader;

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to a log file, keep stdout for reports
    let level: tracing::Level = match level {
        Some(l) => l.parse().map_err(|_| eyre!("Invalid log level '{}'", l))?,
        None => tracing::Level::INFO,
    };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(input) = &cli.input {
        config.paths.input = input.clone();
    }
    if let Some(output) = &cli.output {
        config.paths.output = output.clone();
    }

    let level = cli.log_level.clone().or_else(|| config.log_level.clone());
    setup_logging(level.as_deref()).context("Failed to setup logging")?;

    match cli.command {
        Command::Run {
            goal,
            plan,
            max_iterations,
            format,
        } => {
            if let Some(n) = max_iterations {
                config.orchestrator.max_iterations = n;
            }
            config.validate().context("Invalid configuration")?;
            let completed = cmd_run(&config, goal, plan, format).await?;
            if !completed {
                std::process::exit(1);
            }
        }
        Command::Operations { format } => cmd_operations(format)?,
        Command::Init => {
            config.validate().context("Invalid configuration")?;
            cmd_init(&config)?;
        }
    }

    Ok(())
}

fn bootstrap_dirs(config: &Config) -> Result<()> {
    for dir in [&config.paths.input, &config.paths.output] {
        fs::create_dir_all(dir).context(format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}

fn build_oracle(config: &Config, plan: Option<PathBuf>) -> Result<Arc<dyn PlanningOracle>> {
    if let Some(path) = plan {
        info!("Replaying plan from {}", path.display());
        return Ok(Arc::new(ScriptedOracle::from_file(&path)?));
    }

    info!(
        "Using planner: provider={}, model={}",
        config.llm.provider, config.llm.model
    );
    let client = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = PromptLoader::new(config.paths.prompts.as_deref()).context("Failed to load prompts")?;
    Ok(Arc::new(LlmOracle::new(client, prompts, config)))
}

/// Run one orchestration; returns whether it completed
async fn cmd_run(config: &Config, goal: Option<String>, plan: Option<PathBuf>, format: OutputFormat) -> Result<bool> {
    bootstrap_dirs(config)?;

    let oracle = build_oracle(config, plan)?;
    let ctx = OpsContext::from_config(config).context("Failed to set up compression backends")?;
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            let _ = stop_tx.send(true);
        }
    });

    let orchestrator = Orchestrator::new(
        Catalog::standard(),
        oracle,
        OpsExecutor::new(ctx),
        config.orchestrator.clone(),
    )
    .with_stop_signal(stop_rx);

    let goal = goal.unwrap_or_else(|| config.goal.clone());
    let report = orchestrator.run(&goal).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", report.summary()),
    }
    Ok(report.outcome.is_completed())
}

fn cmd_operations(format: OutputFormat) -> Result<()> {
    let catalog = Catalog::standard();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(catalog.describe())?),
        OutputFormat::Text => print!("{}", format_operations(&catalog)),
    }
    Ok(())
}

fn cmd_init(config: &Config) -> Result<()> {
    bootstrap_dirs(config)?;
    println!("Input folder:  {}", config.paths.input.display());
    println!("Output folder: {}", config.paths.output.display());
    Ok(())
}
