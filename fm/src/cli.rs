//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::catalog::Catalog;

/// agentfm - planner-driven file organizer
#[derive(Parser)]
#[command(
    name = "fm",
    about = "Organize and compress files with a planner that picks file operations",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/agentfm/logs/agentfm.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Input folder (overrides paths.input)
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    /// Output folder (overrides paths.output)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run one orchestration over the input folder
    Run {
        /// High-level goal for the planner (defaults to config `goal`)
        #[arg(short, long)]
        goal: Option<String>,

        /// Replay a YAML plan instead of asking the LLM
        #[arg(short, long, value_name = "FILE")]
        plan: Option<PathBuf>,

        /// Maximum number of executed steps
        #[arg(short, long)]
        max_iterations: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the operations offered to the planner
    Operations {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Create the input and output folders
    Init,
}

/// Output format for reports and listings
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// One line per operation: `name(param: type, ...)  description`
pub fn format_operations(catalog: &Catalog) -> String {
    let mut out = String::new();
    for spec in catalog.describe() {
        let params: Vec<String> = spec
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty.as_str()))
            .collect();
        out.push_str(&format!("{}({})\n    {}\n", spec.name, params.join(", "), spec.description));
    }
    out
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agentfm")
        .join("logs")
        .join("agentfm.log")
}
