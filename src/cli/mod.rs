//! # Command Line Interface
//!
//! Queries a control plane for client configuration status, or renders the
//! configuration graph of a previously saved dump.

pub mod config;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::DEFAULT_MAX_RETRIES;
use crate::csds::classify::FilterMode;
use crate::csds::run_status;
use crate::graph::{extract, render, visualize::save_graph, Payload};
use crate::observability::{init_logging, log_options, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "csds-client")]
#[command(about = "Client Status Discovery Service client for xDS control planes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the configuration graph of a saved JSON dump
    Graph {
        /// Dump written by --file-to-save-config
        #[arg(long)]
        input: PathBuf,

        /// DOT output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Flags of a status query
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Control plane address (host:port or URI)
    #[arg(long)]
    pub service_uri: Option<String>,

    /// Platform of the control plane: gcp or generic
    #[arg(long)]
    pub cloud_platform: Option<String>,

    /// Authentication mode: auto, jwt or insecure
    #[arg(long)]
    pub authn_mode: Option<String>,

    /// Status protocol version: v2 or v3
    #[arg(long)]
    pub api_version: Option<String>,

    /// Service account credential file for jwt mode
    #[arg(long)]
    pub jwt_file: Option<PathBuf>,

    /// Node matcher request file (JSON or YAML)
    #[arg(long)]
    pub request_file: Option<PathBuf>,

    /// Inline node matcher request, merged over --request-file
    #[arg(long)]
    pub request_yaml: Option<String>,

    /// Write the detailed config dump to this file instead of stdout
    #[arg(long)]
    pub file_to_save_config: Option<PathBuf>,

    /// Poll interval such as 500ms, 2s, 1m; 0 runs once
    #[arg(long, value_parser = config::parse_duration, default_value = "0")]
    pub monitor_interval: Duration,

    /// Save the config graph and open it in a viewer
    #[arg(long)]
    pub visualization: bool,

    /// How --filter-pattern is matched against client ids
    #[arg(long, value_enum)]
    pub filter_mode: Option<FilterMode>,

    /// Client id pattern
    #[arg(long)]
    pub filter_pattern: Option<String>,

    /// Stream reopen attempts after a policy rejection
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Connect timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Some(Commands::Graph { input, output }) => {
            run_graph(&input, output.as_deref(), &mut std::io::stdout())
        }
        None => run_query(&cli.run).await,
    }
}

async fn run_query(args: &RunArgs) -> anyhow::Result<()> {
    let file = config::CliConfig::load()?;
    let options = config::resolve_options(args, &file, &|key: &str| std::env::var(key).ok())?;
    log_options(&options);

    // Single-shot runs keep the default Ctrl-C behaviour.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if options.is_monitor() {
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping after the current poll");
                    let _ = shutdown_tx.send(true);
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Second interrupt, exiting immediately");
                        std::process::exit(130);
                    }
                }
                Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
            }
        });
    }

    run_status(&options, std::io::stdout(), shutdown_rx).await?;
    Ok(())
}

/// Extract and render the graph of a saved dump
pub fn run_graph<W: Write>(input: &Path, output: Option<&Path>, out: &mut W) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read dump file: {}", input.display()))?;
    let payload = Payload::from_json(&text)?;
    let dot = render(&extract(&payload)?);

    match output {
        Some(path) => {
            save_graph(path, &dot)?;
            writeln!(out, "Config graph has been saved to {}", path.display())?;
        }
        None => out.write_all(dot.as_bytes())?,
    }
    Ok(())
}
