//! fraudlab CLI — workshop helpers for the credit-card fraud demo.
//!
//! Cleans tutorial catalogs, registers the demo tables and entities, and
//! builds playground catalogs against a feature store.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// fraudlab: feature-store workshop helpers
#[derive(Parser, Debug)]
#[command(name = "fraudlab", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use a seeded in-memory store instead of the REST API
    #[arg(long)]
    offline: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Strip tutorial catalogs of deployments and materialized tables
    Cleanup {
        /// Do not log per-catalog counts
        #[arg(long)]
        quiet_report: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show whether catalogs would be cleaned
    Classify {
        /// Catalog names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Normalize a display name into an identifier
    Identifier {
        /// Display name
        name: String,
    },
    /// Register demo objects in the active catalog
    Register {
        #[command(subcommand)]
        action: RegisterAction,
    },
    /// Clean up, then create and populate a new playground catalog
    Playground,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug, Clone, Copy)]
enum RegisterAction {
    /// Register the six source tables
    Tables,
    /// Get or create the demo entities
    Entities,
    /// Tag entity columns (registers tables first if needed)
    Tags,
    /// Tables, entities, and tags
    All,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "fraudlab", "fraudlab")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "fraudlab.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let ctx = commands::Context {
        workspace,
        config_path: cli.config,
        offline: cli.offline,
    };
    commands::handle_command(cli.command, &ctx).await
}
