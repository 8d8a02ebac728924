//! Smart Publisher CLI
//!
//! Summarize a batch of articles with Gemini and post a digest
//! of the results to Telegram.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use publisher_core::Config;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Smart Publisher - article summaries to Telegram
#[derive(Parser)]
#[command(name = "publisher")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gemini model to use (overrides config)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "PUBLISHER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a random selection of articles from a JSON file
    Summarize {
        /// JSON array of {"title", "content"} objects
        file: PathBuf,

        /// Number of articles to summarize
        #[arg(short = 'n', long, default_value = "2")]
        count: usize,

        /// Post a random selection of the summaries to Telegram
        #[arg(long)]
        send: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Post previously generated summaries to Telegram
    Send {
        /// JSON array of {"title", "content", "summary"} objects
        file: PathBuf,
    },

    /// Print extractive summaries without calling the API
    Fallback {
        /// JSON array of {"title", "content"} objects
        file: PathBuf,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize default configuration
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    // Apply CLI overrides
    if let Some(model) = &cli.model {
        config.gemini.model = model.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(&config.logging.level);

    match cli.command {
        Commands::Summarize {
            file,
            count,
            send,
            json,
        } => commands::summarize::run(config, &file, count, send, json).await,
        Commands::Send { file } => commands::send::run(config, &file).await,
        Commands::Fallback { file } => commands::fallback::run(&file),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(config),
            ConfigCommands::Init { force } => commands::config::init(force),
        },
    }
}
