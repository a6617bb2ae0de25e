//! Eventloom CLI
//!
//! Scaffolds import projects, validates transform documents and runs
//! CSV imports.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Eventloom - CSV to event store importer
#[derive(Parser)]
#[command(name = "eventloom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path (or project directory)
    #[arg(short, long, default_value = "eventloom.yaml", env = "EVENTLOOM_CONFIG")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Eventloom project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Validate configuration and transform documents without importing
    Validate,

    /// Import source files through the transforms into the sink
    Import {
        /// Import these files instead of the configured ones
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// Write records to this JSON-lines file instead of the configured sink
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Translate a CSV file and print the records without sending them
    Translate {
        /// CSV file to translate
        csv: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Records may go to stdout, so logs go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Import { files, output } => {
            commands::import::run(&cli.config, &files, output.as_deref()).await?;
        }
        Commands::Translate { csv } => {
            commands::translate::run(&cli.config, &csv).await?;
        }
    }

    Ok(())
}
