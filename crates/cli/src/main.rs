//! Cloud Cost Optimizer CLI
//!
//! Generates and relabels training data locally, and drives the optimizer
//! service to analyze usage reports and render Terraform.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analyze, dataset};
use optimizer_lib::generator::{DEFAULT_ROWS, DEFAULT_SEED};
use output::{print_warning, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Cloud Cost Optimizer CLI
#[derive(Parser)]
#[command(name = "coopt")]
#[command(author, version, about = "CLI for the Cloud Cost Optimizer", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via COOPT_API_URL env var)
    #[arg(long, env = "COOPT_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a labeled synthetic training dataset
    Generate {
        /// Number of rows to generate
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,

        /// Random seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Output CSV path
        #[arg(long, short, default_value = "aws_usage_data.csv")]
        output: PathBuf,
    },

    /// Label a training CSV with the labeling policy
    Label {
        /// Input CSV in the training schema
        input: PathBuf,

        /// Output CSV path (defaults to <input>_labeled.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Replace existing labels that disagree with the policy
        #[arg(long)]
        force: bool,
    },

    /// Upload a usage report and show recommendations
    Analyze {
        /// Usage report CSV
        file: PathBuf,
    },

    /// Analyze a usage report and render Terraform for the recommendations
    Terraform {
        /// Usage report CSV
        file: PathBuf,

        /// Write the script to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Check that the optimizer service is reachable
    Health,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::Config::load()?;
    let format = match (cli.format, config.default_format.as_deref()) {
        (Some(format), _) => format,
        (None, Some(name)) => OutputFormat::from_config(name).unwrap_or_else(|| {
            print_warning(&format!("Unknown default_format '{}' in config, using table", name));
            OutputFormat::Table
        }),
        (None, None) => OutputFormat::Table,
    };

    match cli.command {
        Commands::Generate { rows, seed, output } => {
            dataset::generate(rows, seed, &output, format)?;
        }
        Commands::Label { input, output, force } => {
            dataset::label(&input, output, force, format)?;
        }
        Commands::Analyze { file } => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            analyze::analyze(&client, &file, format).await?;
        }
        Commands::Terraform { file, output } => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            analyze::terraform(&client, &file, output.as_deref()).await?;
        }
        Commands::Health => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            analyze::health(&client, format).await?;
        }
    }

    Ok(())
}
