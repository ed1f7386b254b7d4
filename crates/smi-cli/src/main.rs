//! rsmitst - conformance tests for SMI libraries

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use smi_core::{BackendKind, LoggingConfig, SuiteConfig, Verbosity};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use output::{OutputFormat, OutputFormatter};

/// Conformance tests for SMI libraries
#[derive(Debug, Parser)]
#[command(name = "rsmitst")]
#[command(about = "Conformance tests for SMI libraries")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SMI library backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Path to the ROCm SMI shared library
    #[arg(long, value_name = "PATH")]
    library: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Enable JSON output (overrides --output)
    #[arg(long)]
    json: bool,

    /// Log level or filter directive
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Rocm,
    Mock,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Rocm => BackendKind::Rocm,
            BackendArg::Mock => BackendKind::Mock,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the conformance suite
    Run {
        /// Number of passes over the devices
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Transcript verbosity (0 = failures only, 1 = values, 2 = progress)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=2))]
        verbosity: Option<u8>,

        /// Device indices to test (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        devices: Option<Vec<u32>>,

        /// Only run cases whose name contains this string
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List the available test cases
    List,

    /// List monitored devices
    Devices,

    /// Show power readings for each device
    Power {
        /// Device indices to read (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        devices: Option<Vec<u32>>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_logging(&config.logging);
    debug!("Starting rsmitst with config: {:?}", config);

    let output_format = if cli.json {
        OutputFormat::Json
    } else {
        cli.output
    };
    let formatter = OutputFormatter::new(output_format);

    match cli.command {
        Commands::Run { .. } => commands::run::run_suite(&config, &formatter)?,
        Commands::List => commands::list::list_cases(&formatter)?,
        Commands::Devices => commands::devices::list_devices(&config, &formatter)?,
        Commands::Power { .. } => commands::devices::show_power(&config, &formatter)?,
    }

    Ok(())
}

/// Layer command-line overrides on top of file and environment settings
fn load_config(cli: &Cli) -> Result<SuiteConfig> {
    let mut config = match &cli.config {
        Some(path) => SuiteConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SuiteConfig::load().context("Failed to load configuration")?,
    };

    if let Some(backend) = cli.backend {
        config.backend.kind = backend.into();
    }
    if let Some(library) = &cli.library {
        config.backend.library_path = Some(library.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    match &cli.command {
        Commands::Run {
            iterations,
            verbosity,
            devices,
            filter,
        } => {
            if let Some(iterations) = iterations {
                config.run.iterations = *iterations;
            }
            if let Some(level) = verbosity {
                config.run.verbosity = Verbosity::try_from(*level)?;
            }
            if let Some(devices) = devices {
                config.run.devices = Some(devices.clone());
            }
            if let Some(filter) = filter {
                config.run.filter = Some(filter.clone());
            }
        }
        Commands::Power {
            devices: Some(devices),
        } => {
            config.run.devices = Some(devices.clone());
        }
        _ => {}
    }

    config.validate()?;
    Ok(config)
}

/// Logs go to stderr; stdout carries the transcript and reports
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if logging.is_json() {
        builder.json().init();
    } else {
        builder.init();
    }
}
