use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use macroscope::TriageConfig;

pub mod analyze;
pub mod plugins;

#[derive(Parser)]
#[command(
    name = "macroscope",
    version = env!("CARGO_PKG_VERSION"),
    about = "Static malware triage for Office, PDF, RTF, HTML and OneNote documents"
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to <config dir>/macroscope/config.json)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze one or more documents
    Analyze(analyze::AnalyzeArgs),
    /// List the registered plugins
    Plugins,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        match self.command {
            Commands::Analyze(args) => {
                let config = load_config(self.config.as_deref())?;
                analyze::execute(args, &config)
            }
            Commands::Plugins => plugins::execute(),
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            _ => "trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `--config`, else the per-user config file when present, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<TriageConfig> {
    if let Some(path) = explicit {
        return macroscope::load_config(path)
            .with_context(|| format!("loading config {}", path.display()));
    }

    let user_config = dirs::config_dir()
        .map(|dir| dir.join("macroscope").join("config.json"))
        .filter(|path| path.is_file());

    match user_config {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using user config");
            macroscope::load_config(&path)
                .with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(TriageConfig::default()),
    }
}
