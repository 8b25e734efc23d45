use std::collections::BTreeSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use macroscope::digest::sha256_file;
use macroscope::sanitize::safe_file_name;
use macroscope::{Pipeline, Report, TriageConfig};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Documents to analyze
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Also analyze every file in this directory
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Descend into subdirectories of --dir
    #[arg(long, requires = "dir")]
    pub walk: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Keep extracted artifacts in this directory instead of a temporary one
    #[arg(long, value_name = "DIR")]
    pub extract: Option<PathBuf>,

    /// Analyze extracted artifacts as well
    #[arg(short, long)]
    pub recursive: bool,

    /// Plugin to run (repeatable); defaults to the configured list
    #[arg(long = "plugin", value_name = "NAME")]
    pub plugins: Vec<String>,

    /// Disable colored text output
    #[arg(long)]
    pub no_color: bool,
}

pub fn execute(args: AnalyzeArgs, config: &TriageConfig) -> Result<()> {
    let inputs = collect_inputs(&args)?;
    if !inputs.iter().any(|path| path.is_file()) {
        bail!("no input file found");
    }

    let plugin_names: BTreeSet<String> = if args.plugins.is_empty() {
        config.plugins.iter().cloned().collect()
    } else {
        args.plugins.iter().cloned().collect()
    };
    let colored = !args.no_color && std::io::stdout().is_terminal();
    let pipeline = Pipeline::from_config(config);
    let batch = inputs.len() > 1;

    for (index, input) in inputs.iter().enumerate() {
        if index > 0 {
            println!();
        }

        // one output directory per session; a temp dir lives until printed
        let (report, _temp_dir) = match &args.extract {
            Some(root) => {
                let output_dir = if batch {
                    root.join(session_dir_name(index, input))
                } else {
                    root.clone()
                };
                let report = pipeline
                    .analyze_document(input, &plugin_names, args.recursive, &output_dir)
                    .with_context(|| format!("analyzing {}", input.display()))?;
                (report, None)
            }
            None => {
                let temp_dir = tempfile::Builder::new()
                    .prefix("macroscope-")
                    .tempdir()
                    .context("creating temporary extraction directory")?;
                let report = pipeline
                    .analyze_document(input, &plugin_names, args.recursive, temp_dir.path())
                    .with_context(|| format!("analyzing {}", input.display()))?;
                (report, Some(temp_dir))
            }
        };

        print_report(&report, args.format, colored)?;
        match sha256_file(input) {
            Ok(digest) => println!("SHA256: {}", digest),
            Err(e) => {
                tracing::debug!(error = %e, "digest unavailable");
                println!("SHA256: unavailable");
            }
        }
    }

    Ok(())
}

fn print_report(report: &Report, format: OutputFormat, colored: bool) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.to_text(colored)),
    }
    Ok(())
}

fn session_dir_name(index: usize, input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{:03}-{}", index + 1, safe_file_name(&name))
}

/// Positional files first, then the contents of `--dir` in sorted order.
fn collect_inputs(args: &AnalyzeArgs) -> Result<Vec<PathBuf>> {
    let mut inputs = args.files.clone();

    if let Some(dir) = &args.dir {
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }
        let max_depth = if args.walk { usize::MAX } else { 1 };
        let mut found: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(max_depth)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        inputs.extend(found);
    }

    Ok(inputs)
}
