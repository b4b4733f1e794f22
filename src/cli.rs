//! Command-line surface
//!
//! Flags map 1:1 onto [`ConfigBuilder`](crate::ConfigBuilder). The
//! `--m-metadata-file` style long names are accepted as aliases.

use crate::config::{DEFAULT_MAX_STRATA, DEFAULT_NUMBER_OF_SAMPLES};
use crate::pipeline::{run, RunSummary};
use crate::Config;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

/// Explore the distributions of numeric metadata variables
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "xplor-distros")]
#[command(version)]
#[command(
    about = "Plot median, skewness and histograms of numeric metadata variables, per stratum"
)]
pub struct Cli {
    /// Metadata file(s) containing numeric variables (to plot) and
    /// categorical variables (to stratify)
    #[arg(short = 'm', long = "metadata-file", alias = "m-metadata-file", required = true)]
    pub metadata_files: Vec<PathBuf>,

    /// Categorical variables to use for stratification
    #[arg(short = 'p', long, alias = "p-stratify")]
    pub stratify: Vec<String>,

    /// Maximum number of factors of a stratification variable
    #[arg(short = 's', long, alias = "p-max-strata", default_value_t = DEFAULT_MAX_STRATA)]
    pub max_strata: usize,

    /// Number of samples to randomly select per stratum
    #[arg(
        short = 'n',
        long,
        alias = "p-number-of-samples",
        default_value_t = DEFAULT_NUMBER_OF_SAMPLES
    )]
    pub number_of_samples: usize,

    /// Output visualization file (`.html` appended when missing)
    #[arg(short = 'o', long, alias = "o-distributions")]
    pub distributions: PathBuf,

    /// Merge the stratification variables into one (e.g. `Male__Yes`)
    #[arg(long, overrides_with = "no_merge")]
    pub merge: bool,

    /// Stratify by each variable separately (default)
    #[arg(long, overrides_with = "merge")]
    pub no_merge: bool,

    /// Seed for the random subsampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Validated run configuration
    ///
    /// # Errors
    /// Returns error if the options are inconsistent
    pub fn config(&self) -> crate::Result<Config> {
        Config::builder(&self.distributions)
            .metadata_files(&self.metadata_files)
            .stratify(&self.stratify)
            .max_strata(self.max_strata)
            .number_of_samples(self.number_of_samples)
            .merge(self.merge && !self.no_merge)
            .seed(self.seed)
            .build()
    }

    /// Default log level for the flags given
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Parse arguments
///
/// # Errors
/// Returns the clap error for unknown or missing arguments
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Install the stderr `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the parsed command and print the diagnostics report
///
/// # Errors
/// Returns error if the configuration is invalid or the run fails
pub fn run_command(cli: &Cli) -> anyhow::Result<RunSummary> {
    let config = cli.config().context("invalid options")?;
    let summary = run(&config).with_context(|| {
        format!(
            "failed to explore distributions of {}",
            display_paths(config.metadata_files())
        )
    })?;

    if !summary.log.is_empty() {
        println!();
        print!("{}", summary.log.report(config.max_strata()));
    }
    if let Some(output) = &summary.output {
        if !cli.quiet {
            println!("Written: {}", output.display());
        }
    }
    Ok(summary)
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
