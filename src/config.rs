//! Run configuration
//!
//! A [`Config`] is built once per run through [`ConfigBuilder`] and is
//! read-only afterwards. The CLI maps its flags 1:1 onto the builder.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Default number of samples drawn per group
pub const DEFAULT_NUMBER_OF_SAMPLES: usize = 100;

/// Default cap on the number of factors of a stratification column
pub const DEFAULT_MAX_STRATA: usize = 20;

const HTML_EXTENSION: &str = "html";

/// Validated options for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    metadata_files: Vec<PathBuf>,
    stratify: Vec<String>,
    number_of_samples: usize,
    distributions: PathBuf,
    max_strata: usize,
    merge: bool,
    seed: Option<u64>,
}

impl Config {
    /// Create a builder writing the chart to `distributions`
    #[must_use]
    pub fn builder(distributions: impl Into<PathBuf>) -> ConfigBuilder {
        ConfigBuilder::new(distributions)
    }

    /// Metadata files to explore, in the order given
    #[must_use]
    pub fn metadata_files(&self) -> &[PathBuf] {
        &self.metadata_files
    }

    /// Requested stratification columns (empty means no stratification)
    #[must_use]
    pub fn stratify(&self) -> &[String] {
        &self.stratify
    }

    /// Target number of samples per group
    #[must_use]
    pub const fn number_of_samples(&self) -> usize {
        self.number_of_samples
    }

    /// Output path as given by the user
    #[must_use]
    pub fn distributions(&self) -> &Path {
        &self.distributions
    }

    /// Output path with the `.html` suffix appended when missing
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        let has_html = self
            .distributions
            .extension()
            .is_some_and(|ext| ext == HTML_EXTENSION);
        if has_html {
            self.distributions.clone()
        } else {
            let mut raw = self.distributions.clone().into_os_string();
            raw.push(".");
            raw.push(HTML_EXTENSION);
            PathBuf::from(raw)
        }
    }

    /// Maximum number of factors a stratification column may have
    #[must_use]
    pub const fn max_strata(&self) -> usize {
        self.max_strata
    }

    /// Whether the requested stratification columns are merged into one
    #[must_use]
    pub const fn merge(&self) -> bool {
        self.merge
    }

    /// Subsampling seed (`None` draws from OS entropy)
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }
}

/// Builder for [`Config`]
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    metadata_files: Vec<PathBuf>,
    stratify: Vec<String>,
    number_of_samples: usize,
    distributions: PathBuf,
    max_strata: usize,
    merge: bool,
    seed: Option<u64>,
}

impl ConfigBuilder {
    /// Create a builder with default options
    #[must_use]
    pub fn new(distributions: impl Into<PathBuf>) -> Self {
        Self {
            metadata_files: Vec::new(),
            stratify: Vec::new(),
            number_of_samples: DEFAULT_NUMBER_OF_SAMPLES,
            distributions: distributions.into(),
            max_strata: DEFAULT_MAX_STRATA,
            merge: false,
            seed: None,
        }
    }

    /// Add one metadata file
    #[must_use]
    pub fn metadata_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_files.push(path.into());
        self
    }

    /// Add several metadata files
    #[must_use]
    pub fn metadata_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.metadata_files.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Add requested stratification columns
    #[must_use]
    pub fn stratify<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stratify.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Set the target number of samples per group
    #[must_use]
    pub const fn number_of_samples(mut self, number_of_samples: usize) -> Self {
        self.number_of_samples = number_of_samples;
        self
    }

    /// Set the factor cap for stratification columns
    #[must_use]
    pub const fn max_strata(mut self, max_strata: usize) -> Self {
        self.max_strata = max_strata;
        self
    }

    /// Merge requested stratification columns into one
    #[must_use]
    pub const fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    /// Seed the subsampling
    #[must_use]
    pub const fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no metadata file was given, if the
    /// sample count is zero, or if the output path is empty
    pub fn build(self) -> Result<Config> {
        if self.metadata_files.is_empty() {
            return Err(Error::InvalidInput(
                "at least one metadata file is required".to_string(),
            ));
        }
        if self.number_of_samples == 0 {
            return Err(Error::InvalidInput(
                "number of samples must be greater than 0".to_string(),
            ));
        }
        if self.distributions.as_os_str().is_empty() {
            return Err(Error::InvalidInput(
                "output visualization path must not be empty".to_string(),
            ));
        }

        Ok(Config {
            metadata_files: self.metadata_files,
            stratify: self.stratify,
            number_of_samples: self.number_of_samples,
            distributions: self.distributions,
            max_strata: self.max_strata,
            merge: self.merge,
            seed: self.seed,
        })
    }
}
