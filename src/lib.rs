//! # Xplor-distros: distributions of numeric metadata variables
//!
//! Loads one or more sample metadata tables, infers which columns are
//! numeric and which are categorical, groups samples by categorical columns
//! and writes one interactive HTML chart of the median, skewness and
//! histogram of every numeric variable in every group.
//!
//! ## Pipeline
//!
//! - **Load**: tab-separated or Parquet file, first column renamed
//!   `sample_name`, all-missing columns dropped
//! - **Infer**: every variable resolved to `int`, `float` or `object`,
//!   tolerating stray missing-value markers in numeric columns
//! - **Stratify**: requested categorical columns validated, optionally
//!   merged, capped by number of factors
//! - **Summarize**: per group median and skewness, random subsampling
//! - **Render**: Vega-Lite chart rows stacked in one HTML page
//!
//! Recoverable problems never abort the run; they are collected in a
//! [`DiagnosticsLog`](diagnostics::DiagnosticsLog) and reported at the end.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use xplor_distros::Config;
//!
//! let config = Config::builder("distributions.html")
//!     .metadata_file("metadata.tsv")
//!     .stratify(["sex", "country"])
//!     .merge(true)
//!     .seed(Some(42))
//!     .build()?;
//!
//! let summary = xplor_distros::run(&config)?;
//! print!("{}", summary.log.report(config.max_strata()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dtypes;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod strata;
pub mod summary;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use pipeline::{run, RunSummary};
