//! End-to-end run
//!
//! load -> infer dtypes -> split variables -> select strata -> summarize
//! groups -> render, accumulating recoverable problems in one
//! [`DiagnosticsLog`].

use crate::diagnostics::DiagnosticsLog;
use crate::dtypes::{infer_tables, split_variables_types, TableDtypes, VariableSplit};
use crate::render::Chart;
use crate::storage::MetadataTable;
use crate::strata::select_strata;
use crate::summary::{summarize_strata, GroupFigure};
use crate::{Config, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// A loaded table with its resolved dtypes
#[derive(Debug, Clone)]
pub struct PreparedTable {
    /// Table, with float-resolved text columns already rewritten
    pub table: MetadataTable,
    /// Resolved dtype of every variable
    pub dtypes: TableDtypes,
    /// Numeric and categorical variable names
    pub split: VariableSplit,
}

/// Identity of one chart row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChartKey {
    /// Metadata file path
    pub table_path: String,
    /// Stratification column
    pub strata: String,
    /// Group value
    pub group: String,
}

impl From<&GroupFigure> for ChartKey {
    fn from(figure: &GroupFigure) -> Self {
        Self {
            table_path: figure.table_path.clone(),
            strata: figure.strata.clone(),
            group: figure.group.clone(),
        }
    }
}

/// Outcome of [`run`]
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Every recoverable problem met during the run
    pub log: DiagnosticsLog,
    /// Chart rows, in rendering order
    pub rows: Vec<ChartKey>,
    /// Written HTML file, `None` when nothing was rendered
    pub output: Option<PathBuf>,
}

/// Load every metadata file and resolve its dtypes
///
/// # Errors
/// Returns error if any file cannot be read or parsed
pub fn prepare_tables(config: &Config) -> Result<Vec<PreparedTable>> {
    let tables = config
        .metadata_files()
        .iter()
        .map(MetadataTable::load)
        .collect::<Result<Vec<_>>>()?;

    let prepared = infer_tables(tables)?
        .into_iter()
        .map(|(table, dtypes)| {
            let split = split_variables_types(&dtypes);
            PreparedTable {
                table,
                dtypes,
                split,
            }
        })
        .collect();
    Ok(prepared)
}

/// Run the whole exploration and write the chart
///
/// # Errors
/// Returns error if a metadata file cannot be loaded or the chart cannot be
/// written. Problems with individual columns or groups are recorded in the
/// returned log instead.
pub fn run(config: &Config) -> Result<RunSummary> {
    let mut rng = config
        .seed()
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut summary = RunSummary::default();
    let mut chart = Chart::new();

    for prepared in prepare_tables(config)? {
        let PreparedTable {
            mut table, split, ..
        } = prepared;
        let strata = select_strata(&mut table, &split.categorical, config, &mut summary.log)?;

        for column in &strata {
            let figures = summarize_strata(
                &table,
                column,
                &split.numeric,
                config.number_of_samples(),
                &mut rng,
                &mut summary.log,
            )?;
            for figure in &figures {
                chart.push(figure);
                summary.rows.push(ChartKey::from(figure));
            }
        }
    }

    if chart.is_empty() {
        warn!("no stratification group to render, nothing written");
        return Ok(summary);
    }

    let output = config.output_path();
    chart.save(&output)?;
    info!(
        path = %output.display(),
        rows = summary.rows.len(),
        warnings = summary.log.len(),
        "run complete"
    );
    summary.output = Some(output);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;
    use std::fs;
    use tempfile::TempDir;

    const METADATA: &str = "\
#SampleID\tsex\tsite\tage\tph
s1\tmale\tgut\t10\t6.5
s2\tfemale\tgut\t20\t7.0
s3\tfemale\tskin\t30\tNA
s4\tmale\toral\t40\t5.5
";

    fn fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("md.tsv");
        fs::write(&path, METADATA).unwrap();
        path
    }

    #[test]
    fn test_prepare_tables_splits_variables() {
        let dir = TempDir::new().unwrap();
        let config = Config::builder(dir.path().join("out"))
            .metadata_file(fixture(&dir))
            .build()
            .unwrap();

        let prepared = prepare_tables(&config).unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].split.numeric, vec!["age", "ph"]);
        assert_eq!(prepared[0].split.categorical, vec!["sex", "site"]);
    }

    #[test]
    fn test_run_without_stratification() {
        let dir = TempDir::new().unwrap();
        let config = Config::builder(dir.path().join("plots").join("out"))
            .metadata_file(fixture(&dir))
            .number_of_samples(2)
            .seed(Some(3))
            .build()
            .unwrap();

        let summary = run(&config).unwrap();
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.rows[0].strata, "no_stratification");
        assert!(summary.log.is_empty());

        let output = summary.output.unwrap();
        assert!(output.ends_with("plots/out.html"));
        let html = fs::read_to_string(output).unwrap();
        assert!(html.contains("no_stratification"));
    }

    #[test]
    fn test_run_nothing_rendered() {
        let dir = TempDir::new().unwrap();
        let config = Config::builder(dir.path().join("out.html"))
            .metadata_file(fixture(&dir))
            .stratify(["country"])
            .build()
            .unwrap();

        let summary = run(&config).unwrap();
        assert!(summary.rows.is_empty());
        assert!(summary.output.is_none());
        assert!(!dir.path().join("out.html").exists());
        assert_eq!(summary.log.of_kind(WarningKind::NotIn).count(), 1);
    }
}
