//! Distribution summaries per stratification group
//!
//! For one table and one stratification column, every group (distinct
//! value) yields a tidy [`FigureTable`]: one row per (sample, numeric
//! variable) carrying the raw value next to that variable's group-level
//! median and skewness. Groups larger than the requested sample count are
//! subsampled without replacement; smaller ones are kept whole and logged.

pub mod stats;

use crate::diagnostics::{DiagnosticsLog, LogEntry};
use crate::storage::MetadataTable;
use crate::{Error, Result};
use arrow::array::{Array, Float64Array, StringArray};
use arrow::compute;
use arrow::datatypes::DataType;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One (sample, variable) observation of a group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureRow {
    /// Sample identity
    pub sample_name: String,
    /// Numeric variable name
    pub variable: String,
    /// Raw value (`None` when missing)
    pub value: Option<f64>,
    /// Median of the variable within the group
    pub median: f64,
    /// Skewness of the variable within the group
    pub skewness: f64,
}

/// Tidy long-form table of one group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FigureTable {
    rows: Vec<FigureRow>,
}

impl FigureTable {
    /// Wrap rows
    #[must_use]
    pub const fn new(rows: Vec<FigureRow>) -> Self {
        Self { rows }
    }

    /// Rows, variable-major
    #[must_use]
    pub fn rows(&self) -> &[FigureRow] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there is no row
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct sample names in first-seen order
    #[must_use]
    pub fn sample_names(&self) -> Vec<&str> {
        distinct_in_order(self.rows.iter().map(|r| r.sample_name.as_str()))
    }

    /// Distinct variable names in first-seen order
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        distinct_in_order(self.rows.iter().map(|r| r.variable.as_str()))
    }
}

fn distinct_in_order<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = FxHashSet::default();
    items.filter(|item| seen.insert(*item)).collect()
}

/// Figure of one (table, stratification column, group) combination
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFigure {
    /// Metadata file path
    pub table_path: String,
    /// Stratification column
    pub strata: String,
    /// Group value
    pub group: String,
    /// Tidy data for the group
    pub figure: FigureTable,
}

impl GroupFigure {
    /// Title lines: table path, stratification column, group value
    #[must_use]
    pub fn title(&self) -> [&str; 3] {
        [&self.table_path, &self.strata, &self.group]
    }
}

/// Row indices of each group of a text column, groups in ascending order
///
/// Missing values belong to no group.
///
/// # Errors
/// Returns error if the column is absent or not stored as text
pub fn group_rows(table: &MetadataTable, strata: &str) -> Result<BTreeMap<String, Vec<usize>>> {
    let values = table.string_column(strata)?;
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, value) in values.iter().enumerate() {
        if let Some(value) = value {
            groups.entry(value.to_string()).or_default().push(row);
        }
    }
    Ok(groups)
}

/// Numeric column widened to Float64
fn float_column(table: &MetadataTable, variable: &str) -> Result<Float64Array> {
    let column = table
        .column(variable)
        .ok_or_else(|| Error::InvalidInput(format!("Column not found: {variable}")))?;
    let cast = compute::cast(column, &DataType::Float64)?;
    cast.as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))
}

fn float_columns<'a>(
    table: &MetadataTable,
    numeric: &'a [String],
) -> Result<Vec<(&'a str, Float64Array)>> {
    numeric
        .iter()
        .map(|variable| float_column(table, variable).map(|values| (variable.as_str(), values)))
        .collect()
}

/// Tidy table of the given rows over the numeric columns
///
/// # Errors
/// Returns error if a numeric column is absent or cannot be widened
pub fn summarize_group(
    table: &MetadataTable,
    rows: &[usize],
    numeric: &[String],
) -> Result<FigureTable> {
    let samples = table.sample_names()?;
    let columns = float_columns(table, numeric)?;
    Ok(tidy_rows(samples, &columns, rows))
}

fn tidy_rows(
    samples: &StringArray,
    columns: &[(&str, Float64Array)],
    rows: &[usize],
) -> FigureTable {
    let mut figure = Vec::with_capacity(columns.len() * rows.len());
    for (variable, values) in columns {
        let group_values: Vec<Option<f64>> = rows
            .iter()
            .map(|&row| {
                if values.is_null(row) || values.value(row).is_nan() {
                    None
                } else {
                    Some(values.value(row))
                }
            })
            .collect();
        let present: Vec<f64> = group_values.iter().flatten().copied().collect();
        let median = stats::nan_median(&present);
        let skewness = stats::nan_skewness(&present);

        for (&row, value) in rows.iter().zip(group_values) {
            figure.push(FigureRow {
                sample_name: samples.value(row).to_string(),
                variable: (*variable).to_string(),
                value,
                median,
                skewness,
            });
        }
    }
    FigureTable::new(figure)
}

/// Distinct sample names of the given rows, in row order
///
/// # Errors
/// Returns error if the identity column is not Utf8
pub fn group_samples(table: &MetadataTable, rows: &[usize]) -> Result<Vec<String>> {
    let names = table.sample_names()?;
    let samples = distinct_in_order(rows.iter().map(|&row| names.value(row)));
    Ok(samples.into_iter().map(str::to_string).collect())
}

/// Keep `number_of_samples` random samples of a group
///
/// `samples` are the distinct samples of the group. Groups with fewer of
/// them are kept whole and logged as `not enough samples` with their sample
/// count.
pub fn subsample<R: Rng + ?Sized>(
    figure: FigureTable,
    samples: &[String],
    number_of_samples: usize,
    rng: &mut R,
    table_path: &str,
    group: &str,
    log: &mut DiagnosticsLog,
) -> FigureTable {
    if samples.len() < number_of_samples {
        log.push(LogEntry::not_enough_samples(group, table_path, samples.len()));
        return figure;
    }

    let chosen: FxHashSet<&str> = rand::seq::index::sample(rng, samples.len(), number_of_samples)
        .into_iter()
        .map(|index| samples[index].as_str())
        .collect();
    let rows = figure
        .rows
        .into_iter()
        .filter(|row| chosen.contains(row.sample_name.as_str()))
        .collect();
    FigureTable::new(rows)
}

/// Figures for every group of one stratification column
///
/// # Errors
/// Returns error if the stratification column is not text or a numeric
/// column cannot be widened
pub fn summarize_strata<R: Rng + ?Sized>(
    table: &MetadataTable,
    strata: &str,
    numeric: &[String],
    number_of_samples: usize,
    rng: &mut R,
    log: &mut DiagnosticsLog,
) -> Result<Vec<GroupFigure>> {
    let samples = table.sample_names()?;
    let columns = float_columns(table, numeric)?;

    let mut figures = Vec::new();
    for (group, rows) in group_rows(table, strata)? {
        let figure = tidy_rows(samples, &columns, &rows);
        let members = group_samples(table, &rows)?;
        let figure = subsample(
            figure,
            &members,
            number_of_samples,
            rng,
            table.path(),
            &group,
            log,
        );
        debug!(
            path = %table.path(),
            %strata,
            %group,
            rows = figure.len(),
            "summarized group"
        );
        figures.push(GroupFigure {
            table_path: table.path().to_string(),
            strata: strata.to_string(),
            group,
            figure,
        });
    }
    Ok(figures)
}
