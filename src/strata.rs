//! Stratification selection
//!
//! Decides, per table, which categorical columns rows are grouped by.
//!
//! Two modes:
//! - **Requested**: each requested column must exist and be categorical,
//!   optionally all survivors are merged into one `A__B` column, and any
//!   column with more factors than the cap is dropped
//! - **Dummy**: nothing requested, every table gets a constant
//!   `no_stratification` column and a single group
//!
//! Every rejection is recorded in the [`DiagnosticsLog`]. A table whose
//! requested columns are all rejected gets an empty list and is skipped
//! downstream.

use crate::diagnostics::{DiagnosticsLog, LogEntry};
use crate::storage::{MetadataTable, SAMPLE_NAME};
use crate::{Config, Result};
use arrow::array::{Array, StringArray};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name and constant value of the dummy stratification column
pub const NO_STRATIFICATION: &str = "no_stratification";

/// Delimiter joining merged column names and values
pub const MERGE_DELIMITER: &str = "__";

/// Stand-in for a missing value inside a merged value
pub const MERGE_MISSING: &str = "nan";

/// Choose the stratification columns of one table
///
/// May add a merged or dummy column to `table`.
///
/// # Errors
/// Returns error if a synthesized column cannot be added, or a candidate
/// column is not stored as text
pub fn select_strata(
    table: &mut MetadataTable,
    categorical: &[String],
    config: &Config,
    log: &mut DiagnosticsLog,
) -> Result<Vec<String>> {
    if config.stratify().is_empty() {
        add_dummy_strata(table)?;
        return Ok(vec![NO_STRATIFICATION.to_string()]);
    }

    let candidates = possible_strata(table, categorical, config.stratify(), log);
    if candidates.is_empty() {
        warn!(path = %table.path(), "no requested stratification column is usable");
        return Ok(Vec::new());
    }

    let candidates = if config.merge() {
        vec![merge_columns(table, &candidates)?]
    } else {
        candidates
    };

    let mut strata = Vec::with_capacity(candidates.len());
    for column in candidates {
        let factors = count_factors(table, &column)?;
        if factors > config.max_strata() {
            log.push(LogEntry::too_many_factors(&column, table.path(), factors));
            continue;
        }
        debug!(path = %table.path(), %column, factors, "stratifying");
        strata.push(column);
    }

    if strata.is_empty() {
        warn!(path = %table.path(), "every stratification column exceeds the factor cap");
    }
    Ok(strata)
}

/// Keep the requested columns that exist and are categorical
///
/// Rejections are logged as `not in` or `not categorical`. The
/// `sample_name` row key is not a variable and is always `not in`.
pub fn possible_strata(
    table: &MetadataTable,
    categorical: &[String],
    requested: &[String],
    log: &mut DiagnosticsLog,
) -> Vec<String> {
    let mut candidates = Vec::new();
    for column in requested {
        if column == SAMPLE_NAME || !table.has_column(column) {
            log.push(LogEntry::not_in(column, table.path()));
        } else if !categorical.contains(column) {
            log.push(LogEntry::not_categorical(column, table.path()));
        } else {
            candidates.push(column.clone());
        }
    }
    candidates
}

/// Join several columns into one, row by row
///
/// The new column is named after the joined column names; missing values
/// become `nan` before joining. Returns the new column name.
///
/// # Errors
/// Returns error if a column is absent or not stored as text
pub fn merge_columns(table: &mut MetadataTable, columns: &[String]) -> Result<String> {
    let name = columns.join(MERGE_DELIMITER);

    let sources = columns
        .iter()
        .map(|column| table.string_column(column))
        .collect::<Result<Vec<&StringArray>>>()?;
    let merged: StringArray = (0..table.num_rows())
        .map(|row| {
            let parts: Vec<&str> = sources
                .iter()
                .map(|source| {
                    if source.is_null(row) {
                        MERGE_MISSING
                    } else {
                        source.value(row)
                    }
                })
                .collect();
            Some(parts.join(MERGE_DELIMITER))
        })
        .collect();

    table.set_column(&name, Arc::new(merged))?;
    Ok(name)
}

/// Add the constant `no_stratification` column
///
/// # Errors
/// Returns error if the column cannot be added
pub fn add_dummy_strata(table: &mut MetadataTable) -> Result<()> {
    let constant = StringArray::from(vec![NO_STRATIFICATION; table.num_rows()]);
    table.set_column(NO_STRATIFICATION, Arc::new(constant))
}

/// Number of distinct non-missing values of a text column
///
/// # Errors
/// Returns error if the column is absent or not stored as text
pub fn count_factors(table: &MetadataTable, column: &str) -> Result<usize> {
    let values = table.string_column(column)?;
    let distinct: FxHashSet<&str> = values.iter().flatten().collect();
    Ok(distinct.len())
}
