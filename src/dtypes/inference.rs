//! Dtype inference over messy metadata columns
//!
//! The initial pass trusts native Int64/Float64 storage and otherwise
//! classifies the distinct values of a Utf8 column. The resolution pass
//! settles ambiguous columns and rewrites numeric text columns as Float64,
//! turning missing markers into nulls.
//!
//! Inference never fails on unparsable values: they only route a column
//! into the categorical bucket.

use super::{Dtype, InitialDtype, TableDtypes};
use crate::storage::MetadataTable;
use crate::Result;
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::debug;

/// Text tokens treated as missing values during inference
pub const MISSING_MARKERS: [&str; 12] = [
    "Unknown",
    "unknown",
    "Unspecified",
    "unspecified",
    "not provided",
    "Not provided",
    "Not Provided",
    "not applicable",
    "Not applicable",
    "Not Applicable",
    "Missing",
    "missing",
];

/// Tokens flagging a boolean-like column
///
/// `Falsw` is matched literally; `False` is plain text and makes a column
/// categorical on its own.
pub const BOOLEAN_LIKE_TOKENS: [&str; 2] = ["True", "Falsw"];

/// Whether a value is one of the [`MISSING_MARKERS`]
#[must_use]
pub fn is_missing_marker(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

fn parses_as_float(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

/// Classify a column from its realized values (`None` is a true missing value)
pub fn classify_values<'a, I>(values: I) -> InitialDtype
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let distinct: FxHashSet<Option<&str>> = values.into_iter().collect();

    let mut has_missing = false;
    let mut has_boolean_like = false;
    let mut has_float = false;
    let mut has_non_float = false;
    for value in distinct {
        match value {
            None => has_missing = true,
            Some(v) if is_missing_marker(v) => has_missing = true,
            Some(v) if BOOLEAN_LIKE_TOKENS.contains(&v) => has_boolean_like = true,
            Some(v) if parses_as_float(v) => has_float = true,
            Some(_) => has_non_float = true,
        }
    }

    if has_non_float {
        if has_float || has_missing {
            InitialDtype::AmbiguousPendingResolution
        } else {
            InitialDtype::Categorical
        }
    } else if has_boolean_like {
        InitialDtype::Categorical
    } else {
        InitialDtype::Float
    }
}

/// Initial classification of one column
#[must_use]
pub fn initial_dtype(column: &ArrayRef) -> InitialDtype {
    let data_type = column.data_type();
    if data_type.is_integer() {
        return InitialDtype::Int;
    }
    if data_type.is_floating() {
        return InitialDtype::Float;
    }
    column
        .as_any()
        .downcast_ref::<StringArray>()
        .map_or(InitialDtype::Categorical, |strings| {
            classify_values(strings.iter())
        })
}

/// Whether every present, non-marker value of a text column is a number
fn all_numeric_after_markers(strings: &StringArray) -> bool {
    let distinct: FxHashSet<&str> = strings
        .iter()
        .flatten()
        .filter(|v| !is_missing_marker(v))
        .collect();
    distinct.into_iter().all(parses_as_float)
}

/// Rewrite a numeric text column as Float64, markers becoming nulls
fn to_float_column(strings: &StringArray) -> Float64Array {
    strings
        .iter()
        .map(|value| {
            value
                .filter(|v| !is_missing_marker(v))
                .and_then(|v| v.trim().parse::<f64>().ok())
        })
        .collect()
}

/// Collapse initial classifications into resolved dtypes
///
/// Takes ownership of the table and hands it back with every text column
/// resolved to `float` rewritten as Float64.
///
/// # Errors
/// Returns error if a rewritten column cannot be stored back
pub fn resolve_dtypes(
    mut table: MetadataTable,
    initial: &[(String, InitialDtype)],
) -> Result<(MetadataTable, TableDtypes)> {
    let mut dtypes = TableDtypes::new();

    for (variable, initial_tag) in initial {
        let strings = table
            .column(variable)
            .and_then(|column| column.as_any().downcast_ref::<StringArray>())
            .cloned();

        let dtype = match (initial_tag, &strings) {
            (InitialDtype::Int, _) => Dtype::Int,
            (InitialDtype::Float, _) => Dtype::Float,
            (InitialDtype::Categorical, _) | (InitialDtype::AmbiguousPendingResolution, None) => {
                Dtype::Categorical
            }
            (InitialDtype::AmbiguousPendingResolution, Some(strings)) => {
                if all_numeric_after_markers(strings) {
                    Dtype::Float
                } else {
                    Dtype::Categorical
                }
            }
        };

        if let (Dtype::Float, Some(strings)) = (dtype, &strings) {
            table.set_column(variable, Arc::new(to_float_column(strings)))?;
        }

        debug!(path = %table.path(), %variable, ?initial_tag, %dtype, "resolved dtype");
        dtypes.insert(variable.clone(), dtype);
    }

    Ok((table, dtypes))
}

/// Infer the resolved dtype of every variable of a table
///
/// # Errors
/// Returns error if a rewritten column cannot be stored back
pub fn infer_dtypes(table: MetadataTable) -> Result<(MetadataTable, TableDtypes)> {
    let initial: Vec<(String, InitialDtype)> = table
        .variables()
        .into_iter()
        .filter_map(|variable| {
            let dtype = initial_dtype(table.column(&variable)?);
            Some((variable, dtype))
        })
        .collect();

    resolve_dtypes(table, &initial)
}

/// Infer dtypes for several tables, keeping input order
///
/// Tables are independent; with the `rayon` feature they are processed on
/// the rayon pool.
///
/// # Errors
/// Returns the first error met by any table
pub fn infer_tables(tables: Vec<MetadataTable>) -> Result<Vec<(MetadataTable, TableDtypes)>> {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        tables.into_par_iter().map(infer_dtypes).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        tables.into_iter().map(infer_dtypes).collect()
    }
}
