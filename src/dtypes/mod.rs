//! Semantic dtypes of metadata variables
//!
//! Inference runs in two passes (see [`inference`]):
//! 1. Every variable gets an [`InitialDtype`], which may be
//!    [`InitialDtype::AmbiguousPendingResolution`] for numeric-looking columns
//!    polluted by stray text or gaps
//! 2. The resolution pass collapses each one to exactly one [`Dtype`]
//!
//! Only the resolved [`Dtype`] leaves this module.

pub mod inference;

use serde::Serialize;
use std::fmt;

pub use inference::{
    classify_values, infer_dtypes, infer_tables, initial_dtype, is_missing_marker, resolve_dtypes,
    BOOLEAN_LIKE_TOKENS, MISSING_MARKERS,
};

/// Classification produced by the initial pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitialDtype {
    /// Native integer storage
    Int,
    /// Native float storage, or every value parses as a number
    Float,
    /// Text
    Categorical,
    /// Numbers mixed with text or missing markers, decided in the resolution pass
    AmbiguousPendingResolution,
}

/// Resolved dtype of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    /// Integer values
    Int,
    /// Floating-point values (possibly with missing values)
    Float,
    /// Categorical values (`object`)
    #[serde(rename = "object")]
    Categorical,
}

impl Dtype {
    /// Whether the variable takes part in distribution summaries
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Categorical => "object",
        };
        f.write_str(name)
    }
}

/// Resolved dtypes of one table, in column order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDtypes {
    variables: Vec<(String, Dtype)>,
}

impl TableDtypes {
    /// Create an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dtype of a variable
    pub fn insert(&mut self, variable: impl Into<String>, dtype: Dtype) {
        self.variables.push((variable.into(), dtype));
    }

    /// Dtype of a variable
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<Dtype> {
        self.variables
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, dtype)| *dtype)
    }

    /// Iterate `(variable, dtype)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Dtype)> {
        self.variables.iter().map(|(name, dtype)| (name.as_str(), *dtype))
    }

    /// Number of typed variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether no variable was typed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl FromIterator<(String, Dtype)> for TableDtypes {
    fn from_iter<I: IntoIterator<Item = (String, Dtype)>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().collect(),
        }
    }
}

/// Variables of one table split by role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSplit {
    /// `int` and `float` variables
    pub numeric: Vec<String>,
    /// `object` variables
    pub categorical: Vec<String>,
}

/// Partition a table's dtypes into numeric and categorical variable names
///
/// Order follows the columns; every variable lands in exactly one list.
#[must_use]
pub fn split_variables_types(dtypes: &TableDtypes) -> VariableSplit {
    let mut split = VariableSplit::default();
    for (variable, dtype) in dtypes.iter() {
        if dtype.is_numeric() {
            split.numeric.push(variable.to_string());
        } else {
            split.categorical.push(variable.to_string());
        }
    }
    split
}
