//! Diagnostics log
//!
//! Recoverable problems (a requested column missing from a table, a column
//! that is not categorical, too many factors, a small group) are appended
//! here by each stage instead of aborting the run. The log is rendered once,
//! at the very end, grouped by warning kind and then by table.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Kind of a recoverable problem
///
/// Variant order is the order kinds appear in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Requested stratification column is not categorical
    NotCategorical,
    /// Group holds fewer samples than requested
    NotEnoughSamples,
    /// Requested stratification column is absent from the table
    NotIn,
    /// Stratification column has more factors than allowed
    TooManyFactors,
}

impl WarningKind {
    /// Section header used in the report
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotCategorical => "not categorical",
            Self::NotEnoughSamples => "not enough samples",
            Self::NotIn => "not in",
            Self::TooManyFactors => "too many factors",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One recoverable problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    subject: String,
    table_path: String,
    kind: WarningKind,
    number: Option<usize>,
}

impl LogEntry {
    /// Create an entry
    ///
    /// # Arguments
    ///
    /// * `subject` - Column name, or group value for [`WarningKind::NotEnoughSamples`]
    /// * `table_path` - Metadata file the problem belongs to
    /// * `kind` - Warning kind
    /// * `number` - Factor or sample count, when the kind carries one
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        table_path: impl Into<String>,
        kind: WarningKind,
        number: Option<usize>,
    ) -> Self {
        Self {
            subject: subject.into(),
            table_path: table_path.into(),
            kind,
            number,
        }
    }

    /// Requested column absent from the table
    #[must_use]
    pub fn not_in(column: impl Into<String>, table_path: impl Into<String>) -> Self {
        Self::new(column, table_path, WarningKind::NotIn, None)
    }

    /// Requested column present but not categorical
    #[must_use]
    pub fn not_categorical(column: impl Into<String>, table_path: impl Into<String>) -> Self {
        Self::new(column, table_path, WarningKind::NotCategorical, None)
    }

    /// Column with more factors than the cap
    #[must_use]
    pub fn too_many_factors(
        column: impl Into<String>,
        table_path: impl Into<String>,
        factors: usize,
    ) -> Self {
        Self::new(column, table_path, WarningKind::TooManyFactors, Some(factors))
    }

    /// Group with fewer samples than requested
    #[must_use]
    pub fn not_enough_samples(
        group: impl Into<String>,
        table_path: impl Into<String>,
        samples: usize,
    ) -> Self {
        Self::new(group, table_path, WarningKind::NotEnoughSamples, Some(samples))
    }

    /// Column name or group value
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Metadata file path
    #[must_use]
    pub fn table_path(&self) -> &str {
        &self.table_path
    }

    /// Warning kind
    #[must_use]
    pub const fn kind(&self) -> WarningKind {
        self.kind
    }

    /// Attached count, if any
    #[must_use]
    pub const fn number(&self) -> Option<usize> {
        self.number
    }
}

/// Append-only collection of [`LogEntry`] values for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsLog {
    entries: Vec<LogEntry>,
}

impl DiagnosticsLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Entries in the order they were recorded
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one kind, in recording order
    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Human-readable report, grouped by kind and then by table path
    ///
    /// Returns an empty string when the log is empty. `max_strata` is quoted
    /// in the too-many-factors lines.
    #[must_use]
    pub fn report(&self, max_strata: usize) -> String {
        let mut grouped: BTreeMap<WarningKind, BTreeMap<&str, Vec<&LogEntry>>> = BTreeMap::new();
        for entry in &self.entries {
            grouped
                .entry(entry.kind)
                .or_default()
                .entry(entry.table_path.as_str())
                .or_default()
                .push(entry);
        }

        let mut out = String::new();
        for (kind, tables) in grouped {
            let _ = writeln!(out, "[{kind}]");
            for (path, entries) in tables {
                let _ = writeln!(out, "{path}");
                match kind {
                    WarningKind::TooManyFactors => {
                        for entry in entries {
                            let _ = writeln!(
                                out,
                                " - variable {} has {} factor(s) (max {max_strata} [option \"-s\"])",
                                entry.subject,
                                display_number(entry.number)
                            );
                        }
                    }
                    WarningKind::NotEnoughSamples => {
                        for entry in entries {
                            let _ = writeln!(
                                out,
                                " - {} samples for factor {}",
                                display_number(entry.number),
                                entry.subject
                            );
                        }
                    }
                    WarningKind::NotCategorical | WarningKind::NotIn => {
                        let mut seen: Vec<&str> = Vec::new();
                        for entry in entries {
                            if !seen.contains(&entry.subject.as_str()) {
                                seen.push(&entry.subject);
                                let _ = writeln!(out, " - {}", entry.subject);
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

fn display_number(number: Option<usize>) -> String {
    number.map_or_else(|| "nan".to_string(), |n| n.to_string())
}

impl Extend<LogEntry> for DiagnosticsLog {
    fn extend<I: IntoIterator<Item = LogEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
