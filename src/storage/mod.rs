//! Metadata table storage (Arrow)
//!
//! Every metadata file becomes one [`MetadataTable`]: an Arrow
//! [`RecordBatch`] whose first column is the `sample_name` identity,
//! tagged with the path it was read from.
//!
//! Loading rules:
//! - Tab-separated files (header row required) or Parquet files
//! - The first column, by position, is renamed `sample_name`
//! - Columns holding no value at all are dropped
//! - Native storage is Int64 (every value an integer), Float64 (every present
//!   value a number) or Utf8 (anything else)

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Name given to the first column of every metadata table
pub const SAMPLE_NAME: &str = "sample_name";

/// Tokens read as missing values when a delimited file is loaded
pub const LOAD_MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One metadata table, keyed by sample name
#[derive(Debug, Clone)]
pub struct MetadataTable {
    path: String,
    batch: RecordBatch,
}

impl MetadataTable {
    /// Wrap an existing batch
    ///
    /// # Errors
    /// Returns error if the first column is not a Utf8 `sample_name` column
    pub fn new(path: impl Into<String>, batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let first = schema.fields().first().ok_or_else(|| {
            Error::StorageError("Metadata table has no columns".to_string())
        })?;
        if first.name() != SAMPLE_NAME || first.data_type() != &DataType::Utf8 {
            return Err(Error::StorageError(format!(
                "First column must be a Utf8 `{SAMPLE_NAME}` column, got `{}` ({:?})",
                first.name(),
                first.data_type()
            )));
        }

        Ok(Self {
            path: path.into(),
            batch,
        })
    }

    /// Build a table from sample names and already-typed variable columns
    ///
    /// Handy for tests and for callers that assemble tables in memory.
    ///
    /// # Errors
    /// Returns error if column lengths disagree
    pub fn from_columns(
        path: impl Into<String>,
        sample_names: &[&str],
        columns: Vec<(&str, ArrayRef)>,
    ) -> Result<Self> {
        let mut fields = vec![Field::new(SAMPLE_NAME, DataType::Utf8, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(sample_names.to_vec()))];
        for (name, array) in columns {
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Self::new(path, batch)
    }

    /// Load a metadata file, choosing the reader from the extension
    ///
    /// `.parquet` files go through the Parquet reader, everything else is
    /// read as tab-separated text.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_parquet = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

        let table = if is_parquet {
            Self::load_parquet(path)?
        } else {
            Self::load_tsv(path)?
        };

        info!(
            path = %table.path,
            rows = table.num_rows(),
            variables = table.batch.num_columns() - 1,
            "loaded metadata table"
        );
        Ok(table)
    }

    /// Load a tab-separated metadata file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or is malformed
    pub fn load_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::StorageError(format!(
                "Failed to open metadata file {}: {e}",
                path.display()
            ))
        })?;

        Self::read_tsv(path.display().to_string(), file)
    }

    /// Read tab-separated metadata from any reader
    ///
    /// # Errors
    /// Returns error if the header is missing or a row is ragged
    pub fn read_tsv<R: Read>(path: impl Into<String>, reader: R) -> Result<Self> {
        let path = path.into();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(Error::StorageError(format!(
                "Metadata file {path} has no header row"
            )));
        }
        let headers = dedup_headers(headers);

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (index, field) in record.iter().enumerate() {
                let cell = if index == 0 || !is_load_missing(field) {
                    Some(field.to_string())
                } else {
                    None
                };
                cells[index].push(cell);
            }
        }

        let mut fields = Vec::with_capacity(headers.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(headers.len());
        let mut dropped = 0usize;
        for (index, (name, values)) in headers.into_iter().zip(cells).enumerate() {
            if index == 0 {
                let samples: StringArray = values.iter().map(Option::as_deref).collect();
                fields.push(Field::new(SAMPLE_NAME, DataType::Utf8, false));
                arrays.push(Arc::new(samples));
                continue;
            }
            match native_column(&values) {
                Some(array) => {
                    fields.push(Field::new(name, array.data_type().clone(), true));
                    arrays.push(array);
                }
                None => {
                    debug!(path = %path, column = %name, "dropping all-missing column");
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            info!(path = %path, dropped, "dropped all-missing columns");
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Self::new(path, batch)
    }

    /// Load a Parquet metadata file
    ///
    /// Integer columns become Int64 (Float64 if they hold nulls), float
    /// columns Float64, booleans `True`/`False` strings, anything else Utf8.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::StorageError(format!(
                "Failed to open Parquet file {}: {e}",
                path.display()
            ))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        // Read all batches into memory
        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }
        let combined = compute::concat_batches(&schema, &batches)?;

        Self::normalize(path.display().to_string(), &combined)
    }

    /// Bring an arbitrary batch onto the metadata table conventions
    fn normalize(path: String, batch: &RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        if schema.fields().is_empty() {
            return Err(Error::StorageError(format!(
                "Metadata file {path} has no columns"
            )));
        }

        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        for (index, field) in schema.fields().iter().enumerate() {
            let column = batch.column(index);
            if index == 0 {
                fields.push(Field::new(SAMPLE_NAME, DataType::Utf8, false));
                arrays.push(compute::cast(column, &DataType::Utf8)?);
                continue;
            }
            if column.null_count() == column.len() {
                debug!(path = %path, column = %field.name(), "dropping all-missing column");
                continue;
            }
            let array = normalize_array(column)?;
            fields.push(Field::new(field.name(), array.data_type().clone(), true));
            arrays.push(array);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Self::new(path, batch)
    }

    /// Path of the source file
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of samples (rows)
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Sample identities, one per row
    ///
    /// # Errors
    /// Returns error if the identity column is not Utf8
    pub fn sample_names(&self) -> Result<&StringArray> {
        self.string_column(SAMPLE_NAME)
    }

    /// Variable names (every column but `sample_name`), in file order
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .skip(1)
            .map(|f| f.name().clone())
            .collect()
    }

    /// Whether the table has a column with this name
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    /// Column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Utf8 column by name
    ///
    /// # Errors
    /// Returns error if the column is absent or not Utf8
    pub fn string_column(&self, name: &str) -> Result<&StringArray> {
        self.column(name)
            .ok_or_else(|| Error::InvalidInput(format!("Column not found: {name}")))?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                Error::InvalidInput(format!("Column `{name}` is not a string column"))
            })
    }

    /// Replace a column in place, or append it when absent
    ///
    /// # Errors
    /// Returns error if the array length differs from the row count
    pub fn set_column(&mut self, name: &str, array: ArrayRef) -> Result<()> {
        let schema = self.batch.schema();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut arrays: Vec<ArrayRef> = self.batch.columns().to_vec();
        let field = Field::new(name, array.data_type().clone(), true);

        match schema.index_of(name) {
            Ok(0) => {
                return Err(Error::InvalidInput(format!(
                    "Refusing to overwrite the `{SAMPLE_NAME}` column"
                )))
            }
            Ok(index) => {
                fields[index] = field;
                arrays[index] = array;
            }
            Err(_) => {
                fields.push(field);
                arrays.push(array);
            }
        }

        self.batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(())
    }
}

/// Whether a raw delimited cell counts as missing at load time
#[must_use]
pub fn is_load_missing(cell: &str) -> bool {
    LOAD_MISSING_TOKENS.contains(&cell)
}

/// Suffix repeated header names with `.1`, `.2`, ...
fn dedup_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    headers
        .into_iter()
        .map(|name| {
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect()
}

/// Pick the native storage type of a loaded column; `None` if all missing
fn native_column(values: &[Option<String>]) -> Option<ArrayRef> {
    if values.iter().all(Option::is_none) {
        return None;
    }

    let all_int = values
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| s.trim().parse::<i64>().is_ok()));
    if all_int {
        let ints: Int64Array = values
            .iter()
            .map(|v| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok()))
            .collect();
        return Some(Arc::new(ints));
    }

    let all_float = values
        .iter()
        .flatten()
        .all(|s| s.trim().parse::<f64>().is_ok());
    if all_float {
        let floats: Float64Array = values
            .iter()
            .map(|v| v.as_deref().and_then(|s| s.trim().parse::<f64>().ok()))
            .collect();
        return Some(Arc::new(floats));
    }

    let strings: StringArray = values.iter().map(Option::as_deref).collect();
    Some(Arc::new(strings))
}

/// Map a Parquet column onto Int64 / Float64 / Utf8
fn normalize_array(column: &ArrayRef) -> Result<ArrayRef> {
    let data_type = column.data_type();
    let array = if data_type.is_integer() {
        if column.null_count() == 0 {
            compute::cast(column, &DataType::Int64)?
        } else {
            compute::cast(column, &DataType::Float64)?
        }
    } else if data_type.is_floating() {
        compute::cast(column, &DataType::Float64)?
    } else if let Some(flags) = column.as_any().downcast_ref::<BooleanArray>() {
        let strings: StringArray = flags
            .iter()
            .map(|flag| flag.map(|b| if b { "True" } else { "False" }))
            .collect();
        Arc::new(strings)
    } else {
        compute::cast(column, &DataType::Utf8)?
    };
    Ok(array)
}
