//! Offline dataset conversion
//!
//! Reads a local `.csv` or `.json` file, applies filters and an optional
//! sort, and writes the result in the requested format.

use crate::dataset::{DataFormat, Record};
use crate::error::{Error, Result};
use crate::query::{filter_by_field_name, sort_by_object_name, SortOrder};
use std::path::{Path, PathBuf};

/// `FIELD=VALUE` filter given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl std::str::FromStr for FieldFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))?;
        if field.is_empty() {
            return Err(format!("missing field name in '{}'", s));
        }
        Ok(Self {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// What to do with the records on the way through
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub to: DataFormat,
    pub sort: Option<SortOrder>,
    pub filters: Vec<FieldFilter>,
}

/// Outcome of a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub output: PathBuf,
    pub records: usize,
}

/// Apply filters in order, then the sort
pub fn apply(records: Vec<Record>, options: &ConvertOptions) -> Vec<Record> {
    let filtered = options.filters.iter().fold(records, |records, filter| {
        filter_by_field_name(&records, &filter.field, &filter.value)
    });
    match options.sort {
        Some(order) => sort_by_object_name(&filtered, order.is_ascending()),
        None => filtered,
    }
}

/// Default output path: next to the input, extension swapped
pub fn output_path(input: &Path, from: DataFormat, to: DataFormat) -> PathBuf {
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", from.base_name(file_name), to.extension()))
}

/// Convert `input`, writing to `output` or the default output path
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    options: &ConvertOptions,
) -> Result<ConvertSummary> {
    let from = DataFormat::from_path(input)?;
    let payload = std::fs::read(input)?;
    let records = apply(from.parse(&payload)?, options);

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_path(input, from, options.to));
    if output == input {
        return Err(Error::Internal(format!(
            "refusing to overwrite input file {}",
            input.display()
        )));
    }

    std::fs::write(&output, options.to.serialize(&records)?)?;
    tracing::info!(
        records = records.len(),
        "Converted {} to {}",
        input.display(),
        output.display()
    );

    Ok(ConvertSummary {
        output,
        records: records.len(),
    })
}
