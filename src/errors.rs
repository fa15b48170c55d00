use std::io;

use thiserror::Error;

use crate::types::RowIndex;

/// Error type for fatal input conditions and adapter failures.
///
/// Every variant aborts the run before any output is produced. Data-quality
/// findings that do not abort (inconsistent episodes, ordering anomalies,
/// unmapped stages) are reported as flags instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("table '{table}' is missing required columns: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },
    #[error("table '{table}' is empty")]
    EmptyTable { table: String },
    #[error(
        "{} timestamp value(s) match none of the configured formats (rows {rows:?}, first value '{}')",
        .rows.len(),
        .samples.first().map(String::as_str).unwrap_or_default()
    )]
    UnparseableTimestamps {
        rows: Vec<RowIndex>,
        samples: Vec<String>,
    },
    #[error(
        "{} event(s) have no canonical activity (rows {rows:?}, labels {labels:?})",
        .rows.len()
    )]
    UnresolvedActivities {
        rows: Vec<RowIndex>,
        labels: Vec<String>,
    },
    #[error("table '{table}' row {row} column '{column}': cannot read '{value}'")]
    InvalidValue {
        table: String,
        row: RowIndex,
        column: String,
        value: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}
