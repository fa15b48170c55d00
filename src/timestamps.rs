use chrono::{Datelike, NaiveDateTime};

use crate::config::TimestampStrategy;
use crate::errors::PipelineError;
use crate::types::RowIndex;

/// Parse `value` with the first format in `formats` that accepts it.
///
/// Surrounding whitespace is ignored. Returns `None` when no format matches.
pub fn parse_with_formats<S: AsRef<str>>(value: &str, formats: &[S]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|format| parse_one(value, format.as_ref()))
}

/// Parse `value` with a single format.
///
/// `%Y` must consume a four-digit year: chrono accepts `23` for `%Y`, which
/// would turn a `%y` column into first-century dates.
fn parse_one(value: &str, format: &str) -> Option<NaiveDateTime> {
    let parsed = NaiveDateTime::parse_from_str(value.trim(), format).ok()?;
    if format.contains("%Y") && parsed.year() < 1000 {
        return None;
    }
    Some(parsed)
}

/// Parse a whole timestamp column using `strategy`.
///
/// `WholeColumn` commits to the first format that parses every value; `PerRow`
/// resolves each value independently. Either way a value that cannot be parsed
/// aborts with the offending row indices.
pub fn parse_column<S: AsRef<str>>(
    values: &[&str],
    formats: &[S],
    strategy: TimestampStrategy,
) -> Result<Vec<NaiveDateTime>, PipelineError> {
    match strategy {
        TimestampStrategy::WholeColumn => parse_whole_column(values, formats),
        TimestampStrategy::PerRow => parse_per_row(values, formats),
    }
}

fn parse_whole_column<S: AsRef<str>>(
    values: &[&str],
    formats: &[S],
) -> Result<Vec<NaiveDateTime>, PipelineError> {
    for format in formats {
        let parsed: Option<Vec<NaiveDateTime>> = values
            .iter()
            .map(|value| parse_one(value, format.as_ref()))
            .collect();
        if let Some(parsed) = parsed {
            return Ok(parsed);
        }
    }
    // Report rows against the first format, the one the column was expected in.
    let rows: Vec<RowIndex> = match formats.first() {
        Some(format) => values
            .iter()
            .enumerate()
            .filter(|(_, value)| parse_one(value, format.as_ref()).is_none())
            .map(|(row, _)| row)
            .collect(),
        None => (0..values.len()).collect(),
    };
    Err(unparseable(values, rows))
}

fn parse_per_row<S: AsRef<str>>(
    values: &[&str],
    formats: &[S],
) -> Result<Vec<NaiveDateTime>, PipelineError> {
    let mut parsed = Vec::with_capacity(values.len());
    let mut failed = Vec::new();
    for (row, value) in values.iter().enumerate() {
        match parse_with_formats(value, formats) {
            Some(timestamp) => parsed.push(timestamp),
            None => failed.push(row),
        }
    }
    if failed.is_empty() {
        Ok(parsed)
    } else {
        Err(unparseable(values, failed))
    }
}

fn unparseable(values: &[&str], rows: Vec<RowIndex>) -> PipelineError {
    let samples = rows
        .iter()
        .take(5)
        .map(|row| values[*row].to_string())
        .collect();
    PipelineError::UnparseableTimestamps { rows, samples }
}
