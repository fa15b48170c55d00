use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::data::TimelineRow;
use crate::errors::PipelineError;
use crate::pipeline::TimelineReport;

/// Feed the JSON-lines encoding of `rows` into `hasher`, length first.
fn hash_rows(rows: &[TimelineRow], hasher: &mut DefaultHasher) -> Result<(), PipelineError> {
    rows.len().hash(hasher);
    for row in rows {
        serde_json::to_string(row)?.hash(hasher);
    }
    Ok(())
}

/// Fingerprint of a set of rows, taken over their JSON-lines encoding.
pub fn rows_fingerprint(rows: &[TimelineRow]) -> Result<u64, PipelineError> {
    let mut hasher = DefaultHasher::new();
    hash_rows(rows, &mut hasher)?;
    Ok(hasher.finish())
}

/// Fingerprint of a whole report: every routed set and both side channels.
pub fn report_fingerprint(report: &TimelineReport) -> Result<u64, PipelineError> {
    let mut hasher = DefaultHasher::new();
    for rows in [&report.accepted, &report.manual_review, &report.hired_in_review] {
        hash_rows(rows, &mut hasher)?;
    }
    report.referred_candidates.hash(&mut hasher);
    report.talent_pool_candidates.hash(&mut hasher);
    Ok(hasher.finish())
}
