use std::collections::BTreeSet;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::constants::activities::{
    DISQUALIFICATIONS, JOB_MOVE_MARKERS, MOVED_TO_JOB_POSITION, REFERRED_A_CANDIDATE, REVERTED,
    TALENT_POOL_MARKER, UNSNOOZED, WOKEN_UP,
};
use crate::constants::jobs::CANDIDATE_PLACEHOLDER;
use crate::data::{Event, RawEvent};
use crate::errors::PipelineError;
use crate::metrics::PipelineStats;
use crate::reference::ReferenceRules;
use crate::timestamps::parse_column;
use crate::types::{CandidateId, CanonicalActivity, RowIndex};
use crate::utils::label_key;

/// Output of [`EventNormalizer::normalize`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedEvents {
    /// Retained events sorted by (candidate, job, adjusted timestamp, row).
    pub events: Vec<Event>,
    /// Candidates that referred someone.
    pub referred_candidates: BTreeSet<CandidateId>,
    /// Candidates with talent-pool activity.
    pub talent_pool_candidates: BTreeSet<CandidateId>,
}

enum Resolution {
    Step(CanonicalActivity),
    NonStep,
    Unresolved,
}

/// Parses timestamps, canonicalizes activity labels and breaks timestamp ties.
pub struct EventNormalizer<'a> {
    rules: &'a ReferenceRules,
    config: &'a PipelineConfig,
}

impl<'a> EventNormalizer<'a> {
    pub fn new(rules: &'a ReferenceRules, config: &'a PipelineConfig) -> Self {
        Self { rules, config }
    }

    /// Normalize a whole batch.
    ///
    /// Aborts before producing anything when a timestamp matches no format or
    /// an activity label has no canonical activity.
    pub fn normalize(
        &self,
        raw: &[RawEvent],
        stats: &mut PipelineStats,
    ) -> Result<NormalizedEvents, PipelineError> {
        stats.input_rows = raw.len();
        let values: Vec<&str> = raw.iter().map(|row| row.raw_timestamp.as_str()).collect();
        let timestamps = parse_column(
            &values,
            &self.config.timestamp_formats,
            self.config.timestamp_strategy,
        )?;

        let resolutions: Vec<Resolution> = raw
            .iter()
            .map(|row| self.resolve_activity(&row.raw_activity))
            .collect();
        let unresolved: Vec<RowIndex> = resolutions
            .iter()
            .enumerate()
            .filter(|(_, resolution)| matches!(resolution, Resolution::Unresolved))
            .map(|(row, _)| row)
            .collect();
        if !unresolved.is_empty() {
            let labels: BTreeSet<String> = unresolved
                .iter()
                .map(|row| raw[*row].raw_activity.clone())
                .collect();
            return Err(PipelineError::UnresolvedActivities {
                rows: unresolved,
                labels: labels.into_iter().collect(),
            });
        }

        let mut output = NormalizedEvents::default();
        for (row, ((source, timestamp), resolution)) in raw
            .iter()
            .zip(timestamps)
            .zip(resolutions)
            .enumerate()
        {
            if !is_real_candidate(&source.candidate_id) {
                stats.dropped_placeholder_candidates += 1;
                continue;
            }
            let candidate_id = source.candidate_id.trim().to_string();
            if label_key(&source.raw_activity).contains(TALENT_POOL_MARKER) {
                output.talent_pool_candidates.insert(candidate_id.clone());
            }
            let canonical_activity = match resolution {
                Resolution::Step(canonical) => canonical,
                Resolution::NonStep | Resolution::Unresolved => {
                    stats.dropped_non_process_steps += 1;
                    continue;
                }
            };
            if canonical_activity == REFERRED_A_CANDIDATE {
                stats.referral_events += 1;
                output.referred_candidates.insert(candidate_id);
                continue;
            }
            let is_hr_actor = source
                .actor
                .as_deref()
                .is_some_and(|actor| self.rules.is_hr_actor(actor));
            output.events.push(Event {
                row,
                candidate_id,
                job_id: source.job_id.trim().to_string(),
                raw_activity: source.raw_activity.clone(),
                canonical_activity,
                timestamp,
                adjusted_timestamp: timestamp,
                is_hr_actor,
            });
        }

        stats.tie_shifted_events = break_ties(
            &mut output.events,
            self.config.tie_break_offset,
            |event| (event.candidate_id.clone(), event.job_id.clone()),
        );
        stats.reverted_disqualifications = drop_reverted_disqualifications(&mut output.events);
        stats.retained_events = output.events.len();
        stats.referred_candidates = output.referred_candidates.len();
        stats.talent_pool_candidates = output.talent_pool_candidates.len();

        if stats.dropped_placeholder_candidates > 0 {
            warn!(
                rows = stats.dropped_placeholder_candidates,
                "dropped events without a candidate"
            );
        }
        info!(
            input = stats.input_rows,
            retained = stats.retained_events,
            non_process = stats.dropped_non_process_steps,
            referrals = stats.referral_events,
            shifted = stats.tie_shifted_events,
            reverted = stats.reverted_disqualifications,
            "normalized events"
        );
        Ok(output)
    }

    fn resolve_activity(&self, raw_activity: &str) -> Resolution {
        let key = label_key(raw_activity);
        if JOB_MOVE_MARKERS.iter().any(|marker| key.contains(marker)) {
            return Resolution::Step(MOVED_TO_JOB_POSITION.to_string());
        }
        match self.rules.activity(raw_activity) {
            None => Resolution::Unresolved,
            Some(entry) if !entry.is_process_step => Resolution::NonStep,
            Some(entry) => match canonicalize(&entry.canonical_activity) {
                Some(canonical) => Resolution::Step(canonical),
                None => {
                    debug!(raw_activity, "process step with blank canonical activity");
                    Resolution::Unresolved
                }
            },
        }
    }
}

fn canonicalize(canonical_activity: &str) -> Option<CanonicalActivity> {
    let key = label_key(canonical_activity);
    match key.as_str() {
        "" => None,
        WOKEN_UP => Some(UNSNOOZED.to_string()),
        _ => Some(key),
    }
}

fn is_real_candidate(candidate_id: &str) -> bool {
    let trimmed = candidate_id.trim();
    !trimmed.is_empty() && trimmed != CANDIDATE_PLACEHOLDER
}

/// Sort `events` by (group, parsed timestamp, row) and make adjusted timestamps
/// strictly increasing inside each group.
///
/// Adjusted timestamps are recomputed from the parsed ones, so only events that
/// share a parsed timestamp move. Returns how many events were shifted.
pub fn break_ties<K, F>(events: &mut [Event], offset: Duration, group_key: F) -> usize
where
    K: Ord,
    F: Fn(&Event) -> K,
{
    events.sort_by(|left, right| {
        group_key(left)
            .cmp(&group_key(right))
            .then_with(|| left.timestamp.cmp(&right.timestamp))
            .then_with(|| left.row.cmp(&right.row))
    });
    let mut shifted = 0;
    for group in events.chunk_by_mut(|left, right| group_key(left) == group_key(right)) {
        for event in group.iter_mut() {
            event.adjusted_timestamp = event.timestamp;
        }
        shifted += spread_ties(group, offset);
    }
    shifted
}

/// Remove every disqualification that is immediately reverted, together with
/// its revert.
///
/// `events` must be sorted by (candidate, job, adjusted timestamp). Only
/// neighbours of the same (candidate, job) pair match, so the attempt carries on
/// as if the disqualification never happened. Returns how many pairs were
/// removed.
pub fn drop_reverted_disqualifications(events: &mut Vec<Event>) -> usize {
    let reverted_pairs: Vec<usize> = events
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| {
            pair[0].candidate_id == pair[1].candidate_id
                && pair[0].job_id == pair[1].job_id
                && DISQUALIFICATIONS.contains(&pair[0].canonical_activity.as_str())
                && pair[1].canonical_activity == REVERTED
        })
        .map(|(index, _)| index)
        .collect();
    if reverted_pairs.is_empty() {
        return 0;
    }
    let mut dropped = vec![false; events.len()];
    for index in &reverted_pairs {
        dropped[*index] = true;
        dropped[*index + 1] = true;
    }
    let mut flags = dropped.into_iter();
    events.retain(|_| !flags.next().unwrap_or(false));
    reverted_pairs.len()
}

/// Spread every run of equal adjusted timestamps.
///
/// `events` must be sorted by adjusted timestamp. The k-th event of a run lands
/// `k * offset` after the run's timestamp. When that would reach the next
/// distinct timestamp, the step shrinks so the whole run fits before it.
/// Events outside a run keep their timestamp. Returns how many events moved.
pub fn spread_ties(events: &mut [Event], offset: Duration) -> usize {
    let mut shifted = 0;
    let mut runs = events
        .chunk_by_mut(|left, right| left.adjusted_timestamp == right.adjusted_timestamp)
        .peekable();
    while let Some(run) = runs.next() {
        if run.len() < 2 {
            continue;
        }
        let start = run[0].adjusted_timestamp;
        let len = i32::try_from(run.len()).unwrap_or(i32::MAX);
        let step = match runs.peek().and_then(|next| next.first()) {
            Some(next) => offset.min((next.adjusted_timestamp - start) / len),
            None => offset,
        };
        let mut at = start;
        for event in run.iter_mut().skip(1) {
            at += step;
            event.adjusted_timestamp = at;
            shifted += 1;
        }
    }
    shifted
}
