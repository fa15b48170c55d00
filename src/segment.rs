use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::constants::activities::{
    APPLIED_WITH_MOVED_TO_JOB_POSITION, DISQUALIFICATIONS, ENTRANCES, MOVED_TO_JOB_POSITION,
};
use crate::data::{Episode, EpisodeArena, EpisodeCohort, EpisodeKey, Event};
use crate::job::JobProfile;
use crate::metrics::PipelineStats;
use crate::normalize::break_ties;
use crate::types::{CandidateId, JobId};

/// Running counters for one event of an ordered stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Counters {
    entrances_before: u32,
    disqualifications_before: u32,
}

impl Counters {
    fn attempt(&self) -> u32 {
        self.disqualifications_before + 1
    }

    fn balance(&self) -> i64 {
        i64::from(self.entrances_before) - i64::from(self.attempt())
    }
}

/// Shifted running counts of entrances and disqualifications.
///
/// The counter of an event covers only the events before it, so a
/// disqualification stays inside the episode it ends.
fn running_counters(events: &[Event]) -> Vec<Counters> {
    let mut entrances = 0;
    let mut disqualifications = 0;
    events
        .iter()
        .map(|event| {
            let counters = Counters {
                entrances_before: entrances,
                disqualifications_before: disqualifications,
            };
            let activity = event.canonical_activity.as_str();
            if ENTRANCES.contains(&activity) {
                entrances += 1;
            }
            if DISQUALIFICATIONS.contains(&activity) {
                disqualifications += 1;
            }
            counters
        })
        .collect()
}

/// Balance rule between entrances and attempts.
///
/// With `S` the sum of `entrances_before - attempt` and `A` the sum of attempts,
/// an episode is consistent when `S == 0` or `A` is a multiple of `S`.
pub fn is_balanced(balances: &[i64], attempts: &[u32]) -> bool {
    let balance: i64 = balances.iter().sum();
    let attempts: i64 = attempts.iter().map(|attempt| i64::from(*attempt)).sum();
    balance == 0 || attempts % balance == 0
}

/// Splits the normalized event stream into application episodes.
pub struct EpisodeSegmenter<'a> {
    config: &'a PipelineConfig,
}

impl<'a> EpisodeSegmenter<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Assign every event to an episode and remerge the cohorts into one arena.
    pub fn segment(&self, events: Vec<Event>, stats: &mut PipelineStats) -> EpisodeArena {
        let mut by_candidate: BTreeMap<CandidateId, Vec<Event>> = BTreeMap::new();
        for event in events {
            by_candidate
                .entry(event.candidate_id.clone())
                .or_default()
                .push(event);
        }

        let mut arena = EpisodeArena::new();
        for (candidate_id, mut history) in by_candidate {
            let cohort = classify_cohort(&history);
            let episodes = match cohort {
                EpisodeCohort::Direct => self.segment_per_job(history, cohort),
                EpisodeCohort::TransferredAtStart => {
                    relabel_first_move(&mut history);
                    self.segment_per_job(history, cohort)
                }
                EpisodeCohort::TransferredMidstream => self.segment_midstream(history),
            };
            debug!(
                candidate = %candidate_id,
                ?cohort,
                episodes = episodes.len(),
                "segmented candidate"
            );
            for episode in episodes {
                stats.record_cohort(episode.cohort);
                if !episode.consistent {
                    stats.inconsistent_episodes += 1;
                    warn!(episode = %episode.key, "entrance/disqualification balance mismatch");
                }
                arena.insert(episode);
            }
        }

        stats.episodes = arena.len();
        info!(
            episodes = stats.episodes,
            direct = stats.direct_episodes,
            transferred_at_start = stats.transferred_at_start_episodes,
            transferred_midstream = stats.transferred_midstream_episodes,
            inconsistent = stats.inconsistent_episodes,
            "segmented episodes"
        );
        arena
    }

    /// Counters per (candidate, job); the events keep their first tie-break.
    fn segment_per_job(&self, history: Vec<Event>, cohort: EpisodeCohort) -> Vec<Episode> {
        let mut by_job: BTreeMap<JobId, Vec<Event>> = BTreeMap::new();
        for event in history {
            by_job.entry(event.job_id.clone()).or_default().push(event);
        }
        let mut episodes = Vec::new();
        for (job_id, mut events) in by_job {
            events.sort_by_key(Event::order_key);
            let profile = JobProfile::parse(&job_id, self.config);
            for window in windows(events) {
                let Some(first) = window.events.first() else {
                    continue;
                };
                let key = EpisodeKey {
                    candidate_id: first.candidate_id.clone(),
                    job_id: job_id.clone(),
                    disqualification_count: window.disqualification_count,
                };
                episodes.push(Episode::new(
                    key,
                    cohort,
                    window.events,
                    window.consistent,
                    profile.clone(),
                ));
            }
        }
        episodes
    }

    /// Counters per candidate after re-breaking ties across all of their jobs.
    ///
    /// Each attempt is relabeled to the job of its last event.
    fn segment_midstream(&self, mut history: Vec<Event>) -> Vec<Episode> {
        break_ties(&mut history, self.config.tie_break_offset, |_| ());
        let mut episodes = Vec::new();
        for mut window in windows(history) {
            let Some(last) = window.events.last() else {
                continue;
            };
            let job_id = last.job_id.clone();
            let candidate_id = last.candidate_id.clone();
            for event in &mut window.events {
                event.job_id = job_id.clone();
            }
            let profile = JobProfile::parse(&job_id, self.config);
            episodes.push(Episode::new(
                EpisodeKey {
                    candidate_id,
                    job_id,
                    disqualification_count: window.disqualification_count,
                },
                EpisodeCohort::TransferredMidstream,
                window.events,
                window.consistent,
                profile,
            ));
        }
        episodes
    }
}

struct Window {
    disqualification_count: u32,
    events: Vec<Event>,
    consistent: bool,
}

/// Split an ordered stream at disqualifications and run the balance check per window.
fn windows(events: Vec<Event>) -> Vec<Window> {
    let counters = running_counters(&events);
    let mut grouped: BTreeMap<u32, (Vec<Event>, Vec<i64>, Vec<u32>)> = BTreeMap::new();
    for (event, counters) in events.into_iter().zip(counters) {
        let (events, balances, attempts) = grouped
            .entry(counters.disqualifications_before)
            .or_default();
        events.push(event);
        balances.push(counters.balance());
        attempts.push(counters.attempt());
    }
    grouped
        .into_iter()
        .map(|(disqualification_count, (events, balances, attempts))| Window {
            disqualification_count,
            events,
            consistent: is_balanced(&balances, &attempts),
        })
        .collect()
}

fn classify_cohort(history: &[Event]) -> EpisodeCohort {
    let moves = history
        .iter()
        .filter(|event| event.canonical_activity == MOVED_TO_JOB_POSITION)
        .count();
    if moves == 0 {
        return EpisodeCohort::Direct;
    }
    let first = history
        .iter()
        .min_by_key(|event| (event.timestamp, event.row));
    match first {
        Some(event) if moves == 1 && event.canonical_activity == MOVED_TO_JOB_POSITION => {
            EpisodeCohort::TransferredAtStart
        }
        _ => EpisodeCohort::TransferredMidstream,
    }
}

fn relabel_first_move(history: &mut [Event]) {
    if let Some(event) = history
        .iter_mut()
        .find(|event| event.canonical_activity == MOVED_TO_JOB_POSITION)
    {
        event.canonical_activity = APPLIED_WITH_MOVED_TO_JOB_POSITION.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn event(row: usize, candidate: &str, job: &str, activity: &str, ts: NaiveDateTime) -> Event {
        Event {
            row,
            candidate_id: candidate.into(),
            job_id: job.into(),
            raw_activity: activity.into(),
            canonical_activity: activity.into(),
            timestamp: ts,
            adjusted_timestamp: ts,
            is_hr_actor: false,
        }
    }

    #[test]
    fn reapplication_opens_a_new_episode() {
        let config = PipelineConfig::default();
        let events = vec![
            event(0, "C1", "J", "applied", at(1, 9)),
            event(1, "C1", "J", "hr interview", at(2, 9)),
            event(2, "C1", "J", "disqualified", at(3, 9)),
            event(3, "C1", "J", "applied", at(10, 9)),
            event(4, "C1", "J", "hr interview", at(11, 9)),
        ];
        let mut stats = PipelineStats::default();
        let arena = EpisodeSegmenter::new(&config).segment(events, &mut stats);
        let keys: Vec<(u32, usize)> = arena
            .iter()
            .map(|episode| (episode.key.disqualification_count, episode.events.len()))
            .collect();
        assert_eq!(keys, vec![(0, 3), (1, 2)]);
        assert!(arena.iter().all(|episode| episode.consistent));
        assert!(arena.iter().all(|episode| episode.cohort == EpisodeCohort::Direct));
        assert_eq!(stats.direct_episodes, 2);
        let ids: Vec<String> = arena.iter().map(|episode| episode.key.to_string()).collect();
        assert_eq!(ids, vec!["C1_J_1".to_string(), "C1_J_2".to_string()]);
    }

    #[test]
    fn balance_rule_matches_observed_cases() {
        assert!(is_balanced(&[-1, 0, 0], &[1, 1, 1]));
        assert!(is_balanced(&[0, 0], &[2, 2]));
        assert!(is_balanced(&[1, 1], &[2, 2]));
        assert!(!is_balanced(&[3], &[2]));
        assert!(!is_balanced(&[1, 2], &[2, 3]));
    }

    #[test]
    fn first_event_move_relabels_and_stays_per_job() {
        let config = PipelineConfig::default();
        let events = vec![
            event(0, "C1", "New", "moved to job position", at(1, 9)),
            event(1, "C1", "New", "hr interview", at(2, 9)),
        ];
        let arena = EpisodeSegmenter::new(&config).segment(events, &mut PipelineStats::default());
        assert_eq!(arena.len(), 1);
        let episode = arena.iter().next().unwrap();
        assert_eq!(episode.cohort, EpisodeCohort::TransferredAtStart);
        assert_eq!(
            episode.events[0].canonical_activity,
            APPLIED_WITH_MOVED_TO_JOB_POSITION
        );
    }

    #[test]
    fn midstream_move_relabels_window_to_last_job() {
        let config = PipelineConfig::default();
        let events = vec![
            event(0, "C1", "Old", "applied", at(1, 9)),
            event(1, "C1", "Old", "hr interview", at(2, 9)),
            event(2, "C1", "New", "moved to job position", at(2, 9)),
            event(3, "C1", "New", "offer", at(4, 9)),
        ];
        let mut stats = PipelineStats::default();
        let arena = EpisodeSegmenter::new(&config).segment(events, &mut stats);
        assert_eq!(arena.len(), 1);
        let episode = arena.iter().next().unwrap();
        assert_eq!(episode.cohort, EpisodeCohort::TransferredMidstream);
        assert_eq!(episode.key.job_id, "New");
        assert!(episode.events.iter().all(|event| event.job_id == "New"));
        // Same instant on two jobs: the per-candidate tie-break spaces them.
        assert_eq!(
            episode.events[2].adjusted_timestamp,
            at(2, 9) + Duration::minutes(2)
        );
        assert_eq!(stats.transferred_midstream_episodes, 1);
    }
}
