use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::config::PipelineConfig;
use crate::constants::stages::{AUTOMATED_TEST, HR_INTERVIEW, OFFER};
use crate::data::{Episode, EpisodeArena, SlaCohort, StageEvent};
use crate::metrics::PipelineStats;
use crate::utils::{label_key, round_2};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Deduplicates stage visits and computes elapsed-time metrics.
pub struct TimelineReducer<'a> {
    config: &'a PipelineConfig,
}

impl<'a> TimelineReducer<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn reduce(&self, arena: &mut EpisodeArena, stats: &mut PipelineStats) {
        for episode in arena.iter_mut() {
            let before = episode.stages.len();
            self.reduce_episode(episode);
            stats.duplicate_stage_visits_removed += before - episode.stages.len();
            if episode.has_duplicate_stage {
                stats.episodes_with_duplicate_stages += 1;
            }
            match episode.sla_cohort {
                SlaCohort::Vanilla => stats.vanilla_episodes += 1,
                SlaCohort::NonVanilla => stats.non_vanilla_episodes += 1,
            }
        }
        info!(
            removed = stats.duplicate_stage_visits_removed,
            with_duplicates = stats.episodes_with_duplicate_stages,
            vanilla = stats.vanilla_episodes,
            non_vanilla = stats.non_vanilla_episodes,
            "reduced timelines"
        );
    }

    fn reduce_episode(&self, episode: &mut Episode) {
        episode
            .stages
            .sort_by_key(|stage| (stage.timestamp, stage.row));
        episode.has_duplicate_stage = has_repeated_stage(&episode.stages);
        episode.stages = keep_last_visits(std::mem::take(&mut episode.stages));
        fill_elapsed(&mut episode.stages);

        episode.sla_cohort = self.sla_cohort(episode);
        let anchor = match episode.sla_cohort {
            SlaCohort::Vanilla => AUTOMATED_TEST,
            SlaCohort::NonVanilla => HR_INTERVIEW,
        };
        let since_anchor = time_since(&episode.stages, anchor);
        for (stage, since) in episode.stages.iter_mut().zip(since_anchor) {
            match episode.sla_cohort {
                SlaCohort::Vanilla => stage.time_since_autotest = since,
                SlaCohort::NonVanilla => stage.time_since_hr_interview = since,
            }
            stage.sla_checkpoint = stage.is_stage(OFFER);
        }
    }

    /// Entry-level research analysts on the core track form the vanilla cohort.
    fn sla_cohort(&self, episode: &Episode) -> SlaCohort {
        let profile = &episode.profile;
        if profile.is_core()
            && self.config.is_research_department(&profile.department_bucket)
            && self.config.is_vanilla_title(&profile.position)
        {
            SlaCohort::Vanilla
        } else {
            SlaCohort::NonVanilla
        }
    }
}

fn has_repeated_stage(stages: &[StageEvent]) -> bool {
    let mut seen = BTreeSet::new();
    stages.iter().any(|stage| !seen.insert(label_key(&stage.stage)))
}

/// Keep only the last visit of each stage; `stages` must be in order.
fn keep_last_visits(stages: Vec<StageEvent>) -> Vec<StageEvent> {
    let mut last: BTreeMap<String, usize> = BTreeMap::new();
    for (position, stage) in stages.iter().enumerate() {
        last.insert(label_key(&stage.stage), position);
    }
    let keep: BTreeSet<usize> = last.into_values().collect();
    stages
        .into_iter()
        .enumerate()
        .filter(|(position, _)| keep.contains(position))
        .map(|(_, stage)| stage)
        .collect()
}

fn fill_elapsed(stages: &mut [StageEvent]) {
    let mut previous: Option<chrono::NaiveDateTime> = None;
    let mut cumulative = 0.0;
    for stage in stages.iter_mut() {
        let (hours, days) = match previous {
            Some(previous) => {
                let delta = stage.timestamp - previous;
                let days = delta.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY;
                (delta.num_hours(), round_2(days))
            }
            None => (0, 0.0),
        };
        cumulative = round_2(cumulative + days);
        stage.elapsed_hours = hours;
        stage.elapsed_days = days;
        stage.cumulative_elapsed_days = cumulative;
        previous = Some(stage.timestamp);
    }
}

/// Cumulative days since `anchor`, clamped at zero; all zero when the anchor is absent.
fn time_since(stages: &[StageEvent], anchor: &str) -> Vec<f64> {
    let anchor_cumulative = stages
        .iter()
        .find(|stage| stage.is_stage(anchor))
        .map(|stage| stage.cumulative_elapsed_days);
    stages
        .iter()
        .map(|stage| match anchor_cumulative {
            Some(base) => round_2((stage.cumulative_elapsed_days - base).max(0.0)),
            None => 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EpisodeCohort, EpisodeKey, Event};
    use crate::job::JobProfile;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn episode(job: &str, stages: &[(&str, i64)]) -> Episode {
        let config = PipelineConfig::default();
        let mut episode = Episode::new(
            EpisodeKey {
                candidate_id: "C1".into(),
                job_id: job.into(),
                disqualification_count: 0,
            },
            EpisodeCohort::Direct,
            Vec::new(),
            true,
            JobProfile::parse(job, &config),
        );
        episode.stages = stages
            .iter()
            .enumerate()
            .map(|(row, (stage, minutes))| {
                let ts = start() + Duration::minutes(*minutes);
                let event = Event {
                    row,
                    candidate_id: "C1".into(),
                    job_id: job.into(),
                    raw_activity: String::new(),
                    canonical_activity: String::new(),
                    timestamp: ts,
                    adjusted_timestamp: ts,
                    is_hr_actor: false,
                };
                StageEvent::from_event(&event, *stage)
            })
            .collect();
        episode
    }

    fn reduce(episode: Episode) -> (Episode, PipelineStats) {
        let config = PipelineConfig::default();
        let mut arena: EpisodeArena = std::iter::once(episode).collect();
        let mut stats = PipelineStats::default();
        TimelineReducer::new(&config).reduce(&mut arena, &mut stats);
        (arena.iter().next().cloned().unwrap(), stats)
    }

    const DAY: i64 = 24 * 60;

    #[test]
    fn keeps_last_visit_and_records_duplicate() {
        let (episode, stats) = reduce(episode(
            "Data Analytics - Data Analyst - Cairo",
            &[
                ("Applied", 0),
                ("HR Interview", DAY),
                ("hr interview", 3 * DAY),
                ("Offer", 4 * DAY),
            ],
        ));
        assert!(episode.has_duplicate_stage);
        assert_eq!(stats.duplicate_stage_visits_removed, 1);
        let stages: Vec<(&str, i64, f64, f64)> = episode
            .stages
            .iter()
            .map(|s| (s.stage.as_str(), s.elapsed_hours, s.elapsed_days, s.cumulative_elapsed_days))
            .collect();
        assert_eq!(
            stages,
            vec![
                ("Applied", 0, 0.0, 0.0),
                ("hr interview", 72, 3.0, 3.0),
                ("Offer", 24, 1.0, 4.0),
            ]
        );
        assert_eq!(episode.sla_cohort, SlaCohort::NonVanilla);
        let since: Vec<f64> = episode
            .stages
            .iter()
            .map(|s| s.time_since_hr_interview)
            .collect();
        assert_eq!(since, vec![0.0, 0.0, 1.0]);
        assert!(episode.stages[2].sla_checkpoint);
        assert!(episode.stages.iter().all(|s| s.time_since_autotest == 0.0));
    }

    #[test]
    fn vanilla_episode_measures_from_automated_test() {
        let (episode, stats) = reduce(episode(
            "Business Research - Research Analyst - Cairo",
            &[("Applied", 0), ("Automated test", DAY / 2), ("Offer", 2 * DAY)],
        ));
        assert_eq!(episode.sla_cohort, SlaCohort::Vanilla);
        assert_eq!(stats.vanilla_episodes, 1);
        let since: Vec<f64> = episode
            .stages
            .iter()
            .map(|s| s.time_since_autotest)
            .collect();
        assert_eq!(since, vec![0.0, 0.0, 1.5]);
        assert_eq!(episode.stages[1].elapsed_hours, 12);
        assert_eq!(episode.stages[1].elapsed_days, 0.5);
    }

    #[test]
    fn non_core_research_is_not_vanilla() {
        let (episode, _) = reduce(episode(
            "Business Research - Research Analyst - Cairo - Arabic Speaker",
            &[("Applied", 0), ("Automated test", 90)],
        ));
        assert_eq!(episode.sla_cohort, SlaCohort::NonVanilla);
        // No HR interview stage: the metric stays zero.
        assert!(episode.stages.iter().all(|s| s.time_since_hr_interview == 0.0));
        assert_eq!(episode.stages[1].elapsed_hours, 1);
        assert_eq!(episode.stages[1].elapsed_days, 0.06);
    }
}
