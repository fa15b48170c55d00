use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::constants::stages::APPLIED;
use crate::data::{Episode, EpisodeArena, EpisodeKey, StageEvent};
use crate::metrics::PipelineStats;
use crate::normalize::spread_ties;
use crate::reference::ReferenceRules;

/// Maps events to canonical stages and guarantees an "Applied" anchor.
pub struct StageMapper<'a> {
    rules: &'a ReferenceRules,
    config: &'a PipelineConfig,
}

impl<'a> StageMapper<'a> {
    pub fn new(rules: &'a ReferenceRules, config: &'a PipelineConfig) -> Self {
        Self { rules, config }
    }

    /// Map every episode in place. Episodes left without any stage are removed.
    pub fn map(&self, arena: &mut EpisodeArena, stats: &mut PipelineStats) {
        let mut stageless: Vec<EpisodeKey> = Vec::new();
        for episode in arena.iter_mut() {
            self.map_episode(episode, stats);
            if episode.stages.is_empty() {
                stageless.push(episode.key.clone());
            }
        }
        if !stageless.is_empty() {
            warn!(
                episodes = stageless.len(),
                first = %stageless[0],
                "dropping episodes without any mapped stage"
            );
            stats.stageless_episodes += stageless.len();
            arena.retain(|episode| !episode.stages.is_empty());
        }
        info!(
            episodes = arena.len(),
            mapped = stats.mapped_stage_events,
            unmapped = stats.unmapped_stage_events,
            clamped = stats.clamped_events,
            anchors = stats.synthesized_anchors,
            "mapped stages"
        );
    }

    fn map_episode(&self, episode: &mut Episode, stats: &mut PipelineStats) {
        episode.is_senior = self
            .rules
            .seniority(&episode.profile.position)
            .unwrap_or(self.config.default_seniority);
        stats.clamped_events += self.clamp_to_floor(episode);

        let bucket = episode.profile.department_bucket.clone();
        episode.is_business_research = self.config.is_research_department(&bucket);
        episode.recency_flag = episode.is_business_research
            && episode
                .first_timestamp()
                .is_some_and(|first| first > self.config.reorganization_cutoff);

        let mut stages = Vec::with_capacity(episode.events.len());
        for event in &episode.events {
            match self.rules.stage_for(
                &bucket,
                episode.is_business_research,
                episode.recency_flag,
                &event.canonical_activity,
            ) {
                Some(stage) => stages.push(StageEvent::from_event(event, stage.clone())),
                None => {
                    stats.unmapped_stage_events += 1;
                    debug!(
                        episode = %episode.key,
                        activity = %event.canonical_activity,
                        "no stage rule"
                    );
                }
            }
        }
        stats.mapped_stage_events += stages.len();
        if stages.is_empty() {
            episode.stages = stages;
            return;
        }
        episode.anchor_synthesized = self.anchor(&mut stages);
        if episode.anchor_synthesized {
            stats.synthesized_anchors += 1;
        }
        episode.stages = stages;
    }

    /// Pull timestamps before the floor up to it and re-space them.
    fn clamp_to_floor(&self, episode: &mut Episode) -> usize {
        let floor = self.config.floor;
        let mut clamped = 0;
        for event in &mut episode.events {
            if event.adjusted_timestamp < floor {
                event.adjusted_timestamp = floor;
                clamped += 1;
            }
        }
        if clamped > 0 {
            spread_ties(&mut episode.events, self.config.tie_break_offset);
        }
        clamped
    }

    /// Place the "Applied" stage `anchor_offset` before the earliest stage.
    ///
    /// `stages` must be non-empty and comes back sorted. Returns whether the
    /// anchor had to be synthesized.
    fn anchor(&self, stages: &mut Vec<StageEvent>) -> bool {
        stages.sort_by_key(|stage| (stage.timestamp, stage.row));
        let Some(earliest) = stages.first().cloned() else {
            return false;
        };
        let anchor_at = earliest.timestamp - self.config.anchor_offset;
        let mut synthesized = false;
        if stages.iter().any(|stage| stage.is_stage(APPLIED)) {
            for stage in stages.iter_mut().filter(|stage| stage.is_stage(APPLIED)) {
                stage.timestamp = anchor_at;
            }
        } else {
            let mut anchor = earliest;
            anchor.stage = APPLIED.to_string();
            anchor.timestamp = anchor_at;
            anchor.synthesized = true;
            stages.insert(0, anchor);
            synthesized = true;
        }
        stages.sort_by_key(|stage| (stage.timestamp, stage.row));
        synthesized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EpisodeCohort, Event};
    use crate::job::JobProfile;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    const JOB: &str = "Data Analytics - Data Analyst - Cairo";

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn rules() -> ReferenceRules {
        ReferenceRules::new()
            .with_stage_rule("Data Analytics", false, false, "applied", "Applied")
            .with_stage_rule("Data Analytics", false, false, "hr interview", "HR Interview")
            .with_stage_rule("Data Analytics", false, false, "offer", "Offer")
            .with_stage_rule("Business Research", true, true, "case study", "Case study")
            .with_seniority("Data Analyst", false)
    }

    fn episode(job: &str, activities: &[(&str, NaiveDateTime)]) -> Episode {
        let config = PipelineConfig::default();
        let events = activities
            .iter()
            .enumerate()
            .map(|(row, (activity, ts))| Event {
                row,
                candidate_id: "C1".into(),
                job_id: job.into(),
                raw_activity: (*activity).into(),
                canonical_activity: (*activity).into(),
                timestamp: *ts,
                adjusted_timestamp: *ts,
                is_hr_actor: false,
            })
            .collect();
        Episode::new(
            EpisodeKey {
                candidate_id: "C1".into(),
                job_id: job.into(),
                disqualification_count: 0,
            },
            EpisodeCohort::Direct,
            events,
            true,
            JobProfile::parse(job, &config),
        )
    }

    fn map(episodes: Vec<Episode>) -> (EpisodeArena, PipelineStats) {
        let rules = rules();
        let config = PipelineConfig::default();
        let mut arena: EpisodeArena = episodes.into_iter().collect();
        let mut stats = PipelineStats::default();
        StageMapper::new(&rules, &config).map(&mut arena, &mut stats);
        (arena, stats)
    }

    #[test]
    fn synthesizes_missing_anchor_five_minutes_early() {
        let (arena, stats) = map(vec![episode(
            JOB,
            &[("hr interview", at(2023, 3, 2, 9)), ("offer", at(2023, 3, 5, 9))],
        )]);
        let episode = arena.iter().next().unwrap();
        assert!(episode.anchor_synthesized);
        assert!(!episode.is_senior);
        assert_eq!(episode.stages.len(), 3);
        assert_eq!(episode.stages[0].stage, "Applied");
        assert!(episode.stages[0].synthesized);
        assert_eq!(
            episode.stages[0].timestamp,
            at(2023, 3, 2, 9) - Duration::minutes(5)
        );
        assert_eq!(stats.synthesized_anchors, 1);
    }

    #[test]
    fn existing_applied_is_moved_before_earliest_stage() {
        let (arena, _) = map(vec![episode(
            JOB,
            &[
                ("hr interview", at(2023, 3, 2, 9)),
                ("applied", at(2023, 3, 3, 9)),
                ("unknown step", at(2023, 3, 4, 9)),
            ],
        )]);
        let episode = arena.iter().next().unwrap();
        assert!(!episode.anchor_synthesized);
        let stages: Vec<&str> = episode.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(stages, vec!["Applied", "HR Interview"]);
        assert_eq!(
            episode.stages[0].timestamp,
            at(2023, 3, 2, 9) - Duration::minutes(5)
        );
    }

    #[test]
    fn floor_clamp_keeps_events_distinct() {
        let (arena, stats) = map(vec![episode(
            JOB,
            &[("applied", at(2021, 5, 1, 9)), ("hr interview", at(2021, 6, 1, 9))],
        )]);
        let episode = arena.iter().next().unwrap();
        let floor = PipelineConfig::default().floor;
        assert_eq!(episode.events[0].adjusted_timestamp, floor);
        assert_eq!(
            episode.events[1].adjusted_timestamp,
            floor + Duration::minutes(2)
        );
        assert_eq!(stats.clamped_events, 2);
        assert_eq!(episode.stages[1].timestamp, floor + Duration::minutes(2));
    }

    #[test]
    fn recency_flag_selects_reorganized_rules() {
        let research = "Business Research - Research Analyst - Cairo";
        let (arena, stats) = map(vec![
            episode(research, &[("case study", at(2023, 8, 1, 9))]),
            episode(JOB, &[("unknown step", at(2023, 8, 1, 9))]),
        ]);
        assert_eq!(arena.len(), 1);
        let episode = arena.iter().next().unwrap();
        assert!(episode.is_business_research);
        assert!(episode.recency_flag);
        assert!(episode.is_senior);
        assert_eq!(episode.stages[1].stage, "Case study");
        assert_eq!(stats.stageless_episodes, 1);
    }
}
