use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PipelineConfig;
use crate::data::{EpisodeArena, EpisodeKey, RawEvent, TimelineRow};
use crate::errors::PipelineError;
use crate::metrics::PipelineStats;
use crate::normalize::EventNormalizer;
use crate::ordering::{OrderValidator, route};
use crate::outcome::OutcomeClassifier;
use crate::reference::ReferenceRules;
use crate::segment::EpisodeSegmenter;
use crate::stages::StageMapper;
use crate::timeline::TimelineReducer;
use crate::types::CandidateId;

/// Everything one run produces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineReport {
    /// Rows of accepted episodes, in episode order.
    pub accepted: Vec<TimelineRow>,
    /// Rows of episodes routed to manual review.
    pub manual_review: Vec<TimelineRow>,
    /// Rows of review episodes that reached a Hired stage.
    pub hired_in_review: Vec<TimelineRow>,
    pub referred_candidates: BTreeSet<CandidateId>,
    pub talent_pool_candidates: BTreeSet<CandidateId>,
    pub stats: PipelineStats,
}

impl TimelineReport {
    /// Distinct episode ids in the accepted set.
    pub fn accepted_episode_ids(&self) -> Vec<String> {
        episode_ids(&self.accepted)
    }

    /// Distinct episode ids in the manual-review set.
    pub fn manual_review_episode_ids(&self) -> Vec<String> {
        episode_ids(&self.manual_review)
    }
}

fn episode_ids(rows: &[TimelineRow]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for row in rows {
        if ids.last() != Some(&row.episode_id) {
            ids.push(row.episode_id.clone());
        }
    }
    ids
}

/// Runs the six stages over one batch of raw events.
pub struct Pipeline {
    rules: ReferenceRules,
    config: PipelineConfig,
}

impl Pipeline {
    /// Pipeline with the default configuration.
    pub fn new(rules: ReferenceRules) -> Self {
        Self::with_config(rules, PipelineConfig::default())
    }

    pub fn with_config(rules: ReferenceRules, config: PipelineConfig) -> Self {
        Self { rules, config }
    }

    pub fn rules(&self) -> &ReferenceRules {
        &self.rules
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the episode arena, with every stage applied, plus the run counters.
    pub fn build_episodes(
        &self,
        raw: &[RawEvent],
    ) -> Result<(EpisodeArena, NormalizedSideChannels, PipelineStats), PipelineError> {
        self.config.validate()?;
        let mut stats = PipelineStats::default();
        let normalized = EventNormalizer::new(&self.rules, &self.config).normalize(raw, &mut stats)?;
        let side_channels = NormalizedSideChannels {
            referred_candidates: normalized.referred_candidates,
            talent_pool_candidates: normalized.talent_pool_candidates,
        };
        let mut arena = EpisodeSegmenter::new(&self.config).segment(normalized.events, &mut stats);
        StageMapper::new(&self.rules, &self.config).map(&mut arena, &mut stats);
        TimelineReducer::new(&self.config).reduce(&mut arena, &mut stats);
        OutcomeClassifier::new(&self.rules).classify(&mut arena, &mut stats);
        OrderValidator::new(&self.rules, &self.config).validate(&mut arena, &mut stats);
        Ok((arena, side_channels, stats))
    }

    /// Run every stage and route the resulting rows.
    pub fn run(&self, raw: &[RawEvent]) -> Result<TimelineReport, PipelineError> {
        let (arena, side_channels, mut stats) = self.build_episodes(raw)?;
        let routing = route(&arena, &mut stats);
        let accepted = side_channels.rows_for(&arena, &routing.accepted);
        let manual_review = side_channels.rows_for(&arena, &routing.manual_review);
        let hired_in_review = side_channels.rows_for(&arena, &routing.hired_in_review);
        let report = TimelineReport {
            accepted,
            manual_review,
            hired_in_review,
            referred_candidates: side_channels.referred_candidates,
            talent_pool_candidates: side_channels.talent_pool_candidates,
            stats,
        };
        info!(
            accepted_rows = report.accepted.len(),
            manual_review_rows = report.manual_review.len(),
            retention = report.stats.event_retention(),
            "pipeline finished"
        );
        Ok(report)
    }
}

/// Candidate sets collected during normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedSideChannels {
    pub referred_candidates: BTreeSet<CandidateId>,
    pub talent_pool_candidates: BTreeSet<CandidateId>,
}

impl NormalizedSideChannels {
    /// Output rows of the episodes in `keys`, tagged with the candidate flags.
    pub fn rows_for(&self, arena: &EpisodeArena, keys: &[EpisodeKey]) -> Vec<TimelineRow> {
        keys.iter()
            .filter_map(|key| arena.get(key))
            .flat_map(TimelineRow::from_episode)
            .map(|mut row| {
                row.is_referred = self.referred_candidates.contains(&row.candidate_id);
                row.is_talent_pool = self.talent_pool_candidates.contains(&row.candidate_id);
                row
            })
            .collect()
    }
}
