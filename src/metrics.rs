use serde::{Deserialize, Serialize};

use crate::data::EpisodeCohort;

/// Row and episode accounting for one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub input_rows: usize,
    pub dropped_placeholder_candidates: usize,
    pub dropped_non_process_steps: usize,
    pub referral_events: usize,
    pub referred_candidates: usize,
    pub talent_pool_candidates: usize,
    pub retained_events: usize,
    pub tie_shifted_events: usize,
    pub reverted_disqualifications: usize,

    pub episodes: usize,
    pub direct_episodes: usize,
    pub transferred_at_start_episodes: usize,
    pub transferred_midstream_episodes: usize,
    pub inconsistent_episodes: usize,

    pub clamped_events: usize,
    pub mapped_stage_events: usize,
    pub unmapped_stage_events: usize,
    pub stageless_episodes: usize,
    pub synthesized_anchors: usize,

    pub duplicate_stage_visits_removed: usize,
    pub episodes_with_duplicate_stages: usize,
    pub vanilla_episodes: usize,
    pub non_vanilla_episodes: usize,

    pub hired_episodes: usize,
    pub out_of_process_episodes: usize,
    pub in_pipeline_episodes: usize,
    pub reversed_hires: usize,
    pub rejected_offers: usize,
    pub sla_targets_matched: usize,

    pub red_flagged_episodes: usize,
    pub accepted_episodes: usize,
    pub manual_review_episodes: usize,
    pub hired_in_review_episodes: usize,
}

impl PipelineStats {
    /// Count one segmented episode under its cohort.
    pub fn record_cohort(&mut self, cohort: EpisodeCohort) {
        match cohort {
            EpisodeCohort::Direct => self.direct_episodes += 1,
            EpisodeCohort::TransferredAtStart => self.transferred_at_start_episodes += 1,
            EpisodeCohort::TransferredMidstream => self.transferred_midstream_episodes += 1,
        }
    }

    /// Share of input rows that survived normalization.
    pub fn event_retention(&self) -> f64 {
        retention(self.retained_events, self.input_rows)
    }

    /// Share of retained events that mapped to a stage.
    pub fn stage_mapping_rate(&self) -> f64 {
        retention(self.mapped_stage_events, self.retained_events)
    }

    /// Share of routed episodes that were red-flagged.
    pub fn red_flag_rate(&self) -> f64 {
        retention(
            self.red_flagged_episodes,
            self.episodes.saturating_sub(self.stageless_episodes),
        )
    }
}

/// `kept / total`, or `0.0` when nothing was there to keep.
pub fn retention(kept: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        kept as f64 / total as f64
    }
}
