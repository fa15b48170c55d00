use chrono::Datelike;
use tracing::{info, warn};

use crate::constants::stages::{
    APPLIED, HIRED, OUT_OF_PROCESS, REVERSAL_TRANSITION, TRANSITION_ARROW,
};
use crate::data::{Episode, EpisodeArena, Outcome, StageEvent, TerminalStatus};
use crate::metrics::PipelineStats;
use crate::reference::ReferenceRules;
use crate::types::StageTransition;

/// `"{previous} ==> {current}"`, lower-cased and trimmed.
pub fn transition_label(previous: Option<&str>, current: &str) -> StageTransition {
    format!(
        "{}{}{}",
        previous.unwrap_or_default(),
        TRANSITION_ARROW,
        current
    )
    .trim()
    .to_lowercase()
}

/// Terminal status implied by the last stage of a timeline.
pub fn terminal_status(stages: &[StageEvent]) -> TerminalStatus {
    match stages.last() {
        Some(stage) if stage.is_stage(HIRED) => TerminalStatus::Hired,
        Some(stage) if stage.is_stage(OUT_OF_PROCESS) => TerminalStatus::OutOfProcess,
        _ => TerminalStatus::InPipeline,
    }
}

/// Terminal status, transitions, SLA targets and outcome flags.
pub struct OutcomeClassifier<'a> {
    rules: &'a ReferenceRules,
}

impl<'a> OutcomeClassifier<'a> {
    pub fn new(rules: &'a ReferenceRules) -> Self {
        Self { rules }
    }

    pub fn classify(&self, arena: &mut EpisodeArena, stats: &mut PipelineStats) {
        for episode in arena.iter_mut() {
            let outcome = self.classify_episode(episode);
            match outcome.terminal_status {
                TerminalStatus::Hired => stats.hired_episodes += 1,
                TerminalStatus::OutOfProcess => stats.out_of_process_episodes += 1,
                TerminalStatus::InPipeline => stats.in_pipeline_episodes += 1,
            }
            if outcome.reversal_flag {
                stats.reversed_hires += 1;
                warn!(episode = %episode.key, "hire reversed to out of process");
            }
            if outcome.rejected_offer {
                stats.rejected_offers += 1;
            }
            stats.sla_targets_matched += episode
                .stages
                .iter()
                .filter(|stage| stage.sla_target.is_some())
                .count();
            episode.outcome = Some(outcome);
        }
        info!(
            hired = stats.hired_episodes,
            out_of_process = stats.out_of_process_episodes,
            in_pipeline = stats.in_pipeline_episodes,
            sla_matched = stats.sla_targets_matched,
            "classified outcomes"
        );
    }

    fn classify_episode(&self, episode: &mut Episode) -> Outcome {
        let start_year = episode
            .stages
            .first()
            .map(|stage| stage.timestamp.year())
            .unwrap_or_default();
        let mut previous: Option<String> = None;
        let mut reversal_flag = false;
        for stage in episode.stages.iter_mut() {
            stage.stage_transition = transition_label(previous.as_deref(), &stage.stage);
            reversal_flag |= stage.stage_transition == REVERSAL_TRANSITION;
            stage.sla_target = self
                .rules
                .sla_target(
                    &episode.profile.department_bucket,
                    episode.is_senior,
                    &stage.stage_transition,
                    start_year,
                )
                .cloned();
            previous = Some(stage.stage.clone());
        }

        let terminal_status = terminal_status(&episode.stages);
        let hired_at = episode
            .stages
            .iter()
            .rev()
            .find(|stage| stage.is_stage(HIRED))
            .map(|stage| stage.timestamp);
        Outcome {
            terminal_status,
            reversal_flag,
            has_duplicate_stage: episode.has_duplicate_stage,
            rejected_offer: hired_at.is_some() && terminal_status != TerminalStatus::Hired,
            hired_at,
            first_stage_applied: episode
                .stages
                .first()
                .is_some_and(|stage| stage.is_stage(APPLIED)),
            start_year,
        }
    }
}
