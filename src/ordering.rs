use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::constants::comments::{ACTIONS_NOT_IN_RIGHT_ORDER, OK};
use crate::constants::stages::HIRED;
use crate::data::{Episode, EpisodeArena, EpisodeKey, OrderCheck, TerminalStatus};
use crate::metrics::PipelineStats;
use crate::reference::ReferenceRules;
use crate::types::Rank;

/// Whether every rank is present and the sequence never decreases.
pub fn is_rank_monotonic(ranks: &[Option<Rank>]) -> bool {
    if ranks.iter().any(Option::is_none) {
        return false;
    }
    ranks.windows(2).all(|pair| pair[0] <= pair[1])
}

/// Episode keys partitioned by the routing decision.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routing {
    /// Episodes whose rows go to the accepted set.
    pub accepted: Vec<EpisodeKey>,
    /// Episodes whose rows go to manual review.
    pub manual_review: Vec<EpisodeKey>,
    /// Review episodes that reached a Hired stage.
    pub hired_in_review: Vec<EpisodeKey>,
}

/// Attaches stage ranks, raises red flags and routes episodes.
pub struct OrderValidator<'a> {
    rules: &'a ReferenceRules,
    config: &'a PipelineConfig,
}

impl<'a> OrderValidator<'a> {
    pub fn new(rules: &'a ReferenceRules, config: &'a PipelineConfig) -> Self {
        Self { rules, config }
    }

    pub fn validate(&self, arena: &mut EpisodeArena, stats: &mut PipelineStats) {
        for episode in arena.iter_mut() {
            let check = self.validate_episode(episode);
            if check.is_flagged() {
                stats.red_flagged_episodes += 1;
            }
            episode.order = Some(check);
        }
        info!(red_flagged = stats.red_flagged_episodes, "validated stage order");
    }

    fn validate_episode(&self, episode: &mut Episode) -> OrderCheck {
        let bucket = &episode.profile.department_bucket;
        let revision = self
            .config
            .rank_revisions
            .iter()
            .find(|(department, _)| department.trim().eq_ignore_ascii_case(bucket.trim()))
            .map(|(_, revised)| *revised);
        for stage in episode.stages.iter_mut() {
            let recency = match revision {
                Some(revised) => stage.timestamp > revised,
                None => episode.recency_flag,
            };
            stage.rank = self
                .rules
                .rank(&stage.stage, bucket, recency, episode.is_senior);
        }
        let ranks: Vec<Option<Rank>> = episode.stages.iter().map(|stage| stage.rank).collect();
        if is_rank_monotonic(&ranks) {
            OrderCheck {
                red_flag: 0,
                comment: OK.to_string(),
            }
        } else {
            OrderCheck {
                red_flag: 1,
                comment: ACTIONS_NOT_IN_RIGHT_ORDER.to_string(),
            }
        }
    }
}

/// Route validated episodes into the accepted and manual-review sets.
///
/// Clean episodes are accepted. Red-flagged episodes go to review and are also
/// accepted when they ended in, or passed through, a Hired stage. Episodes that
/// failed the balance check go to review only.
pub fn route(arena: &EpisodeArena, stats: &mut PipelineStats) -> Routing {
    let mut routing = Routing::default();
    for episode in arena.iter() {
        let reached_hired = episode.has_stage(HIRED);
        if !episode.consistent {
            routing.manual_review.push(episode.key.clone());
            if reached_hired {
                routing.hired_in_review.push(episode.key.clone());
            }
            continue;
        }
        if !episode.is_red_flagged() {
            routing.accepted.push(episode.key.clone());
            continue;
        }
        routing.manual_review.push(episode.key.clone());
        let terminal_hired = episode.terminal_status() == Some(TerminalStatus::Hired);
        if terminal_hired || reached_hired {
            routing.accepted.push(episode.key.clone());
        }
        if reached_hired {
            routing.hired_in_review.push(episode.key.clone());
        }
    }
    stats.accepted_episodes = routing.accepted.len();
    stats.manual_review_episodes = routing.manual_review.len();
    stats.hired_in_review_episodes = routing.hired_in_review.len();
    if !routing.hired_in_review.is_empty() {
        warn!(
            episodes = routing.hired_in_review.len(),
            "hired episodes need manual review"
        );
    }
    info!(
        accepted = stats.accepted_episodes,
        manual_review = stats.manual_review_episodes,
        "routed episodes"
    );
    routing
}
