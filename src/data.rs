use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::job::JobProfile;

use crate::types::{
    ActorName, CandidateId, CanonicalActivity, Comment, DepartmentBucket, JobId, Rank,
    RawActivity, RowIndex, StageName, StageTransition,
};

/// One row of the activity report, before any interpretation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub raw_activity: RawActivity,
    pub raw_timestamp: String,
    /// User who performed the activity, when exported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorName>,
}

impl RawEvent {
    /// Build a row without an actor.
    pub fn new(
        candidate_id: impl Into<CandidateId>,
        job_id: impl Into<JobId>,
        raw_activity: impl Into<RawActivity>,
        raw_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            job_id: job_id.into(),
            raw_activity: raw_activity.into(),
            raw_timestamp: raw_timestamp.into(),
            actor: None,
        }
    }

    /// Attach the acting user.
    pub fn with_actor(mut self, actor: impl Into<ActorName>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// A retained, classified event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Index of the source row; the stable secondary sort key.
    pub row: RowIndex,
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub raw_activity: RawActivity,
    pub canonical_activity: CanonicalActivity,
    /// Timestamp as parsed from the source row.
    pub timestamp: NaiveDateTime,
    /// Timestamp after tie-breaking (and, later, floor clamping).
    pub adjusted_timestamp: NaiveDateTime,
    pub is_hr_actor: bool,
}

impl Event {
    /// Deterministic ordering key inside a group.
    pub fn order_key(&self) -> (NaiveDateTime, RowIndex) {
        (self.adjusted_timestamp, self.row)
    }
}

/// Identity of one application attempt.
///
/// Ordering is (candidate, job, disqualification count), which is also the
/// output order of episodes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    /// Disqualifications that precede this attempt (0 for the first attempt).
    pub disqualification_count: u32,
}

impl EpisodeKey {
    /// One-based attempt number.
    pub fn attempt(&self) -> u32 {
        self.disqualification_count + 1
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.candidate_id, self.job_id, self.attempt())
    }
}

/// Segmentation cohort an episode came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeCohort {
    /// Candidate never moved between jobs.
    Direct,
    /// Candidate's first-ever activity was their only job move.
    TransferredAtStart,
    /// Candidate moved jobs somewhere after their first activity.
    TransferredMidstream,
}

/// Which anchor stage the SLA-relative elapsed time is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaCohort {
    /// Entry-level Business Research analyst track, anchored on "Automated test".
    Vanilla,
    /// Every other episode, anchored on "HR Interview".
    #[default]
    NonVanilla,
}

/// Final status derived from the last stage of an episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Hired,
    OutOfProcess,
    InPipeline,
}

/// SLA target matched for a stage transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlaTarget {
    pub target_days: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One canonical stage visit inside an episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: StageName,
    pub timestamp: NaiveDateTime,
    /// Source row of the event this stage came from.
    pub row: RowIndex,
    pub canonical_activity: CanonicalActivity,
    pub is_hr_actor: bool,
    /// True for an "Applied" anchor cloned from the first stage event.
    pub synthesized: bool,
    pub elapsed_hours: i64,
    pub elapsed_days: f64,
    pub cumulative_elapsed_days: f64,
    pub time_since_autotest: f64,
    pub time_since_hr_interview: f64,
    /// True on the "Offer" stage, the SLA checkpoint.
    pub sla_checkpoint: bool,
    pub stage_transition: StageTransition,
    pub sla_target: Option<SlaTarget>,
    pub rank: Option<Rank>,
}

impl StageEvent {
    /// Stage visit for a mapped event, with every derived metric unset.
    pub fn from_event(event: &Event, stage: impl Into<StageName>) -> Self {
        Self {
            stage: stage.into(),
            timestamp: event.adjusted_timestamp,
            row: event.row,
            canonical_activity: event.canonical_activity.clone(),
            is_hr_actor: event.is_hr_actor,
            synthesized: false,
            elapsed_hours: 0,
            elapsed_days: 0.0,
            cumulative_elapsed_days: 0.0,
            time_since_autotest: 0.0,
            time_since_hr_interview: 0.0,
            sla_checkpoint: false,
            stage_transition: String::new(),
            sla_target: None,
            rank: None,
        }
    }

    /// Whether this visit is for `stage` (case-insensitive).
    pub fn is_stage(&self, stage: &str) -> bool {
        self.stage.trim().eq_ignore_ascii_case(stage)
    }
}

/// Episode-level verdicts produced by the outcome classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub terminal_status: TerminalStatus,
    pub reversal_flag: bool,
    pub has_duplicate_stage: bool,
    /// A Hired stage was reached but the episode did not end there.
    pub rejected_offer: bool,
    pub hired_at: Option<NaiveDateTime>,
    pub first_stage_applied: bool,
    /// Year of the first stage event, used for SLA target lookups.
    pub start_year: i32,
}

/// Episode-level verdict produced by the order validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCheck {
    /// 1 when the rank sequence is not monotonic, else 0.
    pub red_flag: u8,
    pub comment: Comment,
}

impl OrderCheck {
    pub fn is_flagged(&self) -> bool {
        self.red_flag != 0
    }
}

/// One application attempt and everything derived for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub key: EpisodeKey,
    pub cohort: EpisodeCohort,
    /// Events in (adjusted timestamp, row) order.
    pub events: Vec<Event>,
    /// Outcome of the entrance/disqualification balance check.
    pub consistent: bool,
    pub profile: JobProfile,
    pub is_senior: bool,
    pub is_business_research: bool,
    pub recency_flag: bool,
    /// Stage visits in timestamp order.
    pub stages: Vec<StageEvent>,
    pub anchor_synthesized: bool,
    pub has_duplicate_stage: bool,
    pub sla_cohort: SlaCohort,
    pub outcome: Option<Outcome>,
    pub order: Option<OrderCheck>,
}

impl Episode {
    /// Fresh episode as produced by segmentation.
    pub fn new(
        key: EpisodeKey,
        cohort: EpisodeCohort,
        events: Vec<Event>,
        consistent: bool,
        profile: JobProfile,
    ) -> Self {
        Self {
            key,
            cohort,
            events,
            consistent,
            profile,
            is_senior: true,
            is_business_research: false,
            recency_flag: false,
            stages: Vec::new(),
            anchor_synthesized: false,
            has_duplicate_stage: false,
            sla_cohort: SlaCohort::default(),
            outcome: None,
            order: None,
        }
    }

    /// Earliest adjusted timestamp among the episode's events.
    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.events.iter().map(|event| event.adjusted_timestamp).min()
    }

    /// Whether any stage visit is for `stage`.
    pub fn has_stage(&self, stage: &str) -> bool {
        self.stages.iter().any(|visit| visit.is_stage(stage))
    }

    /// Whether the order validator raised a red flag.
    pub fn is_red_flagged(&self) -> bool {
        self.order.as_ref().is_some_and(OrderCheck::is_flagged)
    }

    /// Terminal status, once classified.
    pub fn terminal_status(&self) -> Option<TerminalStatus> {
        self.outcome.as_ref().map(|outcome| outcome.terminal_status)
    }
}

/// Episodes indexed by key; iteration order is the deterministic output order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeArena {
    episodes: BTreeMap<EpisodeKey, Episode>,
}

impl EpisodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `episode`, merging events into an existing episode with the same key.
    pub fn insert(&mut self, episode: Episode) {
        match self.episodes.get_mut(&episode.key) {
            Some(existing) => {
                existing.events.extend(episode.events);
                existing.events.sort_by_key(Event::order_key);
                existing.consistent &= episode.consistent;
            }
            None => {
                self.episodes.insert(episode.key.clone(), episode);
            }
        }
    }

    pub fn get(&self, key: &EpisodeKey) -> Option<&Episode> {
        self.episodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Episode> {
        self.episodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Episode> {
        self.episodes.values_mut()
    }

    /// Keep only episodes for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Episode) -> bool) {
        self.episodes.retain(|_, episode| keep(episode));
    }
}

impl FromIterator<Episode> for EpisodeArena {
    fn from_iter<I: IntoIterator<Item = Episode>>(iter: I) -> Self {
        let mut arena = Self::new();
        for episode in iter {
            arena.insert(episode);
        }
        arena
    }
}

/// One output row per surviving stage visit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    pub episode_id: String,
    pub candidate_id: CandidateId,
    pub job_id: JobId,
    pub attempt: u32,
    pub cohort: EpisodeCohort,
    pub department_bucket: DepartmentBucket,
    pub position: String,
    pub country: Option<String>,
    pub is_senior: bool,
    pub recency_flag: bool,
    pub sla_cohort: SlaCohort,
    pub consistent: bool,
    pub stage: StageName,
    pub timestamp: NaiveDateTime,
    pub synthesized: bool,
    pub is_hr_actor: bool,
    pub elapsed_hours: i64,
    pub elapsed_days: f64,
    pub cumulative_elapsed_days: f64,
    pub time_since_autotest: f64,
    pub time_since_hr_interview: f64,
    pub sla_checkpoint: bool,
    pub stage_transition: StageTransition,
    pub sla_target_days: Option<f64>,
    pub terminal_status: Option<TerminalStatus>,
    pub reversal_flag: bool,
    pub has_duplicate_stage: bool,
    pub rejected_offer: bool,
    pub hired_at: Option<NaiveDateTime>,
    pub red_flag: u8,
    pub comment: Comment,
    pub rank: Option<Rank>,
    pub is_referred: bool,
    pub is_talent_pool: bool,
}

impl TimelineRow {
    /// Flatten every stage visit of `episode` into output rows.
    ///
    /// Candidate-level flags start cleared; the pipeline sets them from the
    /// normalization side channels.
    pub fn from_episode(episode: &Episode) -> Vec<Self> {
        let episode_id = episode.key.to_string();
        let outcome = episode.outcome.as_ref();
        let order = episode.order.as_ref();
        episode
            .stages
            .iter()
            .map(|stage| Self {
                episode_id: episode_id.clone(),
                candidate_id: episode.key.candidate_id.clone(),
                job_id: episode.key.job_id.clone(),
                attempt: episode.key.attempt(),
                cohort: episode.cohort,
                department_bucket: episode.profile.department_bucket.clone(),
                position: episode.profile.position.clone(),
                country: episode.profile.country.clone(),
                is_senior: episode.is_senior,
                recency_flag: episode.recency_flag,
                sla_cohort: episode.sla_cohort,
                consistent: episode.consistent,
                stage: stage.stage.clone(),
                timestamp: stage.timestamp,
                synthesized: stage.synthesized,
                is_hr_actor: stage.is_hr_actor,
                elapsed_hours: stage.elapsed_hours,
                elapsed_days: stage.elapsed_days,
                cumulative_elapsed_days: stage.cumulative_elapsed_days,
                time_since_autotest: stage.time_since_autotest,
                time_since_hr_interview: stage.time_since_hr_interview,
                sla_checkpoint: stage.sla_checkpoint,
                stage_transition: stage.stage_transition.clone(),
                sla_target_days: stage.sla_target.as_ref().map(|target| target.target_days),
                terminal_status: outcome.map(|outcome| outcome.terminal_status),
                reversal_flag: outcome.is_some_and(|outcome| outcome.reversal_flag),
                has_duplicate_stage: outcome.is_some_and(|outcome| outcome.has_duplicate_stage),
                rejected_offer: outcome.is_some_and(|outcome| outcome.rejected_offer),
                hired_at: outcome.and_then(|outcome| outcome.hired_at),
                red_flag: order.map(|order| order.red_flag).unwrap_or_default(),
                comment: order.map(|order| order.comment.clone()).unwrap_or_default(),
                rank: stage.rank,
                is_referred: false,
                is_talent_pool: false,
            })
            .collect()
    }
}
