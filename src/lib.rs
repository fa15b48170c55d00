#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Report runner shared by the demo binary.
pub mod app;
/// Pipeline configuration.
pub mod config;
/// Centralized constants: activity and stage labels, column headers, output names.
pub mod constants;
/// Event, episode and stage types.
pub mod data;
mod hash;
/// Job-id parsing.
pub mod job;
/// Run statistics.
pub mod metrics;
/// Stage 1: timestamp and activity normalization.
pub mod normalize;
/// Stage 6: rank checks and routing.
pub mod ordering;
/// Stage 5: terminal status, transitions and SLA targets.
pub mod outcome;
/// End-to-end pipeline and report type.
pub mod pipeline;
/// Read-only lookup tables.
pub mod reference;
/// Stage 2: episode segmentation.
pub mod segment;
/// Stage 3: stage mapping and anchor synthesis.
pub mod stages;
/// Stage 4: deduplication and elapsed-time metrics.
pub mod timeline;
/// Timestamp parsing.
pub mod timestamps;
/// Input transports (delimited files today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Label normalization helpers.
pub mod utils;

mod errors;

pub use config::{PipelineConfig, TimestampStrategy};
pub use data::{
    Episode, EpisodeArena, EpisodeCohort, EpisodeKey, Event, OrderCheck, Outcome, RawEvent,
    SlaCohort, SlaTarget, StageEvent, TerminalStatus, TimelineRow,
};
pub use errors::PipelineError;
pub use hash::{report_fingerprint, rows_fingerprint};
pub use job::JobProfile;
pub use metrics::PipelineStats;
pub use normalize::{EventNormalizer, NormalizedEvents};
pub use ordering::{OrderValidator, Routing};
pub use outcome::OutcomeClassifier;
pub use pipeline::{NormalizedSideChannels, Pipeline, TimelineReport};
pub use reference::ReferenceRules;
pub use segment::EpisodeSegmenter;
pub use stages::StageMapper;
pub use timeline::TimelineReducer;
pub use types::{
    ActorName, CandidateId, CanonicalActivity, Comment, DepartmentBucket, JobId, Rank,
    RawActivity, RowIndex, StageName, StageTransition,
};
