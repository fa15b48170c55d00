/// Canonical activity labels the pipeline branches on.
pub mod activities {
    /// Entrance activity for a direct application.
    pub const APPLIED: &str = "applied";
    /// Entrance activity for a sourced candidate.
    pub const SOURCED: &str = "sourced";
    /// Entrance activity for a candidate uploaded by a recruiter.
    pub const UPLOADED_TO_JOB: &str = "uploaded to job";
    /// Manual disqualification.
    pub const DISQUALIFIED: &str = "disqualified";
    /// Automatic disqualification.
    pub const AUTO_DISQUALIFIED: &str = "auto-disqualified";
    /// Consolidated label for every "moved to job"/"copied to job" variant.
    pub const MOVED_TO_JOB_POSITION: &str = "moved to job position";
    /// Relabel applied when a candidate's very first activity is a job move.
    pub const APPLIED_WITH_MOVED_TO_JOB_POSITION: &str = "applied with moved to job position";
    /// Side-channel activity collected for the referral flag.
    pub const REFERRED_A_CANDIDATE: &str = "referred a candidate";
    /// Undo of the activity right before it.
    pub const REVERTED: &str = "reverted";
    /// Alias collapsed into [`UNSNOOZED`].
    pub const WOKEN_UP: &str = "woken up";
    /// Canonical label for reactivated candidates.
    pub const UNSNOOZED: &str = "unsnoozed";

    /// Activities that count as an entrance into a job pipeline.
    pub const ENTRANCES: [&str; 3] = [APPLIED, SOURCED, UPLOADED_TO_JOB];
    /// Activities that end an application attempt.
    pub const DISQUALIFICATIONS: [&str; 2] = [DISQUALIFIED, AUTO_DISQUALIFIED];
    /// Raw-label fragments that mark a job transfer (matched case-insensitively).
    pub const JOB_MOVE_MARKERS: [&str; 2] = ["moved to job", "copied to job"];
    /// Raw-label fragment that marks talent-pool activity.
    pub const TALENT_POOL_MARKER: &str = "talent";
}

/// Canonical stage labels the pipeline branches on.
pub mod stages {
    /// First stage of every episode.
    pub const APPLIED: &str = "Applied";
    /// SLA anchor for vanilla episodes.
    pub const AUTOMATED_TEST: &str = "Automated test";
    /// SLA anchor for non-vanilla episodes.
    pub const HR_INTERVIEW: &str = "HR Interview";
    /// SLA checkpoint stage.
    pub const OFFER: &str = "Offer";
    /// Terminal hired stage.
    pub const HIRED: &str = "Hired";
    /// Terminal out-of-process stage.
    pub const OUT_OF_PROCESS: &str = "Out of Process";
    /// Separator between previous and current stage in a transition label.
    pub const TRANSITION_ARROW: &str = " ==> ";
    /// Transition that marks a hire being reversed.
    pub const REVERSAL_TRANSITION: &str = "hired ==> out of process";
}

/// Job-id layout and department buckets.
pub mod jobs {
    /// Separator between job-id fields.
    pub const JOB_FIELD_SEPARATOR: char = '-';
    /// Maximum number of job-id fields (the last one keeps any extra separators).
    pub const JOB_FIELD_COUNT: usize = 4;
    /// Department bucket with its own stage rules and reorganization cutoff.
    pub const BUSINESS_RESEARCH: &str = "Business Research";
    /// Bucket shared by every support department.
    pub const SERVICE_TEAM: &str = "Service Team";
    /// Specificity assumed when a job id leaves it blank.
    pub const CORE_SPECIFICITY: &str = "Core";
    /// Placeholder written by the exporter for a missing candidate.
    pub const CANDIDATE_PLACEHOLDER: &str = "-";
}

/// Comments stamped by the order validator.
pub mod comments {
    /// Rank sequence is monotonic.
    pub const OK: &str = "OK";
    /// Rank sequence decreases somewhere (or a rank is missing).
    pub const ACTIONS_NOT_IN_RIGHT_ORDER: &str = "actions not in right order";
}

/// Column headers expected in the delimited input tables.
pub mod columns {
    /// Columns of the activity report.
    pub const EVENTS: [&str; 5] = ["Name", "Activity", "Candidate", "Job", "Creation time"];
    /// Columns of the activity dictionary.
    pub const ACTIVITY_MAP: [&str; 3] = ["Activity", "New_Activity", "Act_Is_Step"];
    /// Columns of the HR roster.
    pub const HR_ROSTER: [&str; 2] = ["Name", "Name_Is_HRTeam"];
    /// Columns of the stage-mapping rules.
    pub const STAGE_RULES: [&str; 5] = [
        "Department_ST",
        "is_BR",
        "BR_updated_in_july_2023",
        "New_Activity",
        "Process_Step",
    ];
    /// Columns of the rank table.
    pub const RANK_TABLE: [&str; 5] = ["Process_Step", "Department_ST", "updated", "is_senior", "rank"];
    /// Columns of the SLA target table.
    pub const SLA_TARGETS: [&str; 5] = [
        "Department_ST",
        "is_senior",
        "Stage_advancement",
        "Year_process_started",
        "Target Value in nb of days",
    ];
    /// Optional SLA target label column.
    pub const SLA_TARGET_NAME: &str = "Target Name";
    /// Columns of the seniority dictionary.
    pub const SENIORITY_MAP: [&str; 2] = ["Job Position", "is_senior"];
}

/// Table names used in diagnostics.
pub mod tables {
    /// Activity report.
    pub const EVENTS: &str = "events";
    /// Activity dictionary.
    pub const ACTIVITY_MAP: &str = "activity_map";
    /// HR roster.
    pub const HR_ROSTER: &str = "hr_roster";
    /// Stage rules.
    pub const STAGE_RULES: &str = "stage_rules";
    /// Rank table.
    pub const RANK_TABLE: &str = "rank_table";
    /// SLA targets.
    pub const SLA_TARGETS: &str = "sla_targets";
    /// Seniority dictionary.
    pub const SENIORITY_MAP: &str = "seniority_map";
}

/// Default output filenames written by the report runner.
pub mod output {
    /// Accepted rows (JSON lines).
    pub const ACCEPTED_FILENAME: &str = "accepted.jsonl";
    /// Manual-review rows (JSON lines).
    pub const MANUAL_REVIEW_FILENAME: &str = "manual_review.jsonl";
    /// Review rows whose episode reached a Hired stage (JSON lines).
    pub const HIRED_IN_REVIEW_FILENAME: &str = "hired_in_review.jsonl";
    /// Run statistics (JSON).
    pub const STATS_FILENAME: &str = "stats.json";
}
