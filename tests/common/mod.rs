#![allow(dead_code)]

use candidate_timelines::{RawEvent, ReferenceRules};
use chrono::{NaiveDate, NaiveDateTime};

pub const DATA_JOB: &str = "Data Analytics - Data Analyst - Cairo";
pub const RESEARCH_JOB: &str = "Business Research - Research Analyst - Barcelona";
pub const RESEARCH_SENIOR_JOB: &str =
    "Business Research - Senior Consultant - Dubai - Arabic Speaker";

const STAGE_MAP: [(&str, &str); 8] = [
    ("applied", "Applied"),
    ("sourced", "Applied"),
    ("applied with moved to job position", "Applied"),
    ("automated test sent", "Automated test"),
    ("hr interview", "HR Interview"),
    ("offer", "Offer"),
    ("hired", "Hired"),
    ("disqualified", "Out of Process"),
];

const RANKS: [(&str, i64); 6] = [
    ("Applied", 1),
    ("Automated test", 2),
    ("HR Interview", 3),
    ("Offer", 4),
    ("Hired", 5),
    ("Out of Process", 6),
];

/// Reference tables covering two departments with a conventional stage order.
pub fn rules() -> ReferenceRules {
    let mut rules = ReferenceRules::new()
        .with_activity("Applied", "Applied", true)
        .with_activity("Sourced", "sourced", true)
        .with_activity("Moved stage to Automated test", "automated test sent", true)
        .with_activity("Moved stage to HR Interview", "hr interview", true)
        .with_activity("Moved stage to Offer", "offer", true)
        .with_activity("Hired", "hired", true)
        .with_activity("Disqualified", "Disqualified", true)
        .with_activity("Reverted", "reverted", true)
        .with_activity("Left a note", "note", false)
        .with_activity("Referred a candidate", "referred a candidate", true)
        .with_activity("Added to talent pool", "talent pool", false)
        .with_seniority("Data Analyst", false)
        .with_seniority("Research Analyst", false)
        .with_sla_target("Data Analytics", false, "applied ==> hr interview", 2023, 3.0);
    for (department, is_research) in [("Data Analytics", false), ("Business Research", true)] {
        for recency in [false, true] {
            for (activity, stage) in STAGE_MAP {
                rules.insert_stage_rule(department, is_research, recency, activity, stage);
            }
            for senior in [false, true] {
                for (stage, rank) in RANKS {
                    rules.insert_rank(stage, department, recency, senior, rank);
                }
            }
        }
    }
    rules
}

pub fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn raw(candidate: &str, job: &str, activity: &str, ts: NaiveDateTime) -> RawEvent {
    RawEvent::new(
        candidate,
        job,
        activity,
        ts.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
