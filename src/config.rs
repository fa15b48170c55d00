use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use crate::constants::jobs::BUSINESS_RESEARCH;
use crate::errors::PipelineError;
use crate::types::DepartmentBucket;

/// How raw timestamp strings are matched against the configured formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimestampStrategy {
    /// Commit to the first format that parses every value in the column.
    #[default]
    WholeColumn,
    /// Try each format per value, so a log may mix formats across rows.
    PerRow,
}

/// Business constants driving the pipeline.
///
/// Every field has a production default; tests and callers override single
/// fields with struct-update syntax.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// `chrono` formats tried in order when parsing raw timestamps.
    pub timestamp_formats: Vec<String>,
    /// Column-wide or per-row format detection.
    pub timestamp_strategy: TimestampStrategy,
    /// Shift applied to an event that shares its timestamp with the previous one.
    pub tie_break_offset: Duration,
    /// Distance between the synthesized "Applied" anchor and the first stage event.
    pub anchor_offset: Duration,
    /// Timestamps before this instant are pulled forward to it (archived jobs).
    pub floor: NaiveDateTime,
    /// Business Research episodes starting after this instant use the reorganized stage rules.
    pub reorganization_cutoff: NaiveDateTime,
    /// Department whose episodes are subject to the reorganization cutoff.
    pub research_department: DepartmentBucket,
    /// Departments collapsed into the service-team bucket.
    pub service_team_departments: Vec<String>,
    /// Location (third job-id field) to country.
    pub location_countries: BTreeMap<String, String>,
    /// Lower-cased job titles that qualify a Business Research episode as vanilla.
    pub vanilla_titles: Vec<String>,
    /// Seniority assumed for job titles missing from the seniority map.
    pub default_seniority: bool,
    /// Per-department rank-table revision dates.
    ///
    /// When a department is listed, the recency component of the rank key is
    /// `timestamp > revision` per stage event instead of the episode recency flag.
    pub rank_revisions: BTreeMap<DepartmentBucket, NaiveDateTime>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timestamp_formats: vec![
                "%m/%d/%Y %I:%M:%S %p".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%m/%d/%y %I:%M:%S %p".to_string(),
            ],
            timestamp_strategy: TimestampStrategy::default(),
            tie_break_offset: Duration::minutes(2),
            anchor_offset: Duration::minutes(5),
            floor: start_of_day(2022, 1, 1),
            reorganization_cutoff: start_of_day(2023, 7, 1),
            research_department: BUSINESS_RESEARCH.to_string(),
            service_team_departments: [
                "IT",
                "Marketing",
                "Finance",
                "Office Management",
                "HR",
                "Operations",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            location_countries: [
                ("Barcelona", "Spain"),
                ("Casablanca", "Morocco"),
                ("Mexico City", "Mexico"),
                ("Cairo", "Egypt"),
                ("Dubai", "UAE"),
                ("Kairo", "Egypt"),
            ]
            .into_iter()
            .map(|(city, country)| (city.to_string(), country.to_string()))
            .collect(),
            vanilla_titles: ["research analyst", "senior research analyst", "research associate"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            default_seniority: true,
            rank_revisions: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Rank revision dates used by the 2023 ranking dictionary.
    pub fn with_default_rank_revisions(mut self) -> Self {
        self.rank_revisions = [
            ("Business Research", start_of_day(2022, 5, 1)),
            ("Data Analytics", start_of_day(2022, 10, 1)),
            ("Business Translation", start_of_day(2023, 4, 1)),
            ("Graphic Design", start_of_day(2023, 7, 1)),
        ]
        .into_iter()
        .map(|(department, revised)| (department.to_string(), revised))
        .collect();
        self
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.timestamp_formats.is_empty() {
            return Err(PipelineError::Configuration(
                "at least one timestamp format is required".to_string(),
            ));
        }
        if self.tie_break_offset <= Duration::zero() {
            return Err(PipelineError::Configuration(format!(
                "tie-break offset must be positive, got {}",
                self.tie_break_offset
            )));
        }
        if self.anchor_offset < Duration::zero() {
            return Err(PipelineError::Configuration(format!(
                "anchor offset must not be negative, got {}",
                self.anchor_offset
            )));
        }
        Ok(())
    }

    /// Whether `department` names the research department (case-insensitive).
    pub fn is_research_department(&self, department: &str) -> bool {
        department
            .trim()
            .eq_ignore_ascii_case(self.research_department.trim())
    }

    /// Whether `title` is one of the vanilla analyst titles (case-insensitive).
    pub fn is_vanilla_title(&self, title: &str) -> bool {
        let title = title.trim();
        self.vanilla_titles
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(title))
    }
}

/// Midnight of the given calendar day.
///
/// Impossible dates collapse to `NaiveDateTime::MIN`.
pub fn start_of_day(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}
