use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::constants::jobs::{
    CORE_SPECIFICITY, JOB_FIELD_COUNT, JOB_FIELD_SEPARATOR, SERVICE_TEAM,
};
use crate::types::DepartmentBucket;

/// Fields derived from a job id (`Department - Position - Location - Specificities`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProfile {
    /// Department as written in the job id.
    pub department: String,
    /// Department after collapsing support departments into the service team.
    pub department_bucket: DepartmentBucket,
    /// Job title (second field), trimmed.
    pub position: String,
    /// Location (third field), trimmed.
    pub location: String,
    /// Country resolved from the location, when known.
    pub country: Option<String>,
    /// Track specificity; blank reads as `Core`.
    pub specificity: String,
}

impl JobProfile {
    /// Split `job_id` into its fields and resolve bucket and country.
    ///
    /// Missing trailing fields are empty; the fourth field keeps any further
    /// separators (`"A - B - C - D - E"` yields specificity `"D - E"`).
    pub fn parse(job_id: &str, config: &PipelineConfig) -> Self {
        let mut fields = job_id
            .splitn(JOB_FIELD_COUNT, JOB_FIELD_SEPARATOR)
            .map(str::trim);
        let department = fields.next().unwrap_or_default().to_string();
        let position = fields.next().unwrap_or_default().to_string();
        let location = fields.next().unwrap_or_default().to_string();
        let specificity = match fields.next().unwrap_or_default() {
            "" => CORE_SPECIFICITY.to_string(),
            other => other.to_string(),
        };
        let department_bucket = bucket_department(&department, config);
        let country = config.location_countries.get(&location).cloned();
        Self {
            department,
            department_bucket,
            position,
            location,
            country,
            specificity,
        }
    }

    /// Whether the specificity is the standard `Core` track.
    pub fn is_core(&self) -> bool {
        self.specificity.eq_ignore_ascii_case(CORE_SPECIFICITY)
    }
}

fn bucket_department(department: &str, config: &PipelineConfig) -> DepartmentBucket {
    if config
        .service_team_departments
        .iter()
        .any(|service| service == department)
    {
        SERVICE_TEAM.to_string()
    } else {
        department.to_string()
    }
}
