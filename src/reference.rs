use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data::SlaTarget;
use crate::types::{CanonicalActivity, Rank, StageName};
use crate::utils::label_key;

/// Activity-map entry for one raw label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Canonical activity as written in the map (may be blank).
    pub canonical_activity: CanonicalActivity,
    /// `false` marks non-pipeline activity that is dropped during normalization.
    pub is_process_step: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct StageRuleKey {
    department_bucket: String,
    is_business_research: bool,
    recency_flag: bool,
    canonical_activity: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct RankKey {
    stage: String,
    department_bucket: String,
    recency_flag: bool,
    is_senior: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SlaKey {
    department_bucket: String,
    is_senior: bool,
    stage_transition: String,
    start_year: i32,
}

/// Read-only lookup tables consulted by the pipeline.
///
/// Keys are normalized with [`label_key`] on insert and on lookup, so labels
/// match regardless of case and repeated whitespace. Later inserts for the
/// same key replace earlier ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceRules {
    activities: IndexMap<String, ActivityEntry>,
    hr_roster: IndexMap<String, bool>,
    stage_rules: IndexMap<StageRuleKey, StageName>,
    ranks: IndexMap<RankKey, Rank>,
    sla_targets: IndexMap<SlaKey, SlaTarget>,
    seniority: IndexMap<String, bool>,
}

impl ReferenceRules {
    /// Empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a raw activity label.
    pub fn insert_activity(
        &mut self,
        raw_activity: &str,
        canonical_activity: &str,
        is_process_step: bool,
    ) {
        self.activities.insert(
            label_key(raw_activity),
            ActivityEntry {
                canonical_activity: canonical_activity.trim().to_string(),
                is_process_step,
            },
        );
    }

    /// Record whether `actor` belongs to the HR team.
    pub fn insert_hr_member(&mut self, actor: &str, is_hr_staff: bool) {
        self.hr_roster.insert(label_key(actor), is_hr_staff);
    }

    /// Map a canonical activity to a stage for one department context.
    pub fn insert_stage_rule(
        &mut self,
        department_bucket: &str,
        is_business_research: bool,
        recency_flag: bool,
        canonical_activity: &str,
        stage: &str,
    ) {
        self.stage_rules.insert(
            StageRuleKey {
                department_bucket: label_key(department_bucket),
                is_business_research,
                recency_flag,
                canonical_activity: label_key(canonical_activity),
            },
            stage.trim().to_string(),
        );
    }

    /// Rank of `stage` for one department context.
    pub fn insert_rank(
        &mut self,
        stage: &str,
        department_bucket: &str,
        recency_flag: bool,
        is_senior: bool,
        rank: Rank,
    ) {
        self.ranks.insert(
            RankKey {
                stage: label_key(stage),
                department_bucket: label_key(department_bucket),
                recency_flag,
                is_senior,
            },
            rank,
        );
    }

    /// SLA target for one stage transition.
    pub fn insert_sla_target(
        &mut self,
        department_bucket: &str,
        is_senior: bool,
        stage_transition: &str,
        start_year: i32,
        target: SlaTarget,
    ) {
        self.sla_targets.insert(
            SlaKey {
                department_bucket: label_key(department_bucket),
                is_senior,
                stage_transition: label_key(stage_transition),
                start_year,
            },
            target,
        );
    }

    /// Seniority of a job title.
    pub fn insert_seniority(&mut self, job_title: &str, is_senior: bool) {
        self.seniority.insert(label_key(job_title), is_senior);
    }

    /// Builder form of [`ReferenceRules::insert_activity`].
    pub fn with_activity(
        mut self,
        raw_activity: &str,
        canonical_activity: &str,
        is_process_step: bool,
    ) -> Self {
        self.insert_activity(raw_activity, canonical_activity, is_process_step);
        self
    }

    /// Builder form of [`ReferenceRules::insert_hr_member`].
    pub fn with_hr_member(mut self, actor: &str, is_hr_staff: bool) -> Self {
        self.insert_hr_member(actor, is_hr_staff);
        self
    }

    /// Builder form of [`ReferenceRules::insert_stage_rule`].
    pub fn with_stage_rule(
        mut self,
        department_bucket: &str,
        is_business_research: bool,
        recency_flag: bool,
        canonical_activity: &str,
        stage: &str,
    ) -> Self {
        self.insert_stage_rule(
            department_bucket,
            is_business_research,
            recency_flag,
            canonical_activity,
            stage,
        );
        self
    }

    /// Builder form of [`ReferenceRules::insert_rank`].
    pub fn with_rank(
        mut self,
        stage: &str,
        department_bucket: &str,
        recency_flag: bool,
        is_senior: bool,
        rank: Rank,
    ) -> Self {
        self.insert_rank(stage, department_bucket, recency_flag, is_senior, rank);
        self
    }

    /// Builder form of [`ReferenceRules::insert_sla_target`].
    pub fn with_sla_target(
        mut self,
        department_bucket: &str,
        is_senior: bool,
        stage_transition: &str,
        start_year: i32,
        target_days: f64,
    ) -> Self {
        self.insert_sla_target(
            department_bucket,
            is_senior,
            stage_transition,
            start_year,
            SlaTarget {
                target_days,
                name: None,
            },
        );
        self
    }

    /// Builder form of [`ReferenceRules::insert_seniority`].
    pub fn with_seniority(mut self, job_title: &str, is_senior: bool) -> Self {
        self.insert_seniority(job_title, is_senior);
        self
    }

    /// Activity-map entry for a raw label.
    pub fn activity(&self, raw_activity: &str) -> Option<&ActivityEntry> {
        self.activities.get(&label_key(raw_activity))
    }

    /// Whether `actor` is listed as HR staff. Unknown actors are not.
    pub fn is_hr_actor(&self, actor: &str) -> bool {
        self.hr_roster
            .get(&label_key(actor))
            .copied()
            .unwrap_or(false)
    }

    /// Stage for a canonical activity in a department context.
    pub fn stage_for(
        &self,
        department_bucket: &str,
        is_business_research: bool,
        recency_flag: bool,
        canonical_activity: &str,
    ) -> Option<&StageName> {
        self.stage_rules.get(&StageRuleKey {
            department_bucket: label_key(department_bucket),
            is_business_research,
            recency_flag,
            canonical_activity: label_key(canonical_activity),
        })
    }

    /// Rank of a stage in a department context.
    pub fn rank(
        &self,
        stage: &str,
        department_bucket: &str,
        recency_flag: bool,
        is_senior: bool,
    ) -> Option<Rank> {
        self.ranks
            .get(&RankKey {
                stage: label_key(stage),
                department_bucket: label_key(department_bucket),
                recency_flag,
                is_senior,
            })
            .copied()
    }

    /// SLA target for a transition.
    pub fn sla_target(
        &self,
        department_bucket: &str,
        is_senior: bool,
        stage_transition: &str,
        start_year: i32,
    ) -> Option<&SlaTarget> {
        self.sla_targets.get(&SlaKey {
            department_bucket: label_key(department_bucket),
            is_senior,
            stage_transition: label_key(stage_transition),
            start_year,
        })
    }

    /// Seniority recorded for a job title.
    pub fn seniority(&self, job_title: &str) -> Option<bool> {
        self.seniority.get(&label_key(job_title)).copied()
    }

    /// Number of activity-map entries.
    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    /// Number of stage rules.
    pub fn stage_rule_count(&self) -> usize {
        self.stage_rules.len()
    }

    /// Number of rank-table entries.
    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_spacing() {
        let rules = ReferenceRules::new()
            .with_activity("Moved  stage to Offer", "offer sent", true)
            .with_hr_member("Dana Smith", true)
            .with_stage_rule("Data Analytics", false, false, "offer sent", "Offer")
            .with_rank("Offer", "Data Analytics", false, true, 7)
            .with_seniority("Data Analyst", false);

        let entry = rules.activity("moved stage to offer").expect("activity");
        assert_eq!(entry.canonical_activity, "offer sent");
        assert!(entry.is_process_step);
        assert!(rules.is_hr_actor("dana smith"));
        assert!(!rules.is_hr_actor("Someone Else"));
        assert_eq!(
            rules
                .stage_for("data analytics", false, false, "Offer Sent")
                .map(String::as_str),
            Some("Offer")
        );
        assert_eq!(rules.rank("offer", "Data Analytics", false, true), Some(7));
        assert_eq!(rules.seniority(" DATA ANALYST "), Some(false));
        assert_eq!(rules.seniority("Unknown"), None);
    }

    #[test]
    fn stage_rules_distinguish_context_flags() {
        let rules = ReferenceRules::new()
            .with_stage_rule("Business Research", true, false, "test sent", "Automated test")
            .with_stage_rule("Business Research", true, true, "test sent", "Case study");
        let department = "Business Research".to_string();
        let activity = "test sent".to_string();
        assert_eq!(
            rules
                .stage_for(&department, true, false, &activity)
                .map(String::as_str),
            Some("Automated test")
        );
        assert_eq!(
            rules
                .stage_for(&department, true, true, &activity)
                .map(String::as_str),
            Some("Case study")
        );
        assert_eq!(rules.stage_for(&department, false, false, &activity), None);
        assert_eq!(rules.stage_rule_count(), 2);
    }

    #[test]
    fn sla_targets_key_on_year_and_seniority() {
        let rules = ReferenceRules::new().with_sla_target(
            "Data Analytics",
            true,
            "applied ==> hr interview",
            2023,
            4.0,
        );
        let department = "Data Analytics";
        let transition = "applied ==> hr interview";
        assert_eq!(
            rules
                .sla_target(department, true, transition, 2023)
                .map(|target| target.target_days),
            Some(4.0)
        );
        assert!(rules.sla_target(department, true, transition, 2022).is_none());
        assert!(rules.sla_target(department, false, transition, 2023).is_none());
    }
}
