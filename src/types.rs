/// Candidate identifier as recorded in the activity report.
/// Example: `Jane Doe`
pub type CandidateId = String;
/// Job identifier, formatted `Department - Position - Location - Specificities`.
/// Example: `Business Research - Research Analyst - Cairo - Core`
pub type JobId = String;
/// Activity label exactly as exported by the recruiting system.
/// Examples: `Moved to job Data Analyst`, `Disqualified`
pub type RawActivity = String;
/// Lower-cased canonical activity resolved through the activity map.
/// Examples: `applied`, `auto-disqualified`, `moved to job position`
pub type CanonicalActivity = String;
/// Canonical process stage resolved through the stage rules.
/// Examples: `Applied`, `Automated test`, `HR Interview`, `Hired`
pub type StageName = String;
/// Department bucket after collapsing service departments.
/// Examples: `Business Research`, `Service Team`
pub type DepartmentBucket = String;
/// Lower-cased `"{previous} ==> {current}"` stage label.
/// Examples: `==> applied`, `hr interview ==> offer`
pub type StageTransition = String;
/// Name of the user who performed an activity.
/// Example: `Recruiter One`
pub type ActorName = String;
/// Source (zero-based) row index of an event in the input table.
pub type RowIndex = usize;
/// Stage rank used to check ordering.
pub type Rank = i64;
/// Diagnostic or comment text.
/// Examples: `OK`, `actions not in right order`
pub type Comment = String;
