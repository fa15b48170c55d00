/// Delimited-file loaders for the event log and reference tables.
pub mod csv;

pub use self::csv::{
    TablePaths, load_events, load_reference_rules, read_activity_map, read_events,
    read_hr_roster, read_rank_table, read_seniority_map, read_sla_targets, read_stage_rules,
};
