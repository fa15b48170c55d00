use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use ::csv::{ReaderBuilder, StringRecord, Trim};
use tracing::info;

use crate::constants::{columns, tables};
use crate::data::{RawEvent, SlaTarget};
use crate::errors::PipelineError;
use crate::reference::ReferenceRules;
use crate::types::{Rank, RowIndex};
use crate::utils::{label_key, parse_flag};

/// Locations of the delimited input tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TablePaths {
    pub events: PathBuf,
    pub activity_map: PathBuf,
    pub stage_rules: PathBuf,
    pub rank_table: PathBuf,
    pub hr_roster: Option<PathBuf>,
    pub sla_targets: Option<PathBuf>,
    pub seniority_map: Option<PathBuf>,
}

/// A parsed table with case-insensitive header lookup.
struct Table {
    name: &'static str,
    columns: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl Table {
    fn read<R: Read>(
        reader: R,
        name: &'static str,
        required: &[&str],
        allow_empty: bool,
    ) -> Result<Self, PipelineError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let columns: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, header)| (label_key(header), index))
            .collect();
        let missing: Vec<String> = required
            .iter()
            .filter(|column| !columns.contains_key(&label_key(column)))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns {
                table: name.to_string(),
                columns: missing,
            });
        }
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        if records.is_empty() && !allow_empty {
            return Err(PipelineError::EmptyTable {
                table: name.to_string(),
            });
        }
        Ok(Self {
            name,
            columns,
            records,
        })
    }

    fn rows(&self) -> impl Iterator<Item = (RowIndex, &StringRecord)> {
        self.records.iter().enumerate()
    }

    fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(&label_key(column))
    }

    fn text<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.columns
            .get(&label_key(column))
            .and_then(|index| record.get(*index))
            .unwrap_or_default()
    }

    fn flag(&self, row: RowIndex, record: &StringRecord, column: &str) -> Result<bool, PipelineError> {
        let value = self.text(record, column);
        parse_flag(value).ok_or_else(|| self.invalid(row, column, value))
    }

    fn integer(&self, row: RowIndex, record: &StringRecord, column: &str) -> Result<i64, PipelineError> {
        let value = self.text(record, column);
        parse_integer(value).ok_or_else(|| self.invalid(row, column, value))
    }

    fn number(&self, row: RowIndex, record: &StringRecord, column: &str) -> Result<f64, PipelineError> {
        let value = self.text(record, column);
        value
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .ok_or_else(|| self.invalid(row, column, value))
    }

    fn invalid(&self, row: RowIndex, column: &str, value: &str) -> PipelineError {
        PipelineError::InvalidValue {
            table: self.name.to_string(),
            row,
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}

/// Integers are sometimes exported as `2023.0`.
fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|number| number.is_finite() && number.fract() == 0.0)
            .map(|number| number as i64)
    })
}

/// Read the activity report.
pub fn read_events<R: Read>(reader: R) -> Result<Vec<RawEvent>, PipelineError> {
    let [actor, activity, candidate, job, created] = columns::EVENTS;
    let table = Table::read(reader, tables::EVENTS, &columns::EVENTS, false)?;
    Ok(table
        .rows()
        .map(|(_, record)| {
            let event = RawEvent::new(
                table.text(record, candidate),
                table.text(record, job),
                table.text(record, activity),
                table.text(record, created),
            );
            match table.text(record, actor) {
                "" => event,
                name => event.with_actor(name),
            }
        })
        .collect())
}

/// Add the activity dictionary to `rules`.
pub fn read_activity_map<R: Read>(
    reader: R,
    rules: &mut ReferenceRules,
) -> Result<(), PipelineError> {
    let [raw, canonical, is_step] = columns::ACTIVITY_MAP;
    let table = Table::read(reader, tables::ACTIVITY_MAP, &columns::ACTIVITY_MAP, false)?;
    for (row, record) in table.rows() {
        rules.insert_activity(
            table.text(record, raw),
            table.text(record, canonical),
            table.flag(row, record, is_step)?,
        );
    }
    Ok(())
}

/// Add the HR roster to `rules`.
pub fn read_hr_roster<R: Read>(reader: R, rules: &mut ReferenceRules) -> Result<(), PipelineError> {
    let [name, is_hr] = columns::HR_ROSTER;
    let table = Table::read(reader, tables::HR_ROSTER, &columns::HR_ROSTER, true)?;
    for (row, record) in table.rows() {
        rules.insert_hr_member(table.text(record, name), table.flag(row, record, is_hr)?);
    }
    Ok(())
}

/// Add the stage-mapping rules to `rules`.
pub fn read_stage_rules<R: Read>(
    reader: R,
    rules: &mut ReferenceRules,
) -> Result<(), PipelineError> {
    let [department, is_br, recency, activity, stage] = columns::STAGE_RULES;
    let table = Table::read(reader, tables::STAGE_RULES, &columns::STAGE_RULES, false)?;
    for (row, record) in table.rows() {
        rules.insert_stage_rule(
            table.text(record, department),
            table.flag(row, record, is_br)?,
            table.flag(row, record, recency)?,
            table.text(record, activity),
            table.text(record, stage),
        );
    }
    Ok(())
}

/// Add the rank table to `rules`.
pub fn read_rank_table<R: Read>(reader: R, rules: &mut ReferenceRules) -> Result<(), PipelineError> {
    let [stage, department, updated, is_senior, rank] = columns::RANK_TABLE;
    let table = Table::read(reader, tables::RANK_TABLE, &columns::RANK_TABLE, false)?;
    for (row, record) in table.rows() {
        let value: Rank = table.integer(row, record, rank)?;
        rules.insert_rank(
            table.text(record, stage),
            table.text(record, department),
            table.flag(row, record, updated)?,
            table.flag(row, record, is_senior)?,
            value,
        );
    }
    Ok(())
}

/// Add the SLA targets to `rules`.
pub fn read_sla_targets<R: Read>(reader: R, rules: &mut ReferenceRules) -> Result<(), PipelineError> {
    let [department, is_senior, transition, year, days] = columns::SLA_TARGETS;
    let table = Table::read(reader, tables::SLA_TARGETS, &columns::SLA_TARGETS, true)?;
    let has_name = table.has_column(columns::SLA_TARGET_NAME);
    for (row, record) in table.rows() {
        let start_year = table.integer(row, record, year)?;
        let start_year =
            i32::try_from(start_year).map_err(|_| table.invalid(row, year, &start_year.to_string()))?;
        let name = Some(table.text(record, columns::SLA_TARGET_NAME))
            .filter(|name| has_name && !name.is_empty())
            .map(str::to_string);
        rules.insert_sla_target(
            table.text(record, department),
            table.flag(row, record, is_senior)?,
            table.text(record, transition),
            start_year,
            SlaTarget {
                target_days: table.number(row, record, days)?,
                name,
            },
        );
    }
    Ok(())
}

/// Add the seniority dictionary to `rules`.
pub fn read_seniority_map<R: Read>(
    reader: R,
    rules: &mut ReferenceRules,
) -> Result<(), PipelineError> {
    let [title, is_senior] = columns::SENIORITY_MAP;
    let table = Table::read(reader, tables::SENIORITY_MAP, &columns::SENIORITY_MAP, true)?;
    for (row, record) in table.rows() {
        rules.insert_seniority(table.text(record, title), table.flag(row, record, is_senior)?);
    }
    Ok(())
}

/// Load the activity report from disk.
pub fn load_events(path: &Path) -> Result<Vec<RawEvent>, PipelineError> {
    let events = read_events(File::open(path)?)?;
    info!(path = %path.display(), rows = events.len(), "loaded events");
    Ok(events)
}

/// Load every reference table named in `paths`.
pub fn load_reference_rules(paths: &TablePaths) -> Result<ReferenceRules, PipelineError> {
    let mut rules = ReferenceRules::new();
    read_activity_map(File::open(&paths.activity_map)?, &mut rules)?;
    read_stage_rules(File::open(&paths.stage_rules)?, &mut rules)?;
    read_rank_table(File::open(&paths.rank_table)?, &mut rules)?;
    if let Some(path) = &paths.hr_roster {
        read_hr_roster(File::open(path)?, &mut rules)?;
    }
    if let Some(path) = &paths.sla_targets {
        read_sla_targets(File::open(path)?, &mut rules)?;
    }
    if let Some(path) = &paths.seniority_map {
        read_seniority_map(File::open(path)?, &mut rules)?;
    }
    info!(
        activities = rules.activity_count(),
        stage_rules = rules.stage_rule_count(),
        ranks = rules.rank_count(),
        "loaded reference tables"
    );
    Ok(rules)
}
