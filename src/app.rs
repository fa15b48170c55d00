use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::{PipelineConfig, TimestampStrategy};
use crate::constants::output::{
    ACCEPTED_FILENAME, HIRED_IN_REVIEW_FILENAME, MANUAL_REVIEW_FILENAME, STATS_FILENAME,
};
use crate::data::TimelineRow;
use crate::hash::report_fingerprint;
use crate::pipeline::{Pipeline, TimelineReport};
use crate::transport::{TablePaths, load_events, load_reference_rules};

const BINARY_NAME: &str = "timeline_report";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    PerRow,
    WholeColumn,
}

impl From<StrategyArg> for TimestampStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::PerRow => TimestampStrategy::PerRow,
            StrategyArg::WholeColumn => TimestampStrategy::WholeColumn,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = BINARY_NAME,
    disable_help_subcommand = true,
    about = "Reconstruct candidate timelines from an activity report",
    long_about = "Normalize an activity report, segment it into application episodes, map stages, compute elapsed times and route episodes into accepted and manual-review sets.",
    after_help = "Outputs are JSON lines, one row per stage visit, written into --output-dir."
)]
struct TimelineReportCli {
    #[arg(long, value_name = "CSV", help = "Activity report")]
    events: PathBuf,
    #[arg(long = "activity-map", value_name = "CSV", help = "Activity dictionary")]
    activity_map: PathBuf,
    #[arg(long = "stage-rules", value_name = "CSV", help = "Stage-mapping rules")]
    stage_rules: PathBuf,
    #[arg(long = "rank-table", value_name = "CSV", help = "Stage rank table")]
    rank_table: PathBuf,
    #[arg(long = "hr-roster", value_name = "CSV", help = "Optional HR roster")]
    hr_roster: Option<PathBuf>,
    #[arg(long = "sla-targets", value_name = "CSV", help = "Optional SLA target table")]
    sla_targets: Option<PathBuf>,
    #[arg(long = "seniority-map", value_name = "CSV", help = "Optional seniority dictionary")]
    seniority_map: Option<PathBuf>,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        default_value = "timeline_output",
        help = "Directory for the JSON-lines outputs (created if missing)"
    )]
    output_dir: PathBuf,
    #[arg(
        long = "timestamp-strategy",
        value_enum,
        default_value = "whole-column",
        help = "Commit to one timestamp format per column or match formats per value"
    )]
    timestamp_strategy: StrategyArg,
    #[arg(
        long = "rank-revisions",
        help = "Derive rank recency from the built-in per-department revision dates"
    )]
    rank_revisions: bool,
    #[arg(
        long = "log-level",
        default_value = "warn",
        help = "Log filter used when RUST_LOG is unset (trace, debug, info, warn, error)"
    )]
    log_level: String,
}

impl TimelineReportCli {
    /// Parse runner arguments (without the binary name).
    ///
    /// `None` means clap already printed help or version text.
    fn from_args<I>(args: I) -> Result<Option<Self>, Box<dyn Error>>
    where
        I: IntoIterator<Item = String>,
    {
        let argv = std::iter::once(BINARY_NAME.to_string()).chain(args);
        match Self::try_parse_from(argv) {
            Ok(cli) => Ok(Some(cli)),
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                err.print()?;
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    }

    fn table_paths(&self) -> TablePaths {
        TablePaths {
            events: self.events.clone(),
            activity_map: self.activity_map.clone(),
            stage_rules: self.stage_rules.clone(),
            rank_table: self.rank_table.clone(),
            hr_roster: self.hr_roster.clone(),
            sla_targets: self.sla_targets.clone(),
            seniority_map: self.seniority_map.clone(),
        }
    }

    fn config(&self) -> PipelineConfig {
        let config = PipelineConfig {
            timestamp_strategy: self.timestamp_strategy.into(),
            ..PipelineConfig::default()
        };
        if self.rank_revisions {
            config.with_default_rank_revisions()
        } else {
            config
        }
    }
}

/// Load the tables, run the pipeline and write the routed sets.
pub fn run_timeline_report<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = TimelineReportCli::from_args(args_iter)? else {
        return Ok(());
    };
    let _ = tracing_subscriber::registry()
        .with(cli.log_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();

    let paths = cli.table_paths();
    let rules = load_reference_rules(&paths)?;
    let events = load_events(&paths.events)?;
    let pipeline = Pipeline::with_config(rules, cli.config());
    let report = pipeline.run(&events)?;

    write_report(&cli.output_dir, &report)?;
    print_summary(&cli.output_dir, &report)?;
    Ok(())
}

/// Write every routed set as JSON lines plus the run statistics.
pub fn write_report(dir: &Path, report: &TimelineReport) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    write_rows(&dir.join(ACCEPTED_FILENAME), &report.accepted)?;
    write_rows(&dir.join(MANUAL_REVIEW_FILENAME), &report.manual_review)?;
    write_rows(&dir.join(HIRED_IN_REVIEW_FILENAME), &report.hired_in_review)?;
    let stats = File::create(dir.join(STATS_FILENAME))?;
    serde_json::to_writer_pretty(stats, &report.stats)?;
    Ok(())
}

fn write_rows(path: &Path, rows: &[TimelineRow]) -> Result<(), Box<dyn Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(dir: &Path, report: &TimelineReport) -> Result<(), Box<dyn Error>> {
    let stats = &report.stats;
    println!("=== timeline report ===");
    println!(
        "events: {} read, {} retained ({:.1}%)",
        stats.input_rows,
        stats.retained_events,
        stats.event_retention() * 100.0
    );
    println!(
        "episodes: {} (direct {}, transferred at start {}, transferred midstream {})",
        stats.episodes,
        stats.direct_episodes,
        stats.transferred_at_start_episodes,
        stats.transferred_midstream_episodes
    );
    println!(
        "routing: {} accepted, {} manual review, {} hired in review",
        stats.accepted_episodes, stats.manual_review_episodes, stats.hired_in_review_episodes
    );
    println!(
        "side channels: {} referring candidates, {} talent-pool candidates",
        report.referred_candidates.len(),
        report.talent_pool_candidates.len()
    );
    println!("fingerprint: {:016x}", report_fingerprint(report)?);
    println!("written to {}", dir.display());
    Ok(())
}
