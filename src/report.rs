//! Writing aggregate tables.
//!
//! CSV output is one file per table in the report directory; JSON output is
//! a single `report.json` holding the whole [`AnalysisReport`]. An empty table
//! still gets a file with its header row so consumers can tell "no data"
//! from "not computed".

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::AnalysisReport;
use crate::csv_codec::{Quoting, TableWriter};
use crate::error::{AnalysisError, Result};
use crate::schema::chat_csv::READABLE_TIME_FORMAT;

/// Report file names
pub mod report_files {
    /// Lifetime activity series
    pub const LIFETIME_ACTIVITY: &str = "lifetime_activity.csv";
    /// Time-of-day distribution
    pub const TIME_OF_DAY: &str = "time_of_day.csv";
    /// Group participation rates
    pub const GROUP_PARTICIPATION: &str = "group_participation.csv";
    /// Top group chats
    pub const TOP_GROUP_CHATS: &str = "top_group_chats.csv";
    /// Top contacts
    pub const TOP_CONTACTS: &str = "top_contacts.csv";
    /// Total interactions per contact
    pub const TOTAL_INTERACTIONS: &str = "total_interactions.csv";
    /// Single-group breakdown
    pub const GROUP_BREAKDOWN: &str = "group_breakdown.csv";
    /// Single-contact timeline
    pub const CONTACT_TIMELINE: &str = "contact_timeline.csv";
    /// Whole report as JSON
    pub const JSON_REPORT: &str = "report.json";
}

/// Output format for the aggregate tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One CSV file per table
    #[default]
    Csv,
    /// A single JSON document
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(AnalysisError::InvalidConfig(format!(
                "unknown report format '{s}', expected csv or json"
            ))),
        }
    }
}

fn write_table<I>(dir: &Path, name: &str, header: &[&str], rows: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let path = dir.join(name);
    let mut writer = TableWriter::create(&path, header, Quoting::Necessary)?;
    for row in rows {
        writer.write_row(row)?;
    }
    writer.finish()?;
    Ok(path)
}

fn write_csv_tables(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let average = format!("{:.2}", report.lifetime_activity.average_sent);

    written.push(write_table(
        dir,
        report_files::LIFETIME_ACTIVITY,
        &["Interval Start", "Sent", "Received", "Total", "Average Sent"],
        report.lifetime_activity.rows.iter().map(|row| {
            vec![
                row.interval_start.format(READABLE_TIME_FORMAT).to_string(),
                row.sent.to_string(),
                row.received.to_string(),
                row.total.to_string(),
                average.clone(),
            ]
        }),
    )?);

    written.push(write_table(
        dir,
        report_files::TIME_OF_DAY,
        &["Time Segment", "Sent", "Received", "Total"],
        report.time_of_day.iter().map(|row| {
            vec![
                row.time_segment.clone(),
                row.sent.to_string(),
                row.received.to_string(),
                row.total.to_string(),
            ]
        }),
    )?);

    written.push(write_table(
        dir,
        report_files::GROUP_PARTICIPATION,
        &["Group Chat Name", "Own Messages", "Total Messages", "Participation Rate"],
        report.group_participation.iter().map(|row| {
            vec![
                row.group_chat_name.clone(),
                row.own_messages.to_string(),
                row.total_messages.to_string(),
                format!("{:.4}", row.participation_rate),
            ]
        }),
    )?);

    written.push(write_table(
        dir,
        report_files::TOP_GROUP_CHATS,
        &["Group Chat Name", "Message Count"],
        report
            .top_group_chats
            .iter()
            .map(|row| vec![row.name.clone(), row.count.to_string()]),
    )?);

    written.push(write_table(
        dir,
        report_files::TOP_CONTACTS,
        &["Contact", "Message Count"],
        report
            .top_contacts
            .iter()
            .map(|row| vec![row.name.clone(), row.count.to_string()]),
    )?);

    written.push(write_table(
        dir,
        report_files::TOTAL_INTERACTIONS,
        &["Contact", "Direct Messages", "Group Messages", "Total"],
        report.total_interactions.iter().map(|row| {
            vec![
                row.contact.clone(),
                row.direct_messages.to_string(),
                row.group_messages.to_string(),
                row.total.to_string(),
            ]
        }),
    )?);

    if let Some(breakdown) = &report.group_breakdown {
        written.push(write_table(
            dir,
            report_files::GROUP_BREAKDOWN,
            &["Group Chat Name", "Sender", "Message Count", "Percentage"],
            breakdown.rows.iter().map(|row| {
                vec![
                    breakdown.group_chat_name.clone(),
                    row.sender.clone(),
                    row.message_count.to_string(),
                    format!("{:.2}", row.percentage),
                ]
            }),
        )?);
    }

    if let Some(timeline) = &report.contact_timeline {
        written.push(write_table(
            dir,
            report_files::CONTACT_TIMELINE,
            &["Contact", "Interval Start", "Direct Messages", "Total Interactions"],
            timeline.rows.iter().map(|row| {
                vec![
                    timeline.contact.clone(),
                    row.interval_start.format(READABLE_TIME_FORMAT).to_string(),
                    row.direct_messages.to_string(),
                    row.total_interactions.to_string(),
                ]
            }),
        )?);
    }

    Ok(written)
}

/// Write `report` into `dir` in the requested format; returns the files written.
pub fn write_report(report: &AnalysisReport, dir: &Path, format: ReportFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let written = match format {
        ReportFormat::Csv => write_csv_tables(report, dir)?,
        ReportFormat::Json => {
            let path = dir.join(report_files::JSON_REPORT);
            let writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(writer, report)?;
            vec![path]
        },
    };

    info!(files = written.len(), dir = %dir.display(), %format, "Report written");
    Ok(written)
}

/// One-line-per-table summary; empty tables say so explicitly
#[must_use]
pub fn summary_lines(report: &AnalysisReport) -> Vec<String> {
    fn count_line(label: &str, rows: usize) -> String {
        if rows == 0 {
            format!("{label}: no data")
        } else {
            format!("{label}: {rows} rows")
        }
    }

    let mut lines = vec![
        format!("Messages analyzed: {}", report.messages_analyzed),
        count_line("Lifetime activity", report.lifetime_activity.rows.len()),
    ];
    if !report.lifetime_activity.rows.is_empty() {
        lines.push(format!(
            "Average sent per bucket: {:.2}",
            report.lifetime_activity.average_sent
        ));
    }
    lines.push(count_line("Time of day", report.time_of_day.len()));
    lines.push(count_line("Group participation", report.group_participation.len()));
    lines.push(count_line("Top group chats", report.top_group_chats.len()));
    lines.push(count_line("Top contacts", report.top_contacts.len()));
    lines.push(count_line("Total interactions", report.total_interactions.len()));
    if let Some(breakdown) = &report.group_breakdown {
        lines.push(count_line(
            &format!("Group breakdown for {}", breakdown.group_chat_name),
            breakdown.rows.len(),
        ));
    }
    if let Some(timeline) = &report.contact_timeline {
        lines.push(count_line(&format!("Timeline for {}", timeline.contact), timeline.rows.len()));
    }
    lines
}
