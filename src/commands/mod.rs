// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::*;

use crate::cli::{IngestArgs, MetadataArgs, StatsArgs, StatusArgs, VrpsArgs};
use crate::history::RpkiHistory;

pub mod ingest;
pub mod metadata;
pub mod stats;
pub mod status;
pub mod verify;
pub mod vrps;

pub async fn handle_ingest_command(args: &IngestArgs, history: &RpkiHistory) -> Result<()> {
    ingest::execute(args, history).await
}

pub async fn handle_vrps_command(args: &VrpsArgs, history: &RpkiHistory) -> Result<()> {
    vrps::execute(args, history).await
}

pub async fn handle_status_command(args: &StatusArgs, history: &RpkiHistory) -> Result<()> {
    status::execute(args, history).await
}

pub async fn handle_metadata_command(args: &MetadataArgs, history: &RpkiHistory) -> Result<()> {
    metadata::execute(args, history).await
}

pub async fn handle_stats_command(args: &StatsArgs, history: &RpkiHistory) -> Result<()> {
    stats::execute(args, history).await
}

pub async fn handle_verify_command(history: &RpkiHistory) -> Result<()> {
    verify::execute(history).await
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Output format shared by the query commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    fn parse(format: &str) -> Option<Self> {
        match format.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(0, "0 B")]
    #[case(1023, "1023 B")]
    #[case(1024, "1.00 KB")]
    #[case(5 * 1024 * 1024, "5.00 MB")]
    fn test_format_file_size(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_file_size(bytes), expected);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::parse("csv"), None);
    }
}
