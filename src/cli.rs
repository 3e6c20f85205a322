// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

use crate::errors::ParseError;
use crate::prefix::Prefix;
use crate::query::TimeFilter;
use crate::snapshot::parse_asn;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Directory holding the history store")]
    pub data_dir: Option<PathBuf>,

    #[arg(long = "log-level", default_value = "warn", global = true)]
    pub log_level: String,

    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose output",
        global = true
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Reduce output verbosity",
        global = true
    )]
    pub quiet: bool,

    #[arg(long = "no-color", help = "Disable colored output", global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest rpki-client CSV snapshots in timestamp order
    Ingest(IngestArgs),
    /// List VRPs covering a prefix
    Vrps(VrpsArgs),
    /// Route origin validation status of a prefix and origin AS
    Status(StatusArgs),
    /// Per-dump counters from the metadata ledger
    Metadata(MetadataArgs),
    /// Store statistics
    Stats(StatsArgs),
    /// Re-check interval invariants over the whole store
    Verify,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[arg(required = true, help = "Snapshot files named rpki-YYYYMMDDTHHMMSSZ.csv")]
    pub files: Vec<PathBuf>,

    #[arg(
        long = "timestamp",
        help = "Dump time for a single file without a timestamped name"
    )]
    pub timestamp: Option<String>,

    #[arg(
        long = "skip-ingested",
        help = "Skip files not newer than the latest ingested dump"
    )]
    pub skip_ingested: bool,
}

#[derive(Args, Debug)]
pub struct VrpsArgs {
    #[arg(help = "Prefix to look up, e.g. 192.0.2.0/24")]
    pub prefix: String,

    #[arg(long = "at", conflicts_with_all = ["start", "end"], help = "Point in time")]
    pub at: Option<String>,

    #[arg(long = "start", help = "Range start (inclusive)")]
    pub start: Option<String>,

    #[arg(long = "end", help = "Range end (inclusive)")]
    pub end: Option<String>,

    #[arg(long = "format", default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(help = "Announced prefix")]
    pub prefix: String,

    #[arg(help = "Origin AS, e.g. 64496 or AS64496")]
    pub asn: String,

    #[arg(long = "at", help = "Point in time, defaults to the latest dump")]
    pub at: Option<String>,

    #[arg(long = "format", default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct MetadataArgs {
    #[arg(long = "start")]
    pub start: Option<String>,

    #[arg(long = "end")]
    pub end: Option<String>,

    #[arg(long = "page", default_value_t = 1)]
    pub page: u32,

    #[arg(long = "page-size")]
    pub page_size: Option<u32>,

    #[arg(long = "format", default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long = "format", default_value = "table")]
    pub format: String,
}

impl Cli {
    /// `-v` and `-q` override `--log-level`.
    pub fn log_level_filter(&self) -> LevelFilter {
        if self.verbose {
            return LevelFilter::Debug;
        }
        if self.quiet {
            return LevelFilter::Error;
        }
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }
}

impl IngestArgs {
    pub fn parse_timestamp(&self) -> Result<Option<DateTime<Utc>>, ParseError> {
        self.timestamp.as_deref().map(parse_timestamp).transpose()
    }
}

impl VrpsArgs {
    pub fn parse_prefix(&self) -> Result<Prefix, ParseError> {
        Ok(self.prefix.parse()?)
    }

    pub fn time_filter(&self) -> Result<TimeFilter, ParseError> {
        let at = self.at.as_deref().map(parse_timestamp).transpose()?;
        let start = self.start.as_deref().map(parse_timestamp).transpose()?;
        let end = self.end.as_deref().map(parse_timestamp).transpose()?;

        Ok(match (at, start, end) {
            (Some(t), _, _) => TimeFilter::At(t),
            (None, Some(start), Some(end)) => TimeFilter::Between(start, end),
            (None, Some(start), None) => TimeFilter::Since(start),
            (None, None, Some(end)) => TimeFilter::Until(end),
            (None, None, None) => TimeFilter::Latest,
        })
    }
}

impl StatusArgs {
    pub fn parse_prefix(&self) -> Result<Prefix, ParseError> {
        Ok(self.prefix.parse()?)
    }

    pub fn parse_asn(&self) -> Result<u32, ParseError> {
        parse_asn(&self.asn)
    }

    pub fn parse_at(&self) -> Result<Option<DateTime<Utc>>, ParseError> {
        self.at.as_deref().map(parse_timestamp).transpose()
    }
}

impl MetadataArgs {
    pub fn parse_start(&self) -> Result<Option<DateTime<Utc>>, ParseError> {
        self.start.as_deref().map(parse_timestamp).transpose()
    }

    pub fn parse_end(&self) -> Result<Option<DateTime<Utc>>, ParseError> {
        self.end.as_deref().map(parse_timestamp).transpose()
    }
}

/// Accepts `YYYY-MM-DDTHH:MM:SS` (UTC), RFC 3339 or Unix epoch seconds.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ParseError> {
    let input = input.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(parsed) = input
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            return Ok(parsed);
        }
    }

    Err(ParseError::Timestamp(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::*;

    #[rstest]
    #[case("2024-01-31T20:15:00")]
    #[case("2024-01-31T20:15:00Z")]
    #[case("2024-01-31T21:15:00+01:00")]
    #[case("1706732100")]
    fn test_parse_timestamp_formats(#[case] input: &str) {
        assert_eq!(
            parse_timestamp(input).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 31, 20, 15, 0).unwrap()
        );
    }

    #[rstest]
    #[case("")]
    #[case("yesterday")]
    #[case("2024-01-31")]
    #[case("-5")]
    fn test_parse_timestamp_rejects(#[case] input: &str) {
        assert!(matches!(
            parse_timestamp(input),
            Err(ParseError::Timestamp(_))
        ));
    }

    fn vrps_args(at: Option<&str>, start: Option<&str>, end: Option<&str>) -> VrpsArgs {
        VrpsArgs {
            prefix: "192.0.2.0/24".to_string(),
            at: at.map(String::from),
            start: start.map(String::from),
            end: end.map(String::from),
            format: "table".to_string(),
        }
    }

    #[test]
    fn test_time_filter_selection() {
        let t = Utc.timestamp_opt(100, 0).unwrap();
        let u = Utc.timestamp_opt(200, 0).unwrap();

        assert_eq!(vrps_args(None, None, None).time_filter().unwrap(), TimeFilter::Latest);
        assert_eq!(
            vrps_args(Some("100"), None, None).time_filter().unwrap(),
            TimeFilter::At(t)
        );
        assert_eq!(
            vrps_args(None, Some("100"), Some("200")).time_filter().unwrap(),
            TimeFilter::Between(t, u)
        );
        assert_eq!(
            vrps_args(None, Some("100"), None).time_filter().unwrap(),
            TimeFilter::Since(t)
        );
        assert_eq!(
            vrps_args(None, None, Some("200")).time_filter().unwrap(),
            TimeFilter::Until(u)
        );
    }

    #[test]
    fn test_cli_parses_status_command() {
        let cli = Cli::try_parse_from(["rpki-history", "-v", "status", "192.0.2.0/24", "AS64496"])
            .unwrap();
        assert_eq!(cli.log_level_filter(), LevelFilter::Debug);
        match cli.command {
            Commands::Status(args) => {
                assert_eq!(args.parse_asn().unwrap(), 64496);
                assert_eq!(args.parse_prefix().unwrap().length(), 24);
                assert_eq!(args.parse_at().unwrap(), None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_at_conflicts_with_range() {
        let result = Cli::try_parse_from([
            "rpki-history",
            "vrps",
            "10.0.0.0/8",
            "--at",
            "100",
            "--start",
            "50",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_flags() {
        let cli = Cli::try_parse_from(["rpki-history", "-q", "verify"]).unwrap();
        assert_eq!(cli.log_level_filter(), LevelFilter::Error);

        let cli = Cli::try_parse_from(["rpki-history", "--log-level", "info", "stats"]).unwrap();
        assert_eq!(cli.log_level_filter(), LevelFilter::Info);
    }
}
