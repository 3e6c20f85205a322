// File: snapshot.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::{HistoryResult, ParseError};
use crate::models::VrpKey;
use crate::prefix::{Prefix, PrefixParseError};

static DUMP_FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^rpki-(\d{8}T\d{6})Z(?:\.csv|\.tgz)?$").unwrap());

const COLUMN_ASN: &str = "ASN";
const COLUMN_PREFIX: &str = "IP Prefix";
const COLUMN_MAX_LENGTH: &str = "Max Length";
const COLUMN_TRUST_ANCHOR: &str = "Trust Anchor";

/// VRPs read from one rpki-client CSV export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Capture time taken from the file name, when it follows the
    /// `rpki-YYYYMMDDTHHMMSSZ` convention.
    pub timestamp: Option<DateTime<Utc>>,
    pub vrps: Vec<VrpKey>,
}

impl Snapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> HistoryResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let vrps = read_csv(BufReader::new(file))?;
        let timestamp = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(timestamp_from_file_name);
        debug!("Read {} VRPs from {}", vrps.len(), path.display());
        Ok(Self { timestamp, vrps })
    }
}

pub fn timestamp_from_file_name(name: &str) -> Option<DateTime<Utc>> {
    let captures = DUMP_FILE_NAME.captures(name)?;
    let naive = NaiveDateTime::parse_from_str(&captures[1], "%Y%m%dT%H%M%S").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Parses `64496` or `AS64496`.
pub fn parse_asn(input: &str) -> Result<u32, ParseError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("AS")
        .or_else(|| trimmed.strip_prefix("as"))
        .unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::Asn(input.to_string()));
    }
    digits
        .parse()
        .map_err(|_| ParseError::Asn(input.to_string()))
}

struct Columns {
    asn: usize,
    prefix: usize,
    max_length: usize,
    trust_anchor: Option<usize>,
    width: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, ParseError> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |wanted: &str| names.iter().position(|n| n.eq_ignore_ascii_case(wanted));
        let require = |wanted: &str| {
            find(wanted).ok_or_else(|| ParseError::Snapshot {
                line: 1,
                message: format!("missing column '{}'", wanted),
            })
        };

        Ok(Self {
            asn: require(COLUMN_ASN)?,
            prefix: require(COLUMN_PREFIX)?,
            max_length: require(COLUMN_MAX_LENGTH)?,
            trust_anchor: find(COLUMN_TRUST_ANCHOR),
            width: names.len(),
        })
    }

    fn parse_row(&self, row: &str, line: usize) -> Result<VrpKey, ParseError> {
        let at_line = |message: String| ParseError::Snapshot { line, message };
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() < self.width {
            return Err(at_line(format!(
                "expected {} fields, found {}",
                self.width,
                fields.len()
            )));
        }

        let asn = parse_asn(fields[self.asn]).map_err(|e| at_line(e.to_string()))?;
        let prefix: Prefix = fields[self.prefix]
            .parse()
            .map_err(|e: PrefixParseError| at_line(e.to_string()))?;
        let max_length: u8 = fields[self.max_length]
            .parse()
            .map_err(|_| at_line(format!("invalid max length '{}'", fields[self.max_length])))?;
        let trust_anchor = self.trust_anchor.map_or("", |i| fields[i]);

        let vrp = VrpKey::new(asn, prefix, max_length, trust_anchor);
        if !vrp.max_length_fits() {
            return Err(at_line(
                ParseError::MaxLength { prefix, max_length }.to_string(),
            ));
        }
        Ok(vrp)
    }
}

/// Reads a CSV export with an `ASN,IP Prefix,Max Length,Trust Anchor`
/// header. Columns are found by name, blank lines are skipped and the first
/// bad row fails the whole file.
pub fn read_csv<R: BufRead>(reader: R) -> HistoryResult<Vec<VrpKey>> {
    let mut columns: Option<Columns> = None;
    let mut vrps = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(columns) = &columns {
            vrps.push(columns.parse_row(&line, line_number)?);
            continue;
        }
        columns = Some(Columns::from_header(&line).map_err(|e| match e {
            ParseError::Snapshot { message, .. } => ParseError::Snapshot {
                line: line_number,
                message,
            },
            other => other,
        })?);
    }

    if columns.is_none() {
        return Err(ParseError::Snapshot {
            line: 0,
            message: "snapshot has no header".to_string(),
        }
        .into());
    }
    Ok(vrps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HistoryError;
    use chrono::TimeZone;
    use rstest::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
ASN,IP Prefix,Max Length,Trust Anchor,Expires
AS64496,192.0.2.0/24,24,arin,1700000000

AS64497,2001:db8::/32,48,ripe,1700000000
";

    #[test]
    fn test_reads_sample_export() {
        let vrps = read_csv(Cursor::new(SAMPLE)).unwrap();
        assert_eq!(vrps.len(), 2);
        assert_eq!(
            vrps[0],
            VrpKey::new(64496, "192.0.2.0/24".parse().unwrap(), 24, "arin")
        );
        assert_eq!(vrps[1].trust_anchor, "ripe");
        assert_eq!(vrps[1].max_length, 48);
    }

    #[test]
    fn test_columns_are_found_by_name() {
        let csv = "Trust Anchor,Max Length,ASN,IP Prefix\napnic,24,AS1,10.0.0.0/24\n";
        let vrps = read_csv(Cursor::new(csv)).unwrap();
        assert_eq!(vrps, vec![VrpKey::new(1, "10.0.0.0/24".parse().unwrap(), 24, "apnic")]);
    }

    #[rstest]
    #[case("AS1,10.0.0.1/24,24,arin", 2)]
    #[case("ASx,10.0.0.0/24,24,arin", 2)]
    #[case("AS1,10.0.0.0/24,16,arin", 2)]
    #[case("AS1,10.0.0.0/24,33,arin", 2)]
    #[case("AS1,10.0.0.0/24", 2)]
    fn test_bad_rows_report_their_line(#[case] row: &str, #[case] expected_line: usize) {
        let csv = format!("ASN,IP Prefix,Max Length,Trust Anchor\n{}\n", row);
        match read_csv(Cursor::new(csv)) {
            Err(HistoryError::Parse(ParseError::Snapshot { line, .. })) => {
                assert_eq!(line, expected_line)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let result = read_csv(Cursor::new("ASN,IP Prefix\nAS1,10.0.0.0/8\n"));
        assert!(matches!(
            result,
            Err(HistoryError::Parse(ParseError::Snapshot { line: 1, .. }))
        ));
    }

    #[rstest]
    #[case("64496", Some(64496))]
    #[case("AS64496", Some(64496))]
    #[case("as0", Some(0))]
    #[case("AS", None)]
    #[case("-1", None)]
    #[case("AS4294967296", None)]
    fn test_parse_asn(#[case] input: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_asn(input).ok(), expected);
    }

    #[rstest]
    #[case("rpki-20240131T201500Z.tgz", true)]
    #[case("rpki-20240131T201500Z.csv", true)]
    #[case("rpki-20240131T201500Z", true)]
    #[case("rpki-client.csv", false)]
    #[case("rpki-20241331T201500Z.csv", false)]
    fn test_timestamp_from_file_name(#[case] name: &str, #[case] parses: bool) {
        let timestamp = timestamp_from_file_name(name);
        assert_eq!(timestamp.is_some(), parses);
        if parses {
            assert_eq!(
                timestamp.unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 31, 20, 15, 0).unwrap()
            );
        }
    }

    #[test]
    fn test_load_takes_timestamp_from_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rpki-20240131T201500Z.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let snapshot = Snapshot::load(&path).unwrap();
        assert_eq!(snapshot.vrps.len(), 2);
        assert_eq!(
            snapshot.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 31, 20, 15, 0).unwrap())
        );
    }
}
