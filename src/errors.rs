// File: errors.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use crate::models::VrpKey;
use crate::prefix::{Prefix, PrefixParseError};
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Prefix(PrefixParseError),
    Asn(String),
    Timestamp(String),
    /// Dump timestamps are recorded in whole milliseconds.
    SubMillisecond(DateTime<Utc>),
    MaxLength { prefix: Prefix, max_length: u8 },
    /// A snapshot row that could not be read; `line` is 1-based.
    Snapshot { line: usize, message: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(e) => write!(f, "{}", e),
            Self::Asn(input) => write!(f, "Invalid ASN '{}'", input),
            Self::Timestamp(input) => write!(f, "Invalid timestamp '{}'", input),
            Self::SubMillisecond(timestamp) => write!(
                f,
                "Timestamp {} has sub-millisecond precision",
                timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
            ),
            Self::MaxLength { prefix, max_length } => {
                write!(f, "Max length {} does not fit {}", max_length, prefix)
            }
            Self::Snapshot { line, message } => write!(f, "Line {}: {}", line, message),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Prefix(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PrefixParseError> for ParseError {
    fn from(error: PrefixParseError) -> Self {
        Self::Prefix(error)
    }
}

#[derive(Debug)]
pub enum HistoryError {
    Parse(ParseError),
    OutOfOrderIngestion {
        timestamp: DateTime<Utc>,
        latest: DateTime<Utc>,
    },
    DuplicateKeyInSnapshot(VrpKey),
    ConcurrentIngestion,
    OutOfRangeQuery {
        requested: String,
        span: Option<(DateTime<Utc>, DateTime<Utc>)>,
    },
    InvalidQuery(String),
    ConsistencyViolation(String),
    Io(std::io::Error),
    Storage(StorageError),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::OutOfOrderIngestion { timestamp, latest } => write!(
                f,
                "Dump {} is not newer than the latest ingested dump {}",
                timestamp, latest
            ),
            Self::DuplicateKeyInSnapshot(key) => {
                write!(f, "Snapshot contains {} more than once", key)
            }
            Self::ConcurrentIngestion => write!(f, "Another ingestion is already running"),
            Self::OutOfRangeQuery { requested, span } => match span {
                Some((earliest, latest)) => write!(
                    f,
                    "Requested time {} lies outside the ingested range {} to {}",
                    requested, earliest, latest
                ),
                None => write!(f, "Requested time {} but no dumps are ingested", requested),
            },
            Self::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
            Self::ConsistencyViolation(msg) => write!(f, "Consistency violation: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for HistoryError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<PrefixParseError> for HistoryError {
    fn from(error: PrefixParseError) -> Self {
        Self::Parse(ParseError::Prefix(error))
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<StorageError> for HistoryError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Inconsistent(msg) => Self::ConsistencyViolation(msg),
            other => Self::Storage(other),
        }
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_storage_maps_to_consistency_violation() {
        let error: HistoryError = StorageError::Inconsistent("two open intervals".to_string()).into();
        assert!(matches!(error, HistoryError::ConsistencyViolation(_)));

        let error: HistoryError = StorageError::Database("gone".to_string()).into();
        assert!(matches!(error, HistoryError::Storage(_)));
    }

    #[test]
    fn test_out_of_range_message_without_ledger() {
        let error = HistoryError::OutOfRangeQuery {
            requested: "latest".to_string(),
            span: None,
        };
        assert!(error.to_string().contains("no dumps are ingested"));
    }

    #[test]
    fn test_snapshot_error_carries_line() {
        let error = ParseError::Snapshot {
            line: 7,
            message: "bad max length".to_string(),
        };
        assert_eq!(error.to_string(), "Line 7: bad max length");
    }

    #[test]
    fn test_sub_millisecond_message_keeps_full_precision() {
        let timestamp = DateTime::from_timestamp(100, 500_000).unwrap();
        let error = ParseError::SubMillisecond(timestamp);
        assert!(error.to_string().contains("00:01:40.000500000Z"));
    }
}
