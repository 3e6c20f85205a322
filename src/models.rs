// File: models.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::prefix::Prefix;

/// Identity of a validated ROA payload. Two snapshot entries are the same
/// VRP only if all four fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VrpKey {
    pub prefix: Prefix,
    pub asn: u32,
    pub max_length: u8,
    pub trust_anchor: String,
}

impl VrpKey {
    pub fn new(asn: u32, prefix: Prefix, max_length: u8, trust_anchor: &str) -> Self {
        Self {
            prefix,
            asn,
            max_length,
            trust_anchor: trust_anchor.to_string(),
        }
    }

    /// `max_length` lies between the prefix length and the family width.
    pub fn max_length_fits(&self) -> bool {
        self.max_length >= self.prefix.length() && self.max_length <= self.prefix.family().max_len()
    }
}

impl fmt::Display for VrpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AS{} {}-{} ({})",
            self.asn, self.prefix, self.max_length, self.trust_anchor
        )
    }
}

/// End of a visibility interval. `Open` means the key is still present in
/// the latest ingested dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalEnd {
    Open,
    Closed(DateTime<Utc>),
}

impl Serialize for IntervalEnd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IntervalEnd::Open => serializer.serialize_none(),
            IntervalEnd::Closed(to) => serializer.serialize_some(to),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibilityInterval {
    pub from: DateTime<Utc>,
    pub to: IntervalEnd,
}

impl VisibilityInterval {
    pub fn open(from: DateTime<Utc>) -> Self {
        Self {
            from,
            to: IntervalEnd::Open,
        }
    }

    pub fn closed(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to: IntervalEnd::Closed(to),
        }
    }

    pub fn is_open(&self) -> bool {
        self.to == IntervalEnd::Open
    }

    /// The last instant the key is known to be visible. An open interval
    /// reaches up to the latest dump.
    pub fn effective_to(&self, latest: DateTime<Utc>) -> DateTime<Utc> {
        match self.to {
            IntervalEnd::Open => latest,
            IntervalEnd::Closed(to) => to,
        }
    }
}

/// A stored VRP together with one of its visibility intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoveringVrp {
    #[serde(flatten)]
    pub key: VrpKey,
    #[serde(rename = "visible")]
    pub interval: VisibilityInterval,
}

/// Per-dump counters kept in the metadata ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "deleted_vrps")]
    pub deleted_count: u64,
    #[serde(rename = "updated_vrps")]
    pub updated_count: u64,
    #[serde(rename = "new_vrps")]
    pub new_count: u64,
    pub ingested_at: DateTime<Utc>,
}

/// Earliest and latest dump timestamps in the ledger. A reader pins one of
/// these for the duration of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSpan {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl LedgerSpan {
    pub fn single(timestamp: DateTime<Utc>) -> Self {
        Self {
            earliest: timestamp,
            latest: timestamp,
        }
    }

    pub fn extended_to(self, timestamp: DateTime<Utc>) -> Self {
        Self {
            earliest: self.earliest,
            latest: timestamp,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.earliest <= timestamp && timestamp <= self.latest
    }
}

/// Closed time window with optionally unbounded sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self {
            start: Some(at),
            end: Some(at),
        }
    }

    /// Rows starting after the window can be skipped before their end is
    /// even decoded.
    pub fn admits_start(&self, from: DateTime<Utc>) -> bool {
        self.end.map_or(true, |end| from <= end)
    }

    pub fn overlaps(&self, interval: &VisibilityInterval, latest: DateTime<Utc>) -> bool {
        self.admits_start(interval.from)
            && self
                .start
                .map_or(true, |start| interval.effective_to(latest) >= start)
    }
}
