// File: validation.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Route-origin validation over the covering set of a prefix.
//!
//! An announcement is Valid as soon as one covering VRP authorizes its origin
//! at its length. Otherwise it is Invalid when anything covers it, with the
//! reason `moreSpecific` if some VRP names the origin but allows only shorter
//! prefixes and `unauthorized` if none names the origin. AS0 VRPs cover but
//! never authorize an origin.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::fmt;

use crate::errors::HistoryResult;
use crate::models::CoveringVrp;
use crate::prefix::Prefix;
use crate::query::{QueryEngine, TimeFilter};
use crate::storage::IntervalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReasonCode {
    MoreSpecific,
    Unauthorized,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MoreSpecific => "moreSpecific",
            ReasonCode::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidReason {
    pub code: ReasonCode,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status")]
pub enum ValidationStatus {
    Valid,
    Invalid { reason: InvalidReason },
    NotFound,
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }

    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            ValidationStatus::Invalid { reason } => Some(reason.code),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Valid => write!(f, "Valid"),
            ValidationStatus::Invalid { reason } => {
                write!(f, "Invalid ({}): {}", reason.code, reason.description)
            }
            ValidationStatus::NotFound => write!(f, "NotFound"),
        }
    }
}

/// Classifies an announcement of `prefix` by `asn` against VRPs already
/// known to cover `prefix`.
pub fn evaluate(prefix: &Prefix, asn: u32, covering: &[CoveringVrp]) -> ValidationStatus {
    if covering.is_empty() {
        return ValidationStatus::NotFound;
    }

    let mut widest_allowed: Option<u8> = None;
    for vrp in covering {
        if vrp.key.asn == 0 || vrp.key.asn != asn {
            continue;
        }
        if prefix.length() <= vrp.key.max_length {
            return ValidationStatus::Valid;
        }
        widest_allowed = widest_allowed.max(Some(vrp.key.max_length));
    }

    let reason = match widest_allowed {
        Some(max_length) => InvalidReason {
            code: ReasonCode::MoreSpecific,
            description: format!(
                "Prefix length {} exceeds the maximum length {} authorized for AS{}",
                prefix.length(),
                max_length,
                asn
            ),
        },
        None => InvalidReason {
            code: ReasonCode::Unauthorized,
            description: format!(
                "{} is covered by {} VRP(s), none of which authorizes origin AS{}",
                prefix,
                covering.len(),
                asn
            ),
        },
    };
    ValidationStatus::Invalid { reason }
}

pub struct Validator<'a> {
    query: QueryEngine<'a>,
}

impl<'a> Validator<'a> {
    pub fn new(store: &'a IntervalStore) -> Self {
        Self {
            query: QueryEngine::new(store),
        }
    }

    /// Status of `prefix` originated by `asn` at `at`, or at the latest dump
    /// when no time is given.
    pub fn status(
        &self,
        prefix: &Prefix,
        asn: u32,
        at: Option<DateTime<Utc>>,
    ) -> HistoryResult<ValidationStatus> {
        let filter = at.map_or(TimeFilter::Latest, TimeFilter::At);
        let covering = self.query.covering(prefix, &filter)?;
        let status = evaluate(prefix, asn, &covering);
        debug!("Validation of {} AS{} at {}: {}", prefix, asn, filter, status);
        Ok(status)
    }
}
