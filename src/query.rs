// File: query.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use std::fmt;

use crate::errors::{HistoryError, HistoryResult};
use crate::models::{CoveringVrp, LedgerSpan, TimeWindow};
use crate::prefix::Prefix;
use crate::storage::IntervalStore;

/// Time selector for covering queries. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    /// The most recent ingested dump.
    #[default]
    Latest,
    At(DateTime<Utc>),
    Between(DateTime<Utc>, DateTime<Utc>),
    Since(DateTime<Utc>),
    Until(DateTime<Utc>),
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFilter::Latest => write!(f, "latest"),
            TimeFilter::At(t) => write!(f, "{}", format_time(t)),
            TimeFilter::Between(a, b) => write!(f, "{}..{}", format_time(a), format_time(b)),
            TimeFilter::Since(a) => write!(f, "{}..", format_time(a)),
            TimeFilter::Until(b) => write!(f, "..{}", format_time(b)),
        }
    }
}

impl TimeFilter {
    /// Checks the filter against the ledger span and turns it into a window.
    /// A filter that misses the span entirely is an error, not an empty
    /// result.
    pub fn resolve(&self, view: Option<LedgerSpan>) -> HistoryResult<(LedgerSpan, TimeWindow)> {
        if let TimeFilter::Between(start, end) = self {
            if start > end {
                return Err(HistoryError::InvalidQuery(format!(
                    "range start {} is after its end {}",
                    format_time(start),
                    format_time(end)
                )));
            }
        }

        let span = view.ok_or_else(|| HistoryError::OutOfRangeQuery {
            requested: self.to_string(),
            span: None,
        })?;

        let (in_range, window) = match *self {
            TimeFilter::Latest => (true, TimeWindow::instant(span.latest)),
            TimeFilter::At(t) => (span.contains(t), TimeWindow::instant(t)),
            TimeFilter::Between(start, end) => (
                end >= span.earliest && start <= span.latest,
                TimeWindow {
                    start: Some(start),
                    end: Some(end),
                },
            ),
            TimeFilter::Since(start) => (
                start <= span.latest,
                TimeWindow {
                    start: Some(start),
                    end: None,
                },
            ),
            TimeFilter::Until(end) => (
                end >= span.earliest,
                TimeWindow {
                    start: None,
                    end: Some(end),
                },
            ),
        };

        if !in_range {
            return Err(HistoryError::OutOfRangeQuery {
                requested: self.to_string(),
                span: Some((span.earliest, span.latest)),
            });
        }
        Ok((span, window))
    }
}

pub struct QueryEngine<'a> {
    store: &'a IntervalStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a IntervalStore) -> Self {
        Self { store }
    }

    /// VRPs whose prefix covers `prefix` during `filter`, most specific
    /// prefix first. Each (key, interval) pair appears once.
    pub fn covering(&self, prefix: &Prefix, filter: &TimeFilter) -> HistoryResult<Vec<CoveringVrp>> {
        self.covering_in_view(prefix, filter, self.store.read_view())
    }

    /// Same as [`covering`](Self::covering) against an explicitly pinned
    /// view, so several queries can share one consistent state.
    pub fn covering_in_view(
        &self,
        prefix: &Prefix,
        filter: &TimeFilter,
        view: Option<LedgerSpan>,
    ) -> HistoryResult<Vec<CoveringVrp>> {
        let (span, window) = filter.resolve(view)?;
        let results = self.store.scan_covering(prefix, &span, &window)?;
        debug!(
            "Covering query {} at {}: {} results",
            prefix,
            filter,
            results.len()
        );
        Ok(results)
    }
}
