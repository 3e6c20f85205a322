// File: ledger.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{HistoryError, HistoryResult};
use crate::models::{DumpRecord, TimeWindow};
use crate::storage::IntervalStore;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// One page of the metadata ledger. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page: u32,
    pub page_size: u32,
}

impl LedgerQuery {
    pub fn new(page_size: u32) -> Self {
        Self {
            start: None,
            end: None,
            page: 1,
            page_size,
        }
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

impl Default for LedgerQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerPage {
    pub records: Vec<DumpRecord>,
    pub page: u32,
    pub page_size: u32,
    /// Set when at least one more record follows this page.
    pub next_page: Option<u32>,
}

pub struct MetadataLedger<'a> {
    store: &'a IntervalStore,
}

impl<'a> MetadataLedger<'a> {
    pub fn new(store: &'a IntervalStore) -> Self {
        Self { store }
    }

    pub fn page(&self, query: &LedgerQuery) -> HistoryResult<LedgerPage> {
        if query.page == 0 || query.page_size == 0 {
            return Err(HistoryError::InvalidQuery(
                "page and page_size start at 1".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (query.start, query.end) {
            if start > end {
                return Err(HistoryError::InvalidQuery(format!(
                    "range start {} is after its end {}",
                    start, end
                )));
            }
        }

        let mut page = LedgerPage {
            records: Vec::new(),
            page: query.page,
            page_size: query.page_size,
            next_page: None,
        };
        let view = match self.store.read_view() {
            Some(view) => view,
            None => return Ok(page),
        };

        let skip = (u64::from(query.page) - 1) * u64::from(query.page_size);
        let skip = usize::try_from(skip)
            .map_err(|_| HistoryError::InvalidQuery(format!("page {} is too large", query.page)))?;
        let take = query.page_size as usize;
        let window = TimeWindow {
            start: query.start,
            end: query.end,
        };

        let mut records = self.store.dump_records(&view, &window, skip, take + 1)?;
        if records.len() > take {
            records.truncate(take);
            page.next_page = query.page.checked_add(1);
        }
        page.records = records;
        Ok(page)
    }
}
