// File: history.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::errors::{HistoryError, HistoryResult};
use crate::ingest::DiffEngine;
use crate::ledger::{LedgerPage, LedgerQuery, MetadataLedger};
use crate::models::{CoveringVrp, DumpRecord, LedgerSpan, VrpKey};
use crate::prefix::Prefix;
use crate::query::{QueryEngine, TimeFilter};
use crate::snapshot::Snapshot;
use crate::storage::{IntervalStore, IntervalStoreBuilder};
use crate::validation::{ValidationStatus, Validator};

/// Shared handle to one VRP history. Cloning is cheap; clones may query
/// from any thread while another ingests.
#[derive(Clone)]
pub struct RpkiHistory {
    store: Arc<IntervalStore>,
    default_page_size: u32,
}

impl RpkiHistory {
    pub fn open(config: &StoreConfig) -> HistoryResult<Self> {
        let store = IntervalStore::open(config)?;
        Ok(Self {
            store: Arc::new(store),
            default_page_size: config.default_page_size(),
        })
    }

    /// History held in memory only, dropped with the last handle.
    pub fn temporary() -> HistoryResult<Self> {
        let store = IntervalStoreBuilder::new().temporary().build()?;
        Ok(Self {
            store: Arc::new(store),
            default_page_size: StoreConfig::default().default_page_size(),
        })
    }

    pub fn ingest(&self, snapshot: &[VrpKey], timestamp: DateTime<Utc>) -> HistoryResult<DumpRecord> {
        DiffEngine::new(&self.store).ingest(snapshot, timestamp)
    }

    /// Ingests a loaded CSV snapshot, using `timestamp` when given and the
    /// time from the file name otherwise.
    pub fn ingest_snapshot(
        &self,
        snapshot: &Snapshot,
        timestamp: Option<DateTime<Utc>>,
    ) -> HistoryResult<DumpRecord> {
        let timestamp = timestamp.or(snapshot.timestamp).ok_or_else(|| {
            HistoryError::InvalidQuery("snapshot has no timestamp".to_string())
        })?;
        self.ingest(&snapshot.vrps, timestamp)
    }

    pub fn covering(&self, prefix: &Prefix, filter: &TimeFilter) -> HistoryResult<Vec<CoveringVrp>> {
        QueryEngine::new(&self.store).covering(prefix, filter)
    }

    pub fn status(
        &self,
        prefix: &Prefix,
        asn: u32,
        at: Option<DateTime<Utc>>,
    ) -> HistoryResult<ValidationStatus> {
        Validator::new(&self.store).status(prefix, asn, at)
    }

    pub fn metadata(&self, query: &LedgerQuery) -> HistoryResult<LedgerPage> {
        MetadataLedger::new(&self.store).page(query)
    }

    /// A ledger query for page 1 with the configured page size.
    pub fn ledger_query(&self) -> LedgerQuery {
        LedgerQuery::new(self.default_page_size)
    }

    pub fn span(&self) -> Option<LedgerSpan> {
        self.store.read_view()
    }

    pub fn stats(&self) -> HistoryResult<HashMap<String, u64>> {
        Ok(self.store.stats()?)
    }

    pub fn verify_integrity(&self) -> HistoryResult<Vec<String>> {
        Ok(self.store.verify_integrity()?)
    }

    pub fn flush(&self) -> HistoryResult<()> {
        Ok(self.store.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_open_with_configured_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = StoreConfig::new();
        config.set_data_dir(temp_dir.path());
        config.set_default_page_size(7);

        let history = RpkiHistory::open(&config).unwrap();
        assert_eq!(history.ledger_query().page_size, 7);
        assert!(history.span().is_none());
        assert!(temp_dir.path().join("store").exists());
    }

    #[test]
    fn test_snapshot_without_timestamp_is_rejected() {
        let history = RpkiHistory::temporary().unwrap();
        let snapshot = Snapshot {
            timestamp: None,
            vrps: vec![],
        };
        assert!(matches!(
            history.ingest_snapshot(&snapshot, None),
            Err(HistoryError::InvalidQuery(_))
        ));

        let record = history.ingest_snapshot(&snapshot, Some(ts(100))).unwrap();
        assert_eq!(record.timestamp, ts(100));
    }

    #[test]
    fn test_clones_share_state() {
        let history = RpkiHistory::temporary().unwrap();
        let clone = history.clone();
        history.ingest(&[], ts(100)).unwrap();
        assert_eq!(clone.span(), Some(LedgerSpan::single(ts(100))));
    }
}
