// File: ingest.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

use crate::errors::{HistoryError, HistoryResult, ParseError};
use crate::models::{DumpRecord, VrpKey};
use crate::storage::{ChangeSet, IntervalStore};

/// Set difference between a snapshot and the currently open keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub new_keys: Vec<VrpKey>,
    pub continuing: usize,
    /// Vanished keys with the `from` of the interval to close.
    pub vanished: Vec<(VrpKey, DateTime<Utc>)>,
}

/// Linear in `snapshot.len() + open_keys.len()`. Fails on the first key
/// that appears twice in the snapshot or whose max length does not fit its
/// prefix.
pub fn compute_diff(
    snapshot: &[VrpKey],
    open_keys: &HashMap<VrpKey, DateTime<Utc>>,
) -> HistoryResult<SnapshotDiff> {
    let mut seen = HashSet::with_capacity(snapshot.len());
    let mut diff = SnapshotDiff::default();

    for key in snapshot {
        if !key.max_length_fits() {
            return Err(ParseError::MaxLength {
                prefix: key.prefix,
                max_length: key.max_length,
            }
            .into());
        }
        if !seen.insert(key) {
            return Err(HistoryError::DuplicateKeyInSnapshot(key.clone()));
        }
        if open_keys.contains_key(key) {
            diff.continuing += 1;
        } else {
            diff.new_keys.push(key.clone());
        }
    }

    diff.vanished = open_keys
        .iter()
        .filter(|(key, _)| !seen.contains(key))
        .map(|(key, from)| (key.clone(), *from))
        .collect();

    Ok(diff)
}

/// Applies snapshots to the interval store, one at a time and in timestamp
/// order.
pub struct DiffEngine<'a> {
    store: &'a IntervalStore,
}

impl<'a> DiffEngine<'a> {
    pub fn new(store: &'a IntervalStore) -> Self {
        Self { store }
    }

    pub fn ingest(&self, snapshot: &[VrpKey], timestamp: DateTime<Utc>) -> HistoryResult<DumpRecord> {
        if timestamp.timestamp_subsec_nanos() % 1_000_000 != 0 {
            return Err(ParseError::SubMillisecond(timestamp).into());
        }
        let _guard = self
            .store
            .try_lock_ingest()
            .ok_or(HistoryError::ConcurrentIngestion)?;

        let previous = self.store.read_view().map(|span| span.latest);
        if let Some(latest) = previous {
            if timestamp <= latest {
                return Err(HistoryError::OutOfOrderIngestion { timestamp, latest });
            }
        }

        let open_keys = self.store.open_keys()?;
        debug!("Loaded {} open intervals before dump {}", open_keys.len(), timestamp);

        let diff = compute_diff(snapshot, &open_keys)?;
        debug!(
            "Dump {}: {} new, {} continuing, {} vanished",
            timestamp,
            diff.new_keys.len(),
            diff.continuing,
            diff.vanished.len()
        );

        let record = DumpRecord {
            timestamp,
            deleted_count: diff.vanished.len() as u64,
            updated_count: diff.continuing as u64,
            new_count: diff.new_keys.len() as u64,
            ingested_at: Utc::now(),
        };

        self.store.commit(&ChangeSet {
            opened: diff.new_keys,
            closed: diff.vanished,
            closed_at: previous,
            record: record.clone(),
        })?;

        info!(
            "Ingested dump {} ({} VRPs): {} new, {} updated, {} deleted",
            timestamp,
            snapshot.len(),
            record.new_count,
            record.updated_count,
            record.deleted_count
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LedgerSpan, VisibilityInterval};
    use crate::storage::IntervalStoreBuilder;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn vrp(prefix: &str, asn: u32) -> VrpKey {
        VrpKey::new(asn, prefix.parse().unwrap(), 24, "arin")
    }

    fn temporary_store() -> IntervalStore {
        IntervalStoreBuilder::new().temporary().build().unwrap()
    }

    #[test]
    fn test_compute_diff_partitions_keys() {
        let mut open = HashMap::new();
        open.insert(vrp("10.0.0.0/24", 1), ts(1));
        open.insert(vrp("10.0.1.0/24", 2), ts(1));

        let snapshot = vec![vrp("10.0.1.0/24", 2), vrp("10.0.2.0/24", 3)];
        let diff = compute_diff(&snapshot, &open).unwrap();

        assert_eq!(diff.new_keys, vec![vrp("10.0.2.0/24", 3)]);
        assert_eq!(diff.continuing, 1);
        assert_eq!(diff.vanished, vec![(vrp("10.0.0.0/24", 1), ts(1))]);
    }

    #[test]
    fn test_compute_diff_rejects_duplicates() {
        let snapshot = vec![vrp("10.0.0.0/24", 1), vrp("10.0.0.0/24", 1)];
        let result = compute_diff(&snapshot, &HashMap::new());
        assert!(matches!(result, Err(HistoryError::DuplicateKeyInSnapshot(_))));
    }

    #[test]
    fn test_keys_differing_only_in_trust_anchor_are_distinct() {
        let prefix = "10.0.0.0/24".parse().unwrap();
        let snapshot = vec![
            VrpKey::new(1, prefix, 24, "arin"),
            VrpKey::new(1, prefix, 24, "ripe"),
        ];
        let diff = compute_diff(&snapshot, &HashMap::new()).unwrap();
        assert_eq!(diff.new_keys.len(), 2);
    }

    #[test]
    fn test_conservation_across_dumps() {
        let store = temporary_store();
        let engine = DiffEngine::new(&store);
        let dumps = vec![
            vec![vrp("10.0.0.0/24", 1), vrp("10.0.1.0/24", 2)],
            vec![vrp("10.0.1.0/24", 2), vrp("10.0.2.0/24", 3), vrp("10.0.3.0/24", 4)],
            vec![],
            vec![vrp("10.0.0.0/24", 1)],
        ];

        for (i, dump) in dumps.iter().enumerate() {
            let before = store.open_keys().unwrap().len() as u64;
            let record = engine.ingest(dump, ts(100 * (i as i64 + 1))).unwrap();
            let after = store.open_keys().unwrap().len() as u64;

            assert_eq!(after, before - record.deleted_count + record.new_count);
            assert_eq!(record.updated_count, dump.len() as u64 - record.new_count);
        }
        assert!(store.verify_integrity().unwrap().is_empty());
    }

    #[test]
    fn test_vanish_and_reappear_opens_new_interval() {
        let store = temporary_store();
        let engine = DiffEngine::new(&store);
        let key = vrp("10.0.0.0/24", 1);

        engine.ingest(&[key.clone()], ts(100)).unwrap();
        let record = engine.ingest(&[], ts(200)).unwrap();
        assert_eq!(record.deleted_count, 1);
        engine.ingest(&[key.clone()], ts(300)).unwrap();

        let view = store.read_view().unwrap();
        let intervals = store.intervals_for_key(&key, &view).unwrap();
        assert_eq!(
            intervals,
            vec![
                VisibilityInterval::closed(ts(100), ts(100)),
                VisibilityInterval::open(ts(300)),
            ]
        );
    }

    #[test]
    fn test_out_of_order_and_duplicate_timestamps_are_rejected() {
        let store = temporary_store();
        let engine = DiffEngine::new(&store);
        engine.ingest(&[vrp("10.0.0.0/24", 1)], ts(200)).unwrap();

        for bad in [ts(100), ts(200)] {
            let result = engine.ingest(&[], bad);
            assert!(matches!(
                result,
                Err(HistoryError::OutOfOrderIngestion { .. })
            ));
        }
        assert_eq!(store.read_view(), Some(LedgerSpan::single(ts(200))));
    }

    #[test]
    fn test_duplicate_snapshot_leaves_store_untouched() {
        let store = temporary_store();
        let engine = DiffEngine::new(&store);
        engine.ingest(&[vrp("10.0.0.0/24", 1)], ts(100)).unwrap();

        let key = vrp("10.0.5.0/24", 5);
        let result = engine.ingest(&[key.clone(), key], ts(200));
        assert!(matches!(result, Err(HistoryError::DuplicateKeyInSnapshot(_))));
        assert_eq!(store.read_view(), Some(LedgerSpan::single(ts(100))));
        assert_eq!(store.open_keys().unwrap().len(), 1);
    }

    #[test]
    fn test_sub_millisecond_timestamp_is_rejected_not_rounded() {
        let store = temporary_store();
        let engine = DiffEngine::new(&store);
        let key = vrp("10.0.0.0/24", 1);
        let precise = Utc.timestamp_opt(100, 500_000).unwrap();

        let result = engine.ingest(&[key.clone()], precise);
        assert!(matches!(
            result,
            Err(HistoryError::Parse(ParseError::SubMillisecond(t))) if t == precise
        ));
        assert_eq!(store.read_view(), None);

        let with_millis = Utc.timestamp_opt(100, 7_000_000).unwrap();
        let record = engine.ingest(&[key], with_millis).unwrap();
        assert_eq!(record.timestamp, with_millis);
        assert_eq!(store.read_view(), Some(LedgerSpan::single(with_millis)));

        let next_millisecond = Utc.timestamp_opt(100, 8_000_000).unwrap();
        assert!(engine.ingest(&[], next_millisecond).is_ok());
    }

    #[test]
    fn test_max_length_must_fit_prefix() {
        let store = temporary_store();
        let engine = DiffEngine::new(&store);
        let prefix = "10.0.0.0/24".parse().unwrap();

        for max_length in [8, 33, 200] {
            let result = engine.ingest(&[VrpKey::new(1, prefix, max_length, "arin")], ts(100));
            assert!(matches!(
                result,
                Err(HistoryError::Parse(ParseError::MaxLength { .. }))
            ));
        }
        assert_eq!(store.read_view(), None);

        let record = engine
            .ingest(&[VrpKey::new(1, prefix, 32, "arin")], ts(100))
            .unwrap();
        assert_eq!(record.new_count, 1);
    }

    #[test]
    fn test_concurrent_ingestion_is_rejected() {
        let store = temporary_store();
        let engine = DiffEngine::new(&store);
        let _held = store.try_lock_ingest().unwrap();

        let result = engine.ingest(&[vrp("10.0.0.0/24", 1)], ts(100));
        assert!(matches!(result, Err(HistoryError::ConcurrentIngestion)));
        assert_eq!(store.read_view(), None);
    }
}
