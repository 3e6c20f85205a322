// File: database.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use sled::transaction::ConflictableTransactionError;
use sled::{Db, Transactional, Tree};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

use super::directory::DataDirectoryManager;
use super::errors::{StorageError, StorageResult};
use super::keys::*;
use crate::config::StoreConfig;
use crate::models::{CoveringVrp, DumpRecord, LedgerSpan, TimeWindow, VisibilityInterval, VrpKey};
use crate::prefix::Prefix;

const TREE_INTERVALS: &str = "intervals";
const TREE_OPEN: &str = "open";
const TREE_LEDGER: &str = "ledger";

/// All mutations produced by one ingestion, applied in a single transaction.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Keys that get a fresh open interval starting at `record.timestamp`.
    pub opened: Vec<VrpKey>,
    /// Keys whose open interval (identified by its `from`) gets closed.
    pub closed: Vec<(VrpKey, DateTime<Utc>)>,
    /// Last dump in which the closed keys were seen.
    pub closed_at: Option<DateTime<Utc>>,
    pub record: DumpRecord,
}

/// sled-backed interval store.
///
/// Three trees: `intervals` maps (vrp, from) to the interval end, `open`
/// maps a vrp to the `from` of its open interval, and `ledger` maps dump
/// timestamps to their counters. Readers never look at `open`; they resolve
/// interval rows against a pinned [`LedgerSpan`] instead, which keeps them
/// consistent while an ingestion is being applied.
pub struct IntervalStore {
    db: Db,
    intervals: Tree,
    open: Tree,
    ledger: Tree,
    span: RwLock<Option<LedgerSpan>>,
    ingest_lock: Mutex<()>,
}

impl IntervalStore {
    pub fn open(config: &StoreConfig) -> StorageResult<Self> {
        IntervalStoreBuilder::from_config(config)?.build()
    }

    fn from_db(db: Db) -> StorageResult<Self> {
        let intervals = db
            .open_tree(TREE_INTERVALS)
            .map_err(|e| StorageError::Database(format!("Failed to open intervals tree: {}", e)))?;
        let open = db
            .open_tree(TREE_OPEN)
            .map_err(|e| StorageError::Database(format!("Failed to open open-key tree: {}", e)))?;
        let ledger = db
            .open_tree(TREE_LEDGER)
            .map_err(|e| StorageError::Database(format!("Failed to open ledger tree: {}", e)))?;

        let span = Self::load_span(&ledger)?;
        if let Some(span) = span {
            info!(
                "Opened interval store with dumps from {} to {}",
                span.earliest, span.latest
            );
        }

        Ok(Self {
            db,
            intervals,
            open,
            ledger,
            span: RwLock::new(span),
            ingest_lock: Mutex::new(()),
        })
    }

    fn load_span(ledger: &Tree) -> StorageResult<Option<LedgerSpan>> {
        let first = ledger.first()?;
        let last = ledger.last()?;
        match (first, last) {
            (Some((earliest, _)), Some((latest, _))) => Ok(Some(LedgerSpan {
                earliest: decode_timestamp(&earliest)?,
                latest: decode_timestamp(&latest)?,
            })),
            _ => Ok(None),
        }
    }

    /// The committed ledger span. Queries pin this once and resolve every
    /// row against it.
    pub fn read_view(&self) -> Option<LedgerSpan> {
        *self.span.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-blocking acquisition of the single-writer lock.
    pub fn try_lock_ingest(&self) -> Option<MutexGuard<'_, ()>> {
        match self.ingest_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Every key holding an open interval, with that interval's `from`.
    pub fn open_keys(&self) -> StorageResult<HashMap<VrpKey, DateTime<Utc>>> {
        let mut keys = HashMap::with_capacity(self.open.len());
        for item in self.open.iter() {
            let (key, from) = item?;
            keys.insert(decode_vrp_key(&key)?, decode_timestamp(&from)?);
        }
        Ok(keys)
    }

    /// Applies one ingestion atomically: every closure and opening plus the
    /// ledger entry land together or not at all. Once the transaction has
    /// committed the new span is published, even if the following flush
    /// fails, so readers and the next ingestion agree with what is stored.
    pub fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        self.apply(changes)?;
        self.publish(changes.record.timestamp, self.flush());
        Ok(())
    }

    fn apply(&self, changes: &ChangeSet) -> StorageResult<()> {
        let timestamp = changes.record.timestamp;
        let stamp = encode_timestamp(timestamp);
        let open_value = bincode::serialize(&StoredEnd::Open)?;
        let record_value = bincode::serialize(&changes.record)?;

        let mut opened = Vec::with_capacity(changes.opened.len());
        for key in &changes.opened {
            opened.push((encode_vrp_key(key)?, encode_interval_key(key, timestamp)?));
        }

        let mut closed = Vec::with_capacity(changes.closed.len());
        let mut closed_value = Vec::new();
        if !changes.closed.is_empty() {
            let last_seen = changes.closed_at.ok_or_else(|| {
                StorageError::Inconsistent("closing intervals without a previous dump".to_string())
            })?;
            closed_value = bincode::serialize(&StoredEnd::Closed {
                last_seen: last_seen.timestamp_millis(),
                closed_by: timestamp.timestamp_millis(),
            })?;
            for (key, from) in &changes.closed {
                if *from > last_seen {
                    return Err(StorageError::Inconsistent(format!(
                        "{}: interval from {} would close before it starts ({})",
                        key, from, last_seen
                    )));
                }
                closed.push((encode_vrp_key(key)?, encode_interval_key(key, *from)?, key));
            }
        }
        debug!(
            "Committing dump {}: {} openings, {} closures",
            timestamp,
            opened.len(),
            closed.len()
        );

        (&self.intervals, &self.open, &self.ledger).transaction(|(intervals, open, ledger)| {
            if ledger.get(stamp)?.is_some() {
                return abort(format!("dump {} is already recorded", timestamp));
            }
            for (vrp_bytes, row_key, key) in &closed {
                let current = match intervals.get(row_key.as_slice())? {
                    Some(current) => current,
                    None => return abort(format!("{}: no interval row to close", key)),
                };
                let end: StoredEnd = bincode::deserialize(&current)
                    .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
                if end != StoredEnd::Open {
                    return abort(format!("{}: interval is already closed", key));
                }
                intervals.insert(row_key.as_slice(), closed_value.as_slice())?;
                open.remove(vrp_bytes.as_slice())?;
            }
            for (vrp_bytes, row_key) in &opened {
                if open.get(vrp_bytes.as_slice())?.is_some() {
                    return abort("key already holds an open interval".to_string());
                }
                intervals.insert(row_key.as_slice(), open_value.as_slice())?;
                open.insert(vrp_bytes.as_slice(), &stamp[..])?;
            }
            ledger.insert(&stamp[..], record_value.as_slice())?;
            Ok(())
        })?;
        Ok(())
    }

    /// Makes a committed dump visible. A failed flush is only logged: the
    /// transaction is already applied and sled flushes again on its own.
    fn publish(&self, timestamp: DateTime<Utc>, flushed: StorageResult<()>) {
        {
            let mut span = self.span.write().unwrap_or_else(PoisonError::into_inner);
            *span = Some(match *span {
                Some(current) => current.extended_to(timestamp),
                None => LedgerSpan::single(timestamp),
            });
        }
        if let Err(e) = flushed {
            warn!("Dump {} is committed but not yet flushed: {}", timestamp, e);
        }
    }

    /// All intervals of `key` as seen from `view`, oldest first.
    pub fn intervals_for_key(
        &self,
        key: &VrpKey,
        view: &LedgerSpan,
    ) -> StorageResult<Vec<VisibilityInterval>> {
        let mut intervals = Vec::new();
        for item in self.intervals.scan_prefix(encode_vrp_key(key)?) {
            let (row_key, value) = item?;
            let from = interval_key_from(&row_key)?;
            let end: StoredEnd = bincode::deserialize(&value)?;
            if let Some(interval) = resolve(from, end, view)? {
                intervals.push(interval);
            }
        }
        Ok(intervals)
    }

    /// Intervals whose prefix covers `prefix` and which overlap `window`,
    /// most specific prefix first. Only the key ranges of the covering
    /// prefixes are visited.
    pub fn scan_covering(
        &self,
        prefix: &Prefix,
        view: &LedgerSpan,
        window: &TimeWindow,
    ) -> StorageResult<Vec<CoveringVrp>> {
        let mut results = Vec::new();
        let mut rows_seen = 0usize;

        for candidate in prefix.covering_prefixes() {
            for item in self.intervals.scan_prefix(prefix_scan_key(&candidate)) {
                let (row_key, value) = item?;
                rows_seen += 1;

                let from = interval_key_from(&row_key)?;
                if from > view.latest || !window.admits_start(from) {
                    continue;
                }
                let end: StoredEnd = bincode::deserialize(&value)?;
                if let Some(interval) = resolve(from, end, view)? {
                    if window.overlaps(&interval, view.latest) {
                        let (key, _) = decode_interval_key(&row_key)?;
                        results.push(CoveringVrp { key, interval });
                    }
                }
            }
        }

        debug!(
            "Covering scan for {} visited {} rows, matched {}",
            prefix,
            rows_seen,
            results.len()
        );
        Ok(results)
    }

    /// Ledger entries inside `window` and `view`, in timestamp order.
    pub fn dump_records(
        &self,
        view: &LedgerSpan,
        window: &TimeWindow,
        skip: usize,
        take: usize,
    ) -> StorageResult<Vec<DumpRecord>> {
        let low = window.start.map_or(view.earliest, |s| s.max(view.earliest));
        let high = window.end.map_or(view.latest, |e| e.min(view.latest));
        if low > high {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for item in self
            .ledger
            .range(encode_timestamp_ceil(low)..=encode_timestamp(high))
            .skip(skip)
            .take(take)
        {
            let (_, value) = item?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    pub fn flush(&self) -> StorageResult<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::Database(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }

    pub fn stats(&self) -> StorageResult<HashMap<String, u64>> {
        let mut stats = HashMap::new();

        stats.insert("interval_rows".to_string(), self.intervals.len() as u64);
        stats.insert("open_intervals".to_string(), self.open.len() as u64);
        stats.insert("dumps".to_string(), self.ledger.len() as u64);

        let size_on_disk = self
            .db
            .size_on_disk()
            .map_err(|e| StorageError::Database(format!("Failed to get database size: {}", e)))?;
        stats.insert("size_bytes".to_string(), size_on_disk);

        Ok(stats)
    }

    /// Re-checks the interval invariants over everything persisted and
    /// returns one message per violation.
    pub fn verify_integrity(&self) -> StorageResult<Vec<String>> {
        let mut issues = Vec::new();
        let mut previous: Option<(Vec<u8>, DateTime<Utc>, StoredEnd)> = None;
        let mut open_rows = 0u64;

        for item in self.intervals.iter() {
            let (row_key, value) = item?;
            let (key, from) = match decode_interval_key(&row_key) {
                Ok(decoded) => decoded,
                Err(e) => {
                    issues.push(format!("Undecodable interval key: {}", e));
                    continue;
                }
            };
            let end: StoredEnd = match bincode::deserialize(&value) {
                Ok(end) => end,
                Err(e) => {
                    issues.push(format!("{}: corrupted interval end: {}", key, e));
                    continue;
                }
            };
            let key_bytes = &row_key[..row_key.len() - TIMESTAMP_LEN];

            if !self.ledger.contains_key(encode_timestamp(from))? {
                issues.push(format!("{}: interval starts at {} which is not a recorded dump", key, from));
            }

            match end {
                StoredEnd::Open => {
                    open_rows += 1;
                    let indexed = match self.open.get(key_bytes)? {
                        Some(v) => Some(decode_timestamp(&v)?),
                        None => None,
                    };
                    if indexed != Some(from) {
                        issues.push(format!(
                            "{}: open interval from {} is not in the open index",
                            key, from
                        ));
                    }
                }
                StoredEnd::Closed {
                    last_seen,
                    closed_by,
                } => {
                    if last_seen < from.timestamp_millis() || closed_by <= last_seen {
                        issues.push(format!(
                            "{}: closed interval from {} has inverted bounds",
                            key, from
                        ));
                    }
                    for bound in [last_seen, closed_by] {
                        let bound = match millis_to_datetime(bound) {
                            Ok(bound) => bound,
                            Err(e) => {
                                issues.push(format!("{}: corrupted interval bound: {}", key, e));
                                continue;
                            }
                        };
                        if !self.ledger.contains_key(encode_timestamp(bound))? {
                            issues.push(format!(
                                "{}: interval bound {} is not a recorded dump",
                                key, bound
                            ));
                        }
                    }
                }
            }

            if let Some((prev_bytes, prev_from, prev_end)) = &previous {
                if prev_bytes.as_slice() == key_bytes {
                    match prev_end {
                        StoredEnd::Open => issues.push(format!(
                            "{}: open interval from {} is followed by another interval",
                            key, prev_from
                        )),
                        StoredEnd::Closed { last_seen, .. } => {
                            if *last_seen >= from.timestamp_millis() {
                                issues.push(format!(
                                    "{}: intervals from {} and {} overlap",
                                    key, prev_from, from
                                ));
                            }
                        }
                    }
                }
            }
            previous = Some((key_bytes.to_vec(), from, end));
        }

        let indexed = self.open.len() as u64;
        if indexed != open_rows {
            issues.push(format!(
                "Open index mismatch: {} open intervals vs {} index entries",
                open_rows, indexed
            ));
        }

        Ok(issues)
    }
}

fn abort<T>(message: String) -> Result<T, ConflictableTransactionError<StorageError>> {
    Err(ConflictableTransactionError::Abort(StorageError::Inconsistent(
        message,
    )))
}

/// Resolves a stored row against a pinned view: rows opened after the view
/// are invisible, closures made after the view still read as open.
fn resolve(
    from: DateTime<Utc>,
    end: StoredEnd,
    view: &LedgerSpan,
) -> StorageResult<Option<VisibilityInterval>> {
    if from > view.latest {
        return Ok(None);
    }
    match end {
        StoredEnd::Open => Ok(Some(VisibilityInterval::open(from))),
        StoredEnd::Closed { closed_by, .. } if closed_by > view.latest.timestamp_millis() => {
            Ok(Some(VisibilityInterval::open(from)))
        }
        StoredEnd::Closed { last_seen, .. } => Ok(Some(VisibilityInterval::closed(
            from,
            millis_to_datetime(last_seen)?,
        ))),
    }
}

pub struct IntervalStoreBuilder {
    path: Option<PathBuf>,
    cache_capacity: Option<u64>,
    flush_every_ms: Option<Option<u64>>,
    use_compression: bool,
    temporary: bool,
}

impl IntervalStoreBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            cache_capacity: None,
            flush_every_ms: None,
            use_compression: false,
            temporary: false,
        }
    }

    /// Applies `config`, resolving the platform data directory when no
    /// explicit one is set.
    pub fn from_config(config: &StoreConfig) -> StorageResult<Self> {
        let manager = match config.data_dir() {
            Some(dir) => DataDirectoryManager::from_path(dir.to_path_buf())?,
            None => DataDirectoryManager::new()?,
        };

        let mut builder = Self::new()
            .path(manager.store_path())
            .cache_capacity(config.cache_capacity())
            .flush_every_ms(config.flush_every_ms());
        if config.use_compression() {
            builder = builder.enable_compression();
        }
        Ok(builder)
    }

    pub fn path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn enable_compression(mut self) -> Self {
        self.use_compression = true;
        self
    }

    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = Some(ms);
        self
    }

    /// In-memory store removed on drop; no path needed.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn build(self) -> StorageResult<IntervalStore> {
        let mut config = sled::Config::default();

        if self.temporary {
            config = config.temporary(true);
        } else {
            let path = self.path.ok_or_else(|| {
                StorageError::Configuration("Database path not specified".to_string())
            })?;
            config = config.path(path);
        }

        if let Some(capacity) = self.cache_capacity {
            config = config.cache_capacity(capacity);
        }

        if let Some(ms) = self.flush_every_ms {
            config = config.flush_every_ms(ms);
        }

        if self.use_compression {
            config = config.use_compression(true).compression_factor(22);
        }

        let db = config
            .open()
            .map_err(|e| StorageError::Database(format!("Failed to open database: {}", e)))?;

        IntervalStore::from_db(db)
    }
}

impl Default for IntervalStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
