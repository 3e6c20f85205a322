// File: keys.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

//! Byte layout of the sled keys.
//!
//! Interval rows are keyed `family | address | length | asn | max_length |
//! ta_len | trust_anchor | from`. Every stored prefix therefore owns a
//! contiguous key range starting with its `family | address | length`
//! bytes, and a containment lookup for `P` is one prefix scan per covering
//! length of `P` instead of a walk over the whole history. Timestamps are
//! big-endian with the sign bit flipped so byte order equals time order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{StorageError, StorageResult};
use crate::models::VrpKey;
use crate::prefix::{AddressFamily, Prefix};

pub(crate) const TIMESTAMP_LEN: usize = 8;

/// Interval end as persisted. A closed row remembers the dump that closed
/// it so readers pinned to an earlier dump still see it as open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum StoredEnd {
    Open,
    Closed { last_seen: i64, closed_by: i64 },
}

fn encode_millis(millis: i64) -> [u8; TIMESTAMP_LEN] {
    ((millis as u64) ^ (1 << 63)).to_be_bytes()
}

/// Millisecond key of `timestamp`, rounding any sub-millisecond part down.
pub(crate) fn encode_timestamp(timestamp: DateTime<Utc>) -> [u8; TIMESTAMP_LEN] {
    encode_millis(timestamp.timestamp_millis())
}

/// Same as [`encode_timestamp`] but rounds up, for inclusive lower bounds.
pub(crate) fn encode_timestamp_ceil(timestamp: DateTime<Utc>) -> [u8; TIMESTAMP_LEN] {
    let millis = timestamp.timestamp_millis();
    if timestamp.timestamp_subsec_nanos() % 1_000_000 == 0 {
        encode_millis(millis)
    } else {
        encode_millis(millis.saturating_add(1))
    }
}

pub(crate) fn decode_timestamp(bytes: &[u8]) -> StorageResult<DateTime<Utc>> {
    let raw: [u8; TIMESTAMP_LEN] = bytes
        .try_into()
        .map_err(|_| StorageError::InvalidData(format!("timestamp of {} bytes", bytes.len())))?;
    millis_to_datetime((u64::from_be_bytes(raw) ^ (1 << 63)) as i64)
}

pub(crate) fn millis_to_datetime(millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StorageError::InvalidData(format!("timestamp {} out of range", millis)))
}

fn address_width(family: AddressFamily) -> usize {
    match family {
        AddressFamily::Ipv4 => 4,
        AddressFamily::Ipv6 => 16,
    }
}

pub(crate) fn encode_prefix(prefix: &Prefix, out: &mut Vec<u8>) {
    out.push(prefix.family().tag());
    let bytes = prefix.bits().to_be_bytes();
    out.extend_from_slice(&bytes[16 - address_width(prefix.family())..]);
    out.push(prefix.length());
}

pub(crate) fn prefix_scan_key(prefix: &Prefix) -> Vec<u8> {
    let mut out = Vec::with_capacity(18);
    encode_prefix(prefix, &mut out);
    out
}

pub(crate) fn encode_vrp_key(key: &VrpKey) -> StorageResult<Vec<u8>> {
    let ta = key.trust_anchor.as_bytes();
    let ta_len = u8::try_from(ta.len()).map_err(|_| {
        StorageError::InvalidData(format!("trust anchor label too long: {}", key.trust_anchor))
    })?;

    let mut out = Vec::with_capacity(24 + ta.len() + TIMESTAMP_LEN);
    encode_prefix(&key.prefix, &mut out);
    out.extend_from_slice(&key.asn.to_be_bytes());
    out.push(key.max_length);
    out.push(ta_len);
    out.extend_from_slice(ta);
    Ok(out)
}

pub(crate) fn encode_interval_key(key: &VrpKey, from: DateTime<Utc>) -> StorageResult<Vec<u8>> {
    let mut out = encode_vrp_key(key)?;
    out.extend_from_slice(&encode_timestamp(from));
    Ok(out)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> StorageResult<&'a [u8]> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(StorageError::InvalidData(format!(
                "truncated key of {} bytes",
                self.bytes.len()
            )));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> StorageResult<u8> {
        Ok(self.take(1)?[0])
    }
}

fn decode_vrp_key_prefix(cursor: &mut Cursor<'_>) -> StorageResult<VrpKey> {
    let tag = cursor.byte()?;
    let family = AddressFamily::from_tag(tag)
        .ok_or_else(|| StorageError::InvalidData(format!("unknown address family tag {}", tag)))?;
    let width = address_width(family);
    let mut raw = [0u8; 16];
    raw[16 - width..].copy_from_slice(cursor.take(width)?);
    let len = cursor.byte()?;
    let prefix = Prefix::from_raw(family, u128::from_be_bytes(raw), len)
        .ok_or_else(|| StorageError::InvalidData("non-canonical prefix in key".to_string()))?;

    let mut asn = [0u8; 4];
    asn.copy_from_slice(cursor.take(4)?);
    let max_length = cursor.byte()?;
    let ta_len = cursor.byte()? as usize;
    let trust_anchor = std::str::from_utf8(cursor.take(ta_len)?)
        .map_err(|e| StorageError::InvalidData(format!("trust anchor is not UTF-8: {}", e)))?;

    Ok(VrpKey::new(
        u32::from_be_bytes(asn),
        prefix,
        max_length,
        trust_anchor,
    ))
}

pub(crate) fn decode_vrp_key(bytes: &[u8]) -> StorageResult<VrpKey> {
    let mut cursor = Cursor { bytes, pos: 0 };
    let key = decode_vrp_key_prefix(&mut cursor)?;
    if cursor.pos != bytes.len() {
        return Err(StorageError::InvalidData("trailing bytes after VRP key".to_string()));
    }
    Ok(key)
}

/// Splits an interval row key into its VRP and the `from` timestamp.
pub(crate) fn decode_interval_key(bytes: &[u8]) -> StorageResult<(VrpKey, DateTime<Utc>)> {
    if bytes.len() < TIMESTAMP_LEN {
        return Err(StorageError::InvalidData("interval key too short".to_string()));
    }
    let (key_bytes, from) = bytes.split_at(bytes.len() - TIMESTAMP_LEN);
    Ok((decode_vrp_key(key_bytes)?, decode_timestamp(from)?))
}

/// Only the `from` part of an interval key, for filtering before the rest
/// of the row is decoded.
pub(crate) fn interval_key_from(bytes: &[u8]) -> StorageResult<DateTime<Utc>> {
    if bytes.len() < TIMESTAMP_LEN {
        return Err(StorageError::InvalidData("interval key too short".to_string()));
    }
    decode_timestamp(&bytes[bytes.len() - TIMESTAMP_LEN..])
}
