// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rpki_history::config::StoreConfig;
use rpki_history::{RpkiHistory, VrpKey};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn vrp(asn: u32, prefix: &str, max_length: u8, trust_anchor: &str) -> VrpKey {
    VrpKey::new(asn, prefix.parse().unwrap(), max_length, trust_anchor)
}

pub fn store_config(dir: &Path) -> StoreConfig {
    let mut config = StoreConfig::new();
    config.set_data_dir(dir);
    config.set_flush_every_ms(None);
    config
}

pub fn create_test_history() -> (RpkiHistory, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let history = RpkiHistory::open(&store_config(temp_dir.path())).unwrap();
    (history, temp_dir)
}

/// Writes an rpki-client style CSV export and returns its path.
pub fn write_snapshot(dir: &Path, name: &str, vrps: &[VrpKey]) -> PathBuf {
    let mut content = String::from("ASN,IP Prefix,Max Length,Trust Anchor,Expires\n");
    for vrp in vrps {
        content.push_str(&format!(
            "AS{},{},{},{},1700000000\n",
            vrp.asn, vrp.prefix, vrp.max_length, vrp.trust_anchor
        ));
    }
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Small deterministic generator so randomized scenarios are reproducible.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    pub fn chance(&mut self, percent: u64) -> bool {
        self.next() % 100 < percent
    }
}
