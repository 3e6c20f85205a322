// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    data_dir: Option<PathBuf>,
    cache_capacity: u64,
    flush_every_ms: Option<u64>,
    use_compression: bool,
    default_page_size: u32,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            data_dir: None,
            cache_capacity: 256 * 1024 * 1024,
            flush_every_ms: Some(1000),
            use_compression: true,
            default_page_size: 100,
        }
    }

    pub fn set_data_dir<P: Into<PathBuf>>(&mut self, data_dir: P) {
        self.data_dir = Some(data_dir.into());
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn set_cache_capacity(&mut self, cache_capacity: u64) {
        self.cache_capacity = cache_capacity;
    }

    pub fn cache_capacity(&self) -> u64 {
        self.cache_capacity
    }

    pub fn set_flush_every_ms(&mut self, flush_every_ms: Option<u64>) {
        self.flush_every_ms = flush_every_ms;
    }

    pub fn flush_every_ms(&self) -> Option<u64> {
        self.flush_every_ms
    }

    pub fn set_use_compression(&mut self, use_compression: bool) {
        self.use_compression = use_compression;
    }

    pub fn use_compression(&self) -> bool {
        self.use_compression
    }

    pub fn set_default_page_size(&mut self, default_page_size: u32) {
        self.default_page_size = default_page_size;
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
