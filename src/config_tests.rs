// File: config_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use rstest::*;
    use std::path::Path;

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();

        assert_eq!(config.data_dir(), None);
        assert_eq!(config.cache_capacity(), 256 * 1024 * 1024);
        assert_eq!(config.flush_every_ms(), Some(1000));
        assert_eq!(config.use_compression(), true);
        assert_eq!(config.default_page_size(), 100);
    }

    #[test]
    fn test_set_data_dir() {
        let mut config = StoreConfig::new();

        config.set_data_dir("/var/lib/rpki-history");
        assert_eq!(config.data_dir(), Some(Path::new("/var/lib/rpki-history")));
    }

    #[test]
    fn test_set_use_compression() {
        let mut config = StoreConfig::new();

        config.set_use_compression(false);
        assert_eq!(config.use_compression(), false);

        config.set_use_compression(true);
        assert_eq!(config.use_compression(), true);
    }

    #[test]
    fn test_disable_periodic_flush() {
        let mut config = StoreConfig::new();

        config.set_flush_every_ms(None);
        assert_eq!(config.flush_every_ms(), None);
    }

    #[rstest]
    #[case(1)]
    #[case(50)]
    #[case(1000)]
    fn test_set_default_page_size(#[case] page_size: u32) {
        let mut config = StoreConfig::new();

        config.set_default_page_size(page_size);
        assert_eq!(config.default_page_size(), page_size);
    }

    #[rstest]
    #[case(0)]
    #[case(1024 * 1024)]
    #[case(1024 * 1024 * 1024)]
    fn test_set_cache_capacity(#[case] capacity: u64) {
        let mut config = StoreConfig::new();

        config.set_cache_capacity(capacity);
        assert_eq!(config.cache_capacity(), capacity);
    }

    #[test]
    fn test_config_clone_is_independent() {
        let mut original = StoreConfig::new();
        original.set_default_page_size(10);

        let mut cloned = original.clone();
        cloned.set_default_page_size(20);

        assert_eq!(original.default_page_size(), 10);
        assert_eq!(cloned.default_page_size(), 20);
    }
}
