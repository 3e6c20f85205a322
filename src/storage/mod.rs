// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

pub mod database;
pub mod directory;
pub mod errors;
pub(crate) mod keys;

pub use database::{ChangeSet, IntervalStore, IntervalStoreBuilder};
pub use directory::{DataDirectoryError, DataDirectoryManager};
pub use errors::{StorageError, StorageResult};
