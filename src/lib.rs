// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_inception)]
#![allow(clippy::bool_assert_comparison)]
#![allow(clippy::new_without_default)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod history;
pub mod ingest;
pub mod ledger;
pub mod models;
pub mod prefix;
pub mod query;
pub mod snapshot;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod config_tests;

pub use errors::{HistoryError, HistoryResult, ParseError};
pub use history::RpkiHistory;
pub use models::{CoveringVrp, DumpRecord, IntervalEnd, LedgerSpan, VisibilityInterval, VrpKey};
pub use prefix::Prefix;
pub use query::TimeFilter;
pub use validation::{ReasonCode, ValidationStatus};
