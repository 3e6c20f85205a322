// File: errors.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use sled::transaction::TransactionError;
use std::fmt;

/// Failures of the sled-backed interval store.
#[derive(Debug)]
pub enum StorageError {
    /// sled reported an error while opening, reading or flushing a tree.
    Database(String),
    /// An interval end or dump record could not be (de)serialized.
    Serialization(bincode::Error),
    /// A persisted key or timestamp does not decode.
    InvalidData(String),
    /// A commit was aborted because it would break an interval invariant.
    Inconsistent(String),
    DataDirectory(String),
    Configuration(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(e) => write!(f, "Interval store error: {}", e),
            Self::Serialization(e) => write!(f, "Failed to encode stored interval data: {}", e),
            Self::InvalidData(msg) => write!(f, "Corrupted store entry: {}", msg),
            Self::Inconsistent(msg) => write!(f, "Interval invariant violated: {}", msg),
            Self::DataDirectory(msg) => write!(f, "Data directory unusable: {}", msg),
            Self::Configuration(msg) => write!(f, "Store configuration error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sled::Error> for StorageError {
    fn from(error: sled::Error) -> Self {
        Self::Database(error.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(error: bincode::Error) -> Self {
        Self::Serialization(error)
    }
}

/// Aborts carry our own error through the transaction unchanged.
impl From<TransactionError<StorageError>> for StorageError {
    fn from(error: TransactionError<StorageError>) -> Self {
        match error {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => Self::from(e),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_abort_keeps_inner_error() {
        let aborted = TransactionError::Abort(StorageError::Inconsistent("dup".to_string()));
        assert!(matches!(
            StorageError::from(aborted),
            StorageError::Inconsistent(msg) if msg == "dup"
        ));
    }

    #[test]
    fn test_storage_failure_maps_to_database() {
        let failed: TransactionError<StorageError> =
            TransactionError::Storage(sled::Error::Unsupported("tree".to_string()));
        assert!(matches!(StorageError::from(failed), StorageError::Database(_)));
    }
}
