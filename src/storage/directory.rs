// File: directory.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "rpki-history";

#[derive(Debug)]
pub enum DataDirectoryError {
    HomeDirectoryNotFound,
    DirectoryCreation(std::io::Error),
    InvalidPath(String),
}

impl std::fmt::Display for DataDirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HomeDirectoryNotFound => write!(f, "Home directory not found"),
            Self::DirectoryCreation(e) => write!(f, "Failed to create directory: {}", e),
            Self::InvalidPath(path) => write!(f, "Invalid path: {}", path),
        }
    }
}

impl std::error::Error for DataDirectoryError {}

impl From<DataDirectoryError> for super::errors::StorageError {
    fn from(error: DataDirectoryError) -> Self {
        super::errors::StorageError::DataDirectory(error.to_string())
    }
}

/// Owns the on-disk layout: `<base>/store` holds the sled database.
#[derive(Debug)]
pub struct DataDirectoryManager {
    base_path: PathBuf,
}

impl DataDirectoryManager {
    pub fn new() -> Result<Self, DataDirectoryError> {
        let base_path = Self::default_data_directory()?;
        Self::from_path(base_path)
    }

    pub fn from_path(base_path: PathBuf) -> Result<Self, DataDirectoryError> {
        if !base_path.is_absolute() {
            return Err(DataDirectoryError::InvalidPath(format!(
                "{} (path must be absolute)",
                base_path.display()
            )));
        }

        let manager = Self { base_path };
        manager.ensure_directory_exists(&manager.base_path)?;
        Ok(manager)
    }

    pub fn store_path(&self) -> PathBuf {
        self.base_path.join("store")
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn default_data_directory() -> Result<PathBuf, DataDirectoryError> {
        let data_dir = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or(DataDirectoryError::HomeDirectoryNotFound)?
            .join(APP_DIR);

        Ok(data_dir)
    }

    fn ensure_directory_exists(&self, path: &Path) -> Result<(), DataDirectoryError> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(DataDirectoryError::DirectoryCreation)?;
        }
        Ok(())
    }
}
