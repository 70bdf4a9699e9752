// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed key/value store.
//!
//! Every key is a single file under `{root}/kv/`. Writes go to a temp file
//! first and are renamed into place, so a reader sees either the previous
//! value or the new one, never a torn write.
//!
//! Vault entries are already encrypted before they reach this module; no
//! crypto is performed here.

use std::fs::{self, File};
use std::io::{self, Read, Write};

use super::paths::is_valid_key;
use super::{KeyValueStore, StoragePaths, StorageError, StorageResult};

/// Key/value store persisted on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    paths: StoragePaths,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `paths`.
    pub fn open(paths: StoragePaths) -> StorageResult<Self> {
        fs::create_dir_all(paths.kv_dir())?;
        Ok(Self { paths })
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    fn checked_key(key: &str) -> StorageResult<()> {
        if is_valid_key(key) {
            Ok(())
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Self::checked_key(key)?;

        let mut file = match File::open(self.paths.kv_entry(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut value = String::new();
        file.read_to_string(&mut value)?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        Self::checked_key(key)?;

        let path = self.paths.kv_entry(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        Self::checked_key(key)?;

        match fs::remove_file(self.paths.kv_entry(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
