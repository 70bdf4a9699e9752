// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the file-backed store layout.

use std::path::{Path, PathBuf};

/// Default base directory for persistent storage, relative to the working
/// directory of the daemon.
pub const DATA_ROOT: &str = "./data";

/// Storage path utilities for the file-backed key/value store.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persisted data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Key/Value Paths ==========

    /// Directory holding one file per key.
    pub fn kv_dir(&self) -> PathBuf {
        self.root.join("kv")
    }

    /// Path to the file backing a key.
    ///
    /// Callers must validate the key first; see [`is_valid_key`].
    pub fn kv_entry(&self, key: &str) -> PathBuf {
        self.kv_dir().join(format!("{key}.json"))
    }
}

/// Keys map 1:1 to file names, so only a conservative character set is
/// accepted and path separators or `..` can never appear.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
