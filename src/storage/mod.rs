// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistent Storage Module
//!
//! Account metadata and vault ciphertext are persisted through a minimal
//! key/value contract ([`KeyValueStore`]). Durability belongs to the store
//! implementation; everything above it only ever writes whole values.
//!
//! ## Implementations
//!
//! - [`InMemoryStore`] - process-local map, used by tests and ephemeral runs
//! - [`FileStore`] - one file per key under `DATA_DIR`, written atomically
//!   via temp file + rename
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   kv/
//!     accounts.index.json         # ordered list of account ids
//!     account.{account_id}.json   # metadata + encrypted vault entry
//! ```
//!
//! ## Important Notes
//!
//! - Values are opaque strings; the registry serialises JSON into them
//! - Plaintext secrets NEVER reach this layer, only vault ciphertext

use std::io;

pub mod accounts;
pub mod file_store;
pub mod memory;
pub mod paths;

pub use accounts::{AccountKind, AccountRecord, AccountRegistry, AccountSummary};
pub use file_store::FileStore;
pub use memory::InMemoryStore;
pub use paths::StoragePaths;

/// Minimal persistent key/value contract consumed by the wallet core.
///
/// `set` must replace the whole value or leave the previous one untouched.
/// `delete` of a missing key is not an error.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Error type for key/value storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The stored value changed since it was read
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// Key contains characters the backend cannot represent
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
