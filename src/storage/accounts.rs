// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account registry on top of the key/value store.
//!
//! ## Storage Layout
//!
//! ```text
//! accounts.index          # JSON array of account ids, insertion order
//! account.{account_id}    # AccountRecord: metadata + encrypted vault entry
//! ```
//!
//! Metadata and ciphertext share one value, so persisting an account is a
//! single `set`: the entry is either fully written or not at all.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::paths::is_valid_key;
use super::{KeyValueStore, StorageError, StorageResult};
use crate::vault::{DerivationInfo, EncryptedVaultEntry};

const INDEX_KEY: &str = "accounts.index";

fn record_key(account_id: &str) -> String {
    format!("account.{account_id}")
}

/// What the vault entry of an account holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Entry holds a mnemonic; the signing key is re-derived at `derivation.index`
    Mnemonic,
    /// Entry holds a raw secp256k1 private key
    PrivateKey,
}

/// Persisted account: public metadata plus the encrypted secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Unique account identifier (UUID)
    pub id: String,
    /// Human-readable label
    pub name: String,
    /// EIP-55 checksummed address
    pub address: String,
    pub kind: AccountKind,
    /// Present for mnemonic accounts only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<DerivationInfo>,
    pub vault: EncryptedVaultEntry,
    pub created_at: DateTime<Utc>,
}

/// Account view safe to hand to callers (never includes ciphertext).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub kind: AccountKind,
    /// HD index for mnemonic accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation_index: Option<u32>,
    /// Full derivation path for mnemonic accounts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&AccountRecord> for AccountSummary {
    fn from(record: &AccountRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            address: record.address.clone(),
            kind: record.kind,
            derivation_index: record.derivation.as_ref().map(|d| d.index),
            derivation_path: record.derivation.as_ref().map(|d| d.path.clone()),
            created_at: record.created_at,
        }
    }
}

/// CRUD over account records.
///
/// Index read-modify-write cycles are serialised by an internal lock; the
/// store itself only needs atomic single-key writes.
pub struct AccountRegistry {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn read_index(&self) -> StorageResult<Vec<String>> {
        match self.store.get(INDEX_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_index(&self, ids: &[String]) -> StorageResult<()> {
        self.store.set(INDEX_KEY, &serde_json::to_string(ids)?)
    }

    /// Persist a new account.
    ///
    /// # Returns
    /// - `Err(StorageError::AlreadyExists)` if the id or the address is
    ///   already registered
    pub fn add(&self, record: &AccountRecord) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut ids = self.read_index()?;
        if ids.iter().any(|id| id == &record.id) {
            return Err(StorageError::AlreadyExists(format!("Account {}", record.id)));
        }
        if self.find_by_address(&record.address)?.is_some() {
            return Err(StorageError::AlreadyExists(format!(
                "Account with address {}",
                record.address
            )));
        }

        let key = record_key(&record.id);
        if !is_valid_key(&key) {
            return Err(StorageError::InvalidKey(key));
        }
        self.store.set(&key, &serde_json::to_string(record)?)?;

        ids.push(record.id.clone());
        if let Err(e) = self.write_index(&ids) {
            // Roll back so no unreachable record is left behind
            let _ = self.store.delete(&key);
            return Err(e);
        }
        Ok(())
    }

    /// Replace an existing record, provided its stored vault entry is still
    /// `expected`.
    ///
    /// # Returns
    /// - `Err(StorageError::Conflict)` if the entry was re-encrypted since the
    ///   caller read it; nothing is written
    pub fn update(
        &self,
        record: &AccountRecord,
        expected: &EncryptedVaultEntry,
    ) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let stored = self
            .find_by_id(&record.id)?
            .ok_or_else(|| StorageError::NotFound(format!("Account {}", record.id)))?;
        if stored.vault != *expected {
            return Err(StorageError::Conflict(format!("Account {}", record.id)));
        }
        self.store
            .set(&record_key(&record.id), &serde_json::to_string(record)?)
    }

    /// Delete an account and its vault entry.
    pub fn remove(&self, account_id: &str) -> StorageResult<AccountRecord> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let record = self
            .find_by_id(account_id)?
            .ok_or_else(|| StorageError::NotFound(format!("Account {account_id}")))?;

        let ids: Vec<String> = self
            .read_index()?
            .into_iter()
            .filter(|id| id != account_id)
            .collect();
        self.write_index(&ids)?;
        self.store.delete(&record_key(account_id))?;
        Ok(record)
    }

    /// Get an account record by id.
    pub fn find_by_id(&self, account_id: &str) -> StorageResult<Option<AccountRecord>> {
        let key = record_key(account_id);
        if !is_valid_key(&key) {
            return Ok(None);
        }
        match self.store.get(&key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Case-insensitive lookup by address.
    pub fn find_by_address(&self, address: &str) -> StorageResult<Option<AccountRecord>> {
        Ok(self
            .records()?
            .into_iter()
            .find(|r| r.address.eq_ignore_ascii_case(address)))
    }

    /// All records in insertion order.
    pub fn records(&self) -> StorageResult<Vec<AccountRecord>> {
        let mut records = Vec::new();
        for id in self.read_index()? {
            match self.find_by_id(&id)? {
                Some(record) => records.push(record),
                None => tracing::warn!(account_id = %id, "Indexed account has no record"),
            }
        }
        Ok(records)
    }

    /// List account summaries in insertion order.
    pub fn list(&self) -> StorageResult<Vec<AccountSummary>> {
        Ok(self.records()?.iter().map(AccountSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, InMemoryStore, StoragePaths};
    use crate::vault::{DerivationScheme, EncryptedVaultEntry};

    fn sample_entry(account_id: &str) -> EncryptedVaultEntry {
        let now = Utc::now();
        EncryptedVaultEntry {
            version: 2,
            salt: "c2FsdA==".to_string(),
            iv: "aXY=".to_string(),
            ciphertext: "Y2lwaGVy".to_string(),
            account_id: account_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_record(id: &str, address: &str) -> AccountRecord {
        AccountRecord {
            id: id.to_string(),
            name: format!("Account {id}"),
            address: address.to_string(),
            kind: AccountKind::Mnemonic,
            derivation: Some(DerivationInfo::new(DerivationScheme::AddressIndex, 0)),
            vault: sample_entry(id),
            created_at: Utc::now(),
        }
    }

    fn registry() -> AccountRegistry {
        AccountRegistry::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn add_find_list_remove() {
        let registry = registry();
        let a = sample_record("a", "0x00000000000000000000000000000000000000aa");
        let b = sample_record("b", "0x00000000000000000000000000000000000000bb");

        registry.add(&a).unwrap();
        registry.add(&b).unwrap();

        let found = registry.find_by_id("a").unwrap().unwrap();
        assert_eq!(found.address, a.address);

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "a");
        assert_eq!(listed[1].id, "b");
        assert_eq!(listed[0].derivation_index, Some(0));
        assert_eq!(listed[0].derivation_path.as_deref(), Some("m/44'/60'/0'/0/0"));

        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(registry.find_by_id("a").unwrap().is_none());
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_id_or_address_is_rejected() {
        let registry = registry();
        registry
            .add(&sample_record("a", "0x00000000000000000000000000000000000000aa"))
            .unwrap();

        let same_id = sample_record("a", "0x00000000000000000000000000000000000000cc");
        assert!(matches!(
            registry.add(&same_id),
            Err(StorageError::AlreadyExists(_))
        ));

        let same_address = sample_record("z", "0x00000000000000000000000000000000000000AA");
        assert!(matches!(
            registry.add(&same_address),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn remove_unknown_account_is_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.remove("missing"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn update_replaces_record() {
        let registry = registry();
        let mut record = sample_record("a", "0x00000000000000000000000000000000000000aa");
        registry.add(&record).unwrap();

        let original = record.vault.clone();
        record.name = "Renamed".to_string();
        record.vault.ciphertext = "bmV3".to_string();
        registry.update(&record, &original).unwrap();

        let stored = registry.find_by_id("a").unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.vault.ciphertext, "bmV3");
    }

    #[test]
    fn update_from_a_stale_read_is_a_conflict() {
        let registry = registry();
        let record = sample_record("a", "0x00000000000000000000000000000000000000aa");
        registry.add(&record).unwrap();

        let mut first = record.clone();
        first.vault.ciphertext = "Zmlyc3Q=".to_string();
        registry.update(&first, &record.vault).unwrap();

        let mut second = record.clone();
        second.vault.ciphertext = "c2Vjb25k".to_string();
        assert!(matches!(
            registry.update(&second, &record.vault),
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(
            registry.find_by_id("a").unwrap().unwrap().vault.ciphertext,
            "Zmlyc3Q="
        );
        registry.update(&second, &first.vault).unwrap();
    }

    #[test]
    fn hostile_ids_resolve_to_none() {
        let registry = registry();
        assert!(registry.find_by_id("../../etc").unwrap().is_none());
    }

    #[test]
    fn summaries_never_carry_ciphertext() {
        let registry = registry();
        registry
            .add(&sample_record("a", "0x00000000000000000000000000000000000000aa"))
            .unwrap();

        let json = serde_json::to_string(&registry.list().unwrap()).unwrap();
        assert!(!json.contains("ciphertext"));
        assert!(!json.contains("Y2lwaGVy"));
    }

    #[test]
    fn records_persist_in_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(StoragePaths::new(dir.path())).unwrap());
        let registry = AccountRegistry::new(store.clone());
        registry
            .add(&sample_record("a", "0x00000000000000000000000000000000000000aa"))
            .unwrap();

        let reopened = AccountRegistry::new(store);
        assert_eq!(reopened.list().unwrap().len(), 1);
    }
}
