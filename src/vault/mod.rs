// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Vault
//!
//! Generation, import, HD derivation and password-encrypted storage of
//! wallet secrets.
//!
//! ## Flow
//!
//! ```text
//! generate / import ─► VaultSecret ─► cipher::seal ─► AccountRegistry
//!                                                          │
//! get_private_key_for_signing ◄─ cipher::open ◄────────────┘
//!          │
//!          └─► EphemeralSigner (consumed by one signing call)
//! ```
//!
//! ## Security Invariants
//!
//! - Phrases, BIP-39 seeds and decrypted payloads live in `Zeroizing`
//!   buffers or [`VaultSecret`], both wiped on drop, including on error
//!   paths. Transient parser and BIP-32 state inside `bip39` and
//!   `coins-bip32` types is dropped without being wiped
//! - Wrong password and corrupted ciphertext produce the same
//!   [`VaultError::DecryptionFailed`]
//! - Legacy vault entries are re-encrypted at [`VaultFormat::CURRENT`] on
//!   the first successful decryption
//!
//! PBKDF2 is deliberately slow; async callers run vault operations on the
//! blocking pool.

use std::sync::Arc;

use chrono::Utc;
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::storage::{AccountKind, AccountRecord, AccountRegistry, AccountSummary, StorageError};

pub mod cipher;
pub mod derivation;
pub mod mnemonic;
pub mod session;
pub mod signer;

pub use cipher::{EncryptedVaultEntry, VaultFormat};
pub use derivation::{DerivationInfo, DerivationScheme, DerivedAccount};
pub use mnemonic::MnemonicPhrase;
pub use session::{SessionManager, SessionToken};
pub use signer::EphemeralSigner;

/// Minimum accepted password length (characters).
pub const MIN_PASSWORD_LEN: usize = 8;

/// Errors raised by the key vault.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Invalid mnemonic phrase")]
    InvalidMnemonic,

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid derivation index: {0}")]
    InvalidDerivationIndex(u32),

    /// Wrong password or corrupted entry. Never more specific than this.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    /// Entry was re-encrypted by another call between read and write
    #[error("Account was modified concurrently: {0}")]
    ConcurrentUpdate(String),

    #[error("Unsupported vault format version: {0}")]
    UnsupportedFormat(u32),

    #[error("Operation not supported for this account: {0}")]
    UnsupportedAccountKind(String),

    #[error("Derivation error: {0}")]
    Derivation(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Plaintext carried inside a vault entry.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultSecret {
    Mnemonic { phrase: String },
    PrivateKey { key_hex: String },
}

impl std::fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mnemonic { .. } => f.write_str("VaultSecret::Mnemonic(redacted)"),
            Self::PrivateKey { .. } => f.write_str("VaultSecret::PrivateKey(redacted)"),
        }
    }
}

/// Result of wallet generation. The phrase must be shown to the user once
/// and then dropped.
#[derive(Debug)]
pub struct GeneratedWallet {
    pub mnemonic: MnemonicPhrase,
    pub account: AccountSummary,
}

fn validate_password(password: &str) -> Result<(), VaultError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(VaultError::InvalidPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Owns secret handling for every account in an [`AccountRegistry`].
pub struct KeyVault {
    registry: Arc<AccountRegistry>,
    format: VaultFormat,
    rng: SystemRandom,
}

impl KeyVault {
    pub fn new(registry: Arc<AccountRegistry>) -> Self {
        Self::with_format(registry, VaultFormat::CURRENT)
    }

    /// Vault that writes entries at `format` instead of the current one.
    pub fn with_format(registry: Arc<AccountRegistry>, format: VaultFormat) -> Self {
        Self {
            registry,
            format,
            rng: SystemRandom::new(),
        }
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    // =========================================================================
    // Creation and import
    // =========================================================================

    /// Create a wallet from 128 bits of fresh entropy and store account 0.
    pub fn generate(&self, name: &str, password: &str) -> Result<GeneratedWallet, VaultError> {
        validate_password(password)?;
        let mnemonic = MnemonicPhrase::generate(&self.rng)?;
        let account = self.store_mnemonic_account(
            name,
            &mnemonic,
            DerivationScheme::default(),
            0,
            password,
        )?;

        tracing::info!(account_id = %account.id, address = %account.address, "Generated wallet");
        Ok(GeneratedWallet { mnemonic, account })
    }

    /// Import an existing phrase; the account at index 0 of `scheme` is stored.
    pub fn import_from_mnemonic(
        &self,
        phrase: &str,
        name: &str,
        password: &str,
        scheme: DerivationScheme,
    ) -> Result<AccountSummary, VaultError> {
        let mnemonic = MnemonicPhrase::parse(phrase)?;
        validate_password(password)?;
        let account = self.store_mnemonic_account(name, &mnemonic, scheme, 0, password)?;

        tracing::info!(account_id = %account.id, address = %account.address, "Imported mnemonic wallet");
        Ok(account)
    }

    /// Import a raw secp256k1 key given as 64 hex characters.
    pub fn import_from_private_key(
        &self,
        key_hex: &str,
        name: &str,
        password: &str,
    ) -> Result<AccountSummary, VaultError> {
        let key = signer::parse_private_key(key_hex)?;
        validate_password(password)?;

        let signer = EphemeralSigner::from_key_bytes("import", &key)?;
        let address = signer.address().to_checksum(None);
        let secret = VaultSecret::PrivateKey {
            key_hex: alloy::hex::encode(key.as_ref()),
        };

        let account =
            self.store_account(name, address, AccountKind::PrivateKey, None, &secret, password)?;

        tracing::info!(account_id = %account.id, address = %account.address, "Imported private key wallet");
        Ok(account)
    }

    /// Pure derivation under the default scheme. Nothing is stored.
    pub fn derive_account(
        &self,
        mnemonic: &MnemonicPhrase,
        index: u32,
    ) -> Result<DerivedAccount, VaultError> {
        derivation::derive_account(mnemonic, DerivationScheme::default(), index)
    }

    /// Store the next unused address of a seed-backed account's phrase.
    ///
    /// The new account gets its own vault entry (fresh salt and IV) over the
    /// same phrase, encrypted with the same password.
    pub fn derive_next_account(
        &self,
        source_account_id: &str,
        password: &str,
        name: &str,
    ) -> Result<AccountSummary, VaultError> {
        let source = self.record(source_account_id)?;
        let (AccountKind::Mnemonic, Some(source_info)) = (source.kind, source.derivation.as_ref())
        else {
            return Err(VaultError::UnsupportedAccountKind(
                "only mnemonic accounts can derive further addresses".to_string(),
            ));
        };

        let secret = self.unseal(&source, password)?;
        let VaultSecret::Mnemonic { phrase } = &secret else {
            return Err(VaultError::Derivation(
                "mnemonic account holds a private key".to_string(),
            ));
        };
        let mnemonic = MnemonicPhrase::parse(phrase)?;

        let mut index = source_info.index;
        let derived = loop {
            index = index
                .checked_add(1)
                .filter(|i| *i <= derivation::MAX_DERIVATION_INDEX)
                .ok_or(VaultError::InvalidDerivationIndex(index))?;
            let candidate = derivation::derive_account(&mnemonic, source_info.scheme, index)?;
            if self.registry.find_by_address(&candidate.address)?.is_none() {
                break candidate;
            }
        };

        self.store_mnemonic_account(
            name,
            &mnemonic,
            derived.scheme,
            derived.derivation_index,
            password,
        )
    }

    // =========================================================================
    // Encryption
    // =========================================================================

    /// Encrypt `payload` for `account_id` with a fresh salt and IV.
    pub fn encrypt(
        &self,
        account_id: &str,
        payload: &[u8],
        password: &str,
    ) -> Result<EncryptedVaultEntry, VaultError> {
        cipher::seal(self.format, &self.rng, account_id, payload, password, None)
    }

    pub fn decrypt(
        &self,
        entry: &EncryptedVaultEntry,
        password: &str,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        cipher::open(entry, password)
    }

    /// True when `entry` predates the format this vault writes.
    pub fn needs_upgrade(&self, entry: &EncryptedVaultEntry) -> bool {
        entry
            .format()
            .is_some_and(|f| f.version() < self.format.version())
    }

    // =========================================================================
    // Unlock and signing
    // =========================================================================

    /// Decrypt the account's secret and hand back a one-shot signer.
    ///
    /// # Returns
    /// - `Err(VaultError::AccountNotFound)` for an unknown id
    /// - `Err(VaultError::DecryptionFailed)` for a wrong password or a
    ///   corrupted entry
    pub fn get_private_key_for_signing(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<EphemeralSigner, VaultError> {
        let record = self.record(account_id)?;
        let secret = self.unseal(&record, password)?;

        let signer = match &secret {
            VaultSecret::Mnemonic { phrase } => {
                let info = record.derivation.as_ref().ok_or_else(|| {
                    VaultError::Derivation("mnemonic account has no derivation info".to_string())
                })?;
                let mnemonic = MnemonicPhrase::parse(phrase)?;
                EphemeralSigner::new(&record.id, derivation::derive_signer(&mnemonic, info)?)
            }
            VaultSecret::PrivateKey { key_hex } => {
                let key = signer::parse_private_key(key_hex)?;
                EphemeralSigner::from_key_bytes(&record.id, &key)?
            }
        };

        if !signer
            .address()
            .to_checksum(None)
            .eq_ignore_ascii_case(&record.address)
        {
            return Err(VaultError::Derivation(format!(
                "decrypted key does not control {}",
                record.address
            )));
        }

        Ok(signer)
    }

    /// Check `password` against the account without producing a signer.
    pub fn verify_password(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<AccountSummary, VaultError> {
        let record = self.record(account_id)?;
        self.unseal(&record, password)?;
        Ok(AccountSummary::from(&record))
    }

    /// Re-encrypt an account's secret under a new password.
    pub fn change_password(
        &self,
        account_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), VaultError> {
        validate_password(new_password)?;
        let mut record = self.record(account_id)?;
        let previous = record.vault.clone();
        let plaintext = cipher::open(&previous, old_password)?;

        record.vault = cipher::seal(
            self.format,
            &self.rng,
            &record.id,
            &plaintext,
            new_password,
            Some(previous.created_at),
        )?;
        match self.registry.update(&record, &previous) {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => {
                return Err(VaultError::ConcurrentUpdate(record.id));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(account_id = %record.id, "Vault password changed");
        Ok(())
    }

    // =========================================================================
    // Registry passthrough
    // =========================================================================

    pub fn list_accounts(&self) -> Result<Vec<AccountSummary>, VaultError> {
        Ok(self.registry.list()?)
    }

    pub fn find_account(&self, account_id: &str) -> Result<AccountSummary, VaultError> {
        self.record(account_id).map(|r| AccountSummary::from(&r))
    }

    /// Delete the account and its encrypted entry. `password` must open the
    /// entry first.
    pub fn remove_account(
        &self,
        account_id: &str,
        password: &str,
    ) -> Result<AccountSummary, VaultError> {
        let record = self.record(account_id)?;
        cipher::open(&record.vault, password)?;

        match self.registry.remove(account_id) {
            Ok(record) => {
                tracing::info!(account_id = %record.id, "Account removed");
                Ok(AccountSummary::from(&record))
            }
            Err(StorageError::NotFound(_)) => {
                Err(VaultError::AccountNotFound(account_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn record(&self, account_id: &str) -> Result<AccountRecord, VaultError> {
        self.registry
            .find_by_id(account_id)?
            .ok_or_else(|| VaultError::AccountNotFound(account_id.to_string()))
    }

    /// Decrypt a record's secret, upgrading a legacy entry in place.
    fn unseal(&self, record: &AccountRecord, password: &str) -> Result<VaultSecret, VaultError> {
        let plaintext = cipher::open(&record.vault, password)?;
        let secret: VaultSecret = serde_json::from_slice(&plaintext)
            .map_err(|_| VaultError::Derivation("malformed vault payload".to_string()))?;

        if self.needs_upgrade(&record.vault) {
            self.upgrade(record, &plaintext, password);
        }
        Ok(secret)
    }

    fn upgrade(&self, record: &AccountRecord, plaintext: &[u8], password: &str) {
        let from = record.vault.version;
        let result = cipher::seal(
            self.format,
            &self.rng,
            &record.id,
            plaintext,
            password,
            Some(record.vault.created_at),
        )
        .and_then(|vault| {
            let mut upgraded = record.clone();
            upgraded.vault = vault;
            self.registry
                .update(&upgraded, &record.vault)
                .map_err(VaultError::from)
        });

        match result {
            Ok(()) => tracing::info!(
                account_id = %record.id,
                from,
                to = self.format.version(),
                "Upgraded vault entry"
            ),
            // Re-encrypted meanwhile (password change); the newer entry wins
            Err(VaultError::Storage(StorageError::Conflict(_))) => tracing::debug!(
                account_id = %record.id,
                "Vault entry changed before upgrade, skipped"
            ),
            // The old entry is still intact; try again on the next unlock
            Err(e) => tracing::warn!(account_id = %record.id, error = %e, "Vault upgrade failed"),
        }
    }

    fn store_mnemonic_account(
        &self,
        name: &str,
        mnemonic: &MnemonicPhrase,
        scheme: DerivationScheme,
        index: u32,
        password: &str,
    ) -> Result<AccountSummary, VaultError> {
        let derived = derivation::derive_account(mnemonic, scheme, index)?;
        let secret = VaultSecret::Mnemonic {
            phrase: mnemonic.as_str().to_string(),
        };
        self.store_account(
            name,
            derived.address.clone(),
            AccountKind::Mnemonic,
            Some(derived.info()),
            &secret,
            password,
        )
    }

    fn store_account(
        &self,
        name: &str,
        address: String,
        kind: AccountKind,
        derivation: Option<DerivationInfo>,
        secret: &VaultSecret,
        password: &str,
    ) -> Result<AccountSummary, VaultError> {
        if self.registry.find_by_address(&address)?.is_some() {
            return Err(VaultError::DuplicateAccount(address));
        }

        let id = Uuid::new_v4().to_string();
        let plaintext = Zeroizing::new(
            serde_json::to_vec(secret)
                .map_err(|e| VaultError::Encryption(format!("payload encoding failed: {e}")))?,
        );
        let vault = cipher::seal(self.format, &self.rng, &id, &plaintext, password, None)?;

        let name = name.trim();
        let record = AccountRecord {
            name: if name.is_empty() {
                format!("Account {}", &address[..8])
            } else {
                name.to_string()
            },
            id,
            address,
            kind,
            derivation,
            vault,
            created_at: Utc::now(),
        };

        match self.registry.add(&record) {
            Ok(()) => Ok(AccountSummary::from(&record)),
            Err(StorageError::AlreadyExists(_)) => Err(VaultError::DuplicateAccount(record.address)),
            Err(e) => Err(e.into()),
        }
    }
}
