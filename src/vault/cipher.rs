// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password-based authenticated encryption of vault payloads.
//!
//! ## Record Format
//!
//! ```json
//! {
//!   "version": 2,
//!   "salt": "<base64, 16 bytes>",
//!   "iv": "<base64, 12 bytes>",
//!   "ciphertext": "<base64, payload || 16-byte GCM tag>",
//!   "account_id": "...",
//!   "created_at": "...",
//!   "updated_at": "..."
//! }
//! ```
//!
//! ## Versions
//!
//! | Version | KDF | Iterations | Cipher | Associated data |
//! |---------|-----|------------|--------|-----------------|
//! | 1 | PBKDF2-HMAC-SHA256 | 100 000 | AES-256-GCM | none |
//! | 2 | PBKDF2-HMAC-SHA256 | 600 000 | AES-256-GCM | account id |
//!
//! Every encryption draws a fresh salt and IV. Every decryption failure,
//! whatever the cause, is reported as [`VaultError::DecryptionFailed`] after
//! the same amount of KDF work.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use ring::{
    aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM},
    pbkdf2,
    rand::SecureRandom,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::VaultError;

pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = aead::NONCE_LEN;
pub const KEY_LEN: usize = 32;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Known vault record versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultFormat {
    V1,
    V2,
}

impl VaultFormat {
    /// Format used for every new or re-encrypted entry.
    pub const CURRENT: Self = Self::V2;

    pub fn from_version(version: u32) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }

    pub fn version(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    pub fn kdf_iterations(self) -> NonZeroU32 {
        let iterations = match self {
            Self::V1 => 100_000,
            Self::V2 => 600_000,
        };
        NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN)
    }

    fn associated_data(self, account_id: &str) -> Vec<u8> {
        match self {
            Self::V1 => Vec::new(),
            Self::V2 => format!("relational-vault:v2:{account_id}").into_bytes(),
        }
    }
}

/// Persisted, self-describing encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedVaultEntry {
    pub version: u32,
    pub salt: String,
    pub iv: String,
    pub ciphertext: String,
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EncryptedVaultEntry {
    pub fn format(&self) -> Option<VaultFormat> {
        VaultFormat::from_version(self.version)
    }
}

fn derive_key(format: VaultFormat, password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        PBKDF2_ALG,
        format.kdf_iterations(),
        salt,
        password.as_bytes(),
        key.as_mut(),
    );
    key
}

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, ring::error::Unspecified> {
    UnboundKey::new(&AES_256_GCM, key).map(LessSafeKey::new)
}

/// Encrypt `plaintext` for `account_id` under `password`.
///
/// `created_at` is preserved when re-encrypting an existing entry.
pub fn seal(
    format: VaultFormat,
    rng: &dyn SecureRandom,
    account_id: &str,
    plaintext: &[u8],
    password: &str,
    created_at: Option<DateTime<Utc>>,
) -> Result<EncryptedVaultEntry, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut salt)
        .and_then(|_| rng.fill(&mut iv))
        .map_err(|_| VaultError::Encryption("system randomness unavailable".to_string()))?;

    let key = derive_key(format, password, &salt);
    let sealing = aead_key(&key)
        .map_err(|_| VaultError::Encryption("invalid AES-256-GCM key".to_string()))?;

    let mut in_out = plaintext.to_vec();
    let sealed = sealing.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(iv),
        Aad::from(format.associated_data(account_id)),
        &mut in_out,
    );
    if sealed.is_err() {
        zeroize::Zeroize::zeroize(&mut in_out);
        return Err(VaultError::Encryption("AES-256-GCM seal failed".to_string()));
    }

    let now = Utc::now();
    Ok(EncryptedVaultEntry {
        version: format.version(),
        salt: Base64::encode_string(&salt),
        iv: Base64::encode_string(&iv),
        ciphertext: Base64::encode_string(&in_out),
        account_id: account_id.to_string(),
        created_at: created_at.unwrap_or(now),
        updated_at: now,
    })
}

/// Decrypt an entry. Any malformed field, wrong password or tag mismatch
/// yields `DecryptionFailed`.
pub fn open(entry: &EncryptedVaultEntry, password: &str) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    let format = entry
        .format()
        .ok_or(VaultError::UnsupportedFormat(entry.version))?;

    let salt = Base64::decode_vec(&entry.salt)
        .ok()
        .filter(|s| s.len() == SALT_LEN);
    let iv = Base64::decode_vec(&entry.iv)
        .ok()
        .and_then(|v| <[u8; IV_LEN]>::try_from(v.as_slice()).ok());
    let ciphertext = Base64::decode_vec(&entry.ciphertext).ok();

    // Pay the KDF cost even for malformed input so failures look alike
    let key = derive_key(
        format,
        password,
        salt.as_deref().unwrap_or(&[0u8; SALT_LEN]),
    );

    let (Some(_), Some(iv), Some(ciphertext)) = (salt, iv, ciphertext) else {
        return Err(VaultError::DecryptionFailed);
    };

    let opening = aead_key(&key).map_err(|_| VaultError::DecryptionFailed)?;
    let mut buffer = Zeroizing::new(ciphertext);
    let plaintext_len = opening
        .open_in_place(
            Nonce::assume_unique_for_key(iv),
            Aad::from(format.associated_data(&entry.account_id)),
            buffer.as_mut_slice(),
        )
        .map_err(|_| VaultError::DecryptionFailed)?
        .len();

    buffer.truncate(plaintext_len);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::rand::SystemRandom;

    const PASSWORD: &str = "correct horse battery";

    fn sealed(payload: &[u8]) -> EncryptedVaultEntry {
        seal(
            VaultFormat::CURRENT,
            &SystemRandom::new(),
            "acct-1",
            payload,
            PASSWORD,
            None,
        )
        .unwrap()
    }

    #[test]
    fn round_trip_with_correct_password() {
        let entry = sealed(b"secret payload");
        assert_eq!(entry.version, 2);

        let plaintext = open(&entry, PASSWORD).unwrap();
        assert_eq!(plaintext.as_slice(), b"secret payload");
    }

    #[test]
    fn salt_and_iv_have_expected_sizes() {
        let entry = sealed(b"x");
        assert_eq!(Base64::decode_vec(&entry.salt).unwrap().len(), SALT_LEN);
        assert_eq!(Base64::decode_vec(&entry.iv).unwrap().len(), IV_LEN);
        // payload + 16-byte tag
        assert_eq!(Base64::decode_vec(&entry.ciphertext).unwrap().len(), 1 + 16);
    }

    #[test]
    fn identical_inputs_never_produce_identical_records() {
        let a = sealed(b"same");
        let b = sealed(b"same");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_password_fails_uniformly() {
        let entry = sealed(b"secret payload");
        assert!(matches!(
            open(&entry, "wrong password"),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_with_same_error() {
        let mut entry = sealed(b"secret payload");
        let mut bytes = Base64::decode_vec(&entry.ciphertext).unwrap();
        bytes[0] ^= 0x01;
        entry.ciphertext = Base64::encode_string(&bytes);

        assert!(matches!(
            open(&entry, PASSWORD),
            Err(VaultError::DecryptionFailed)
        ));
    }

    #[test]
    fn malformed_fields_fail_with_same_error() {
        let mut bad_salt = sealed(b"p");
        bad_salt.salt = "not base64!".to_string();
        assert!(matches!(open(&bad_salt, PASSWORD), Err(VaultError::DecryptionFailed)));

        let mut short_iv = sealed(b"p");
        short_iv.iv = Base64::encode_string(&[0u8; 4]);
        assert!(matches!(open(&short_iv, PASSWORD), Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn v2_binds_account_id() {
        let mut entry = sealed(b"bound");
        entry.account_id = "acct-2".to_string();
        assert!(matches!(open(&entry, PASSWORD), Err(VaultError::DecryptionFailed)));
    }

    #[test]
    fn legacy_v1_round_trip() {
        let entry = seal(
            VaultFormat::V1,
            &SystemRandom::new(),
            "acct-1",
            b"legacy",
            PASSWORD,
            None,
        )
        .unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(open(&entry, PASSWORD).unwrap().as_slice(), b"legacy");
    }

    #[test]
    fn unknown_version_is_reported() {
        let mut entry = sealed(b"p");
        entry.version = 99;
        assert!(matches!(
            open(&entry, PASSWORD),
            Err(VaultError::UnsupportedFormat(99))
        ));
    }

    #[test]
    fn reseal_preserves_created_at() {
        let first = sealed(b"p");
        let resealed = seal(
            VaultFormat::CURRENT,
            &SystemRandom::new(),
            "acct-1",
            b"p",
            PASSWORD,
            Some(first.created_at),
        )
        .unwrap();
        assert_eq!(resealed.created_at, first.created_at);
        assert!(resealed.updated_at >= first.updated_at);
    }
}
