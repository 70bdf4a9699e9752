// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use signing capability handed out by the vault.

use alloy::{network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner};
use zeroize::Zeroizing;

use super::VaultError;

/// A decrypted signing key that can be used for exactly one signing
/// operation.
///
/// The key is consumed by [`EphemeralSigner::into_wallet`]; once the wallet
/// (or this value, on any early return) is dropped the underlying k256
/// `SigningKey` zeroizes its scalar.
pub struct EphemeralSigner {
    account_id: String,
    signer: PrivateKeySigner,
}

impl EphemeralSigner {
    pub(crate) fn new(account_id: impl Into<String>, signer: PrivateKeySigner) -> Self {
        Self {
            account_id: account_id.into(),
            signer,
        }
    }

    /// Build from a raw 32-byte secp256k1 scalar.
    pub(crate) fn from_key_bytes(
        account_id: impl Into<String>,
        key: &Zeroizing<[u8; 32]>,
    ) -> Result<Self, VaultError> {
        let secret = k256::SecretKey::from_slice(key.as_ref())
            .map_err(|_| VaultError::InvalidPrivateKey("scalar out of range".to_string()))?;
        Ok(Self::new(
            account_id,
            PrivateKeySigner::from_signing_key(secret.into()),
        ))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Consume the capability, yielding a wallet for one transaction build.
    pub fn into_wallet(self) -> EthereumWallet {
        EthereumWallet::from(self.signer)
    }
}

impl std::fmt::Debug for EphemeralSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralSigner")
            .field("account_id", &self.account_id)
            .field("address", &self.signer.address())
            .finish_non_exhaustive()
    }
}

/// Parse a hex private key (with or without `0x`) into a validated scalar.
///
/// Rejects anything that is not exactly 32 bytes of hex or not a valid
/// non-zero secp256k1 scalar. Never truncates or pads.
pub fn parse_private_key(input: &str) -> Result<Zeroizing<[u8; 32]>, VaultError> {
    let trimmed = input.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.len() != 64 {
        return Err(VaultError::InvalidPrivateKey(
            "expected 64 hex characters".to_string(),
        ));
    }

    let mut key = Zeroizing::new([0u8; 32]);
    alloy::hex::decode_to_slice(hex_part, key.as_mut())
        .map_err(|_| VaultError::InvalidPrivateKey("not valid hex".to_string()))?;

    k256::SecretKey::from_slice(key.as_ref())
        .map_err(|_| VaultError::InvalidPrivateKey("scalar out of range".to_string()))?;

    Ok(key)
}
