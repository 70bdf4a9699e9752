// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deterministic HD derivation (BIP-32/BIP-44, coin type 60).
//!
//! Two schemes exist for deriving several accounts from one phrase:
//!
//! | Scheme | Path | Compatible with |
//! |--------|------|-----------------|
//! | `AddressIndex` (default) | `m/44'/60'/0'/0/{i}` | MetaMask, most EVM wallets |
//! | `AccountIndex` | `m/44'/60'/{i}'/0/0` | Ledger Live |
//!
//! The scheme is stored with every account so re-derivation never depends
//! on a global default.

use alloy::signers::local::PrivateKeySigner;
use coins_bip32::xkeys::{Parent, XPriv};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::mnemonic::MnemonicPhrase;
use super::VaultError;

/// SLIP-44 coin type for Ether.
pub const ETH_COIN_TYPE: u32 = 60;

/// Highest index usable at a hardened level.
pub const MAX_DERIVATION_INDEX: u32 = (1 << 31) - 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DerivationScheme {
    /// Increment the address index: `m/44'/60'/0'/0/{i}`
    #[default]
    AddressIndex,
    /// Increment the account level: `m/44'/60'/{i}'/0/0`
    AccountIndex,
}

impl DerivationScheme {
    pub fn path(self, index: u32) -> String {
        match self {
            Self::AddressIndex => format!("m/44'/{ETH_COIN_TYPE}'/0'/0/{index}"),
            Self::AccountIndex => format!("m/44'/{ETH_COIN_TYPE}'/{index}'/0/0"),
        }
    }
}

/// Derivation parameters persisted with a mnemonic-backed account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationInfo {
    pub scheme: DerivationScheme,
    pub index: u32,
    pub path: String,
}

impl DerivationInfo {
    pub fn new(scheme: DerivationScheme, index: u32) -> Self {
        Self {
            scheme,
            index,
            path: scheme.path(index),
        }
    }
}

/// An address derived from a phrase. Always recomputable from
/// `(phrase, derivation_path)`; never a source of truth on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DerivedAccount {
    pub derivation_index: u32,
    pub address: String,
    pub derivation_path: String,
    pub scheme: DerivationScheme,
}

impl DerivedAccount {
    pub fn info(&self) -> DerivationInfo {
        DerivationInfo::new(self.scheme, self.derivation_index)
    }
}

/// Build the signing key for `info` from `mnemonic`.
pub fn derive_signer(
    mnemonic: &MnemonicPhrase,
    info: &DerivationInfo,
) -> Result<PrivateKeySigner, VaultError> {
    if info.index > MAX_DERIVATION_INDEX {
        return Err(VaultError::InvalidDerivationIndex(info.index));
    }
    // Recompute rather than trusting the stored path string
    let path = info.scheme.path(info.index);

    let seed = mnemonic.to_seed()?;
    let root = XPriv::root_from_seed(seed.as_ref(), None)
        .map_err(|e| VaultError::Derivation(e.to_string()))?;
    let child = root
        .derive_path(path.as_str())
        .map_err(|e| VaultError::Derivation(format!("invalid path {path}: {e}")))?;

    let key: &SigningKey = child.as_ref();
    Ok(PrivateKeySigner::from_signing_key(key.clone()))
}

/// Derive the public account at `index` under `scheme`.
pub fn derive_account(
    mnemonic: &MnemonicPhrase,
    scheme: DerivationScheme,
    index: u32,
) -> Result<DerivedAccount, VaultError> {
    let info = DerivationInfo::new(scheme, index);
    let signer = derive_signer(mnemonic, &info)?;

    Ok(DerivedAccount {
        derivation_index: index,
        address: signer.address().to_checksum(None),
        derivation_path: info.path,
        scheme,
    })
}
