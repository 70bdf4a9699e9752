// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BIP-39 mnemonic generation and validation.
//!
//! New wallets get 128 bits of entropy (12 words). Imports accept any
//! standard English length (12-24 words) as long as the checksum validates.

use ring::rand::SecureRandom;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, Zeroizing};

use super::VaultError;

/// Entropy size for generated mnemonics (128 bits).
pub const ENTROPY_BYTES: usize = 16;

/// A checksum-validated BIP-39 phrase, normalised to single-space separated
/// lowercase words. Zeroized on drop.
pub struct MnemonicPhrase(Zeroizing<String>);

impl MnemonicPhrase {
    /// Generate a fresh 12-word phrase from the system CSPRNG.
    pub fn generate(rng: &dyn SecureRandom) -> Result<Self, VaultError> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        rng.fill(&mut entropy)
            .map_err(|_| VaultError::Encryption("system randomness unavailable".to_string()))?;

        let result = bip39::Mnemonic::from_entropy(&entropy)
            .map(|m| Self(Zeroizing::new(m.to_string())))
            .map_err(|e| VaultError::Derivation(format!("mnemonic encoding failed: {e}")));

        entropy.zeroize();
        result
    }

    /// Parse and checksum-validate a user supplied phrase.
    ///
    /// Input is NFKD-normalised, lowercased and whitespace-collapsed first;
    /// nothing is ever truncated or auto-corrected.
    pub fn parse(phrase: &str) -> Result<Self, VaultError> {
        let normalized: Zeroizing<String> = Zeroizing::new(
            phrase
                .nfkd()
                .collect::<String>()
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        );

        bip39::Mnemonic::parse_in_normalized(bip39::Language::English, &normalized)
            .map_err(|_| VaultError::InvalidMnemonic)?;

        Ok(Self(normalized))
    }

    /// BIP-39 seed with an empty passphrase.
    pub fn to_seed(&self) -> Result<Zeroizing<[u8; 64]>, VaultError> {
        let mnemonic = bip39::Mnemonic::parse_in_normalized(bip39::Language::English, &self.0)
            .map_err(|_| VaultError::InvalidMnemonic)?;
        Ok(Zeroizing::new(mnemonic.to_seed_normalized("")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }
}

impl std::fmt::Debug for MnemonicPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MnemonicPhrase({} words, redacted)", self.word_count())
    }
}
