// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local transaction signing.
//!
//! The signer is consumed here: the decrypted key lives exactly as long as
//! this call and is wiped when the wallet is dropped, on success or error.

use alloy::{
    eips::eip2718::Encodable2718,
    network::TransactionBuilder,
    primitives::TxHash,
    rpc::types::TransactionRequest,
};

use super::client::ChainError;
use crate::vault::EphemeralSigner;

/// A signed, EIP-2718 encoded transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub raw: Vec<u8>,
}

/// Sign a fully populated request (nonce, chain id, gas, fees).
pub async fn sign_transaction(
    tx: TransactionRequest,
    signer: EphemeralSigner,
) -> Result<SignedTransaction, ChainError> {
    let account_id = signer.account_id().to_string();
    let wallet = signer.into_wallet();

    let envelope = tx.build(&wallet).await.map_err(|e| {
        tracing::warn!(account_id = %account_id, error = %e, "Transaction signing failed");
        ChainError::Signing(e.to_string())
    })?;
    drop(wallet);

    Ok(SignedTransaction {
        hash: *envelope.tx_hash(),
        raw: envelope.encoded_2718(),
    })
}

#[cfg(test)]
mod tests {
    use alloy::{
        consensus::{Transaction, TxEnvelope},
        eips::eip2718::Decodable2718,
        primitives::{keccak256, Address, U256},
    };
    use zeroize::Zeroizing;

    use super::*;
    use crate::blockchain::transactions::{apply_quote, to_transaction_request};
    use crate::blockchain::types::{FeeModel, GasQuote, TxRequest};
    use crate::vault::signer::parse_private_key;

    const ANVIL_KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn signer() -> EphemeralSigner {
        let key: Zeroizing<[u8; 32]> = parse_private_key(ANVIL_KEY_0).unwrap();
        EphemeralSigner::from_key_bytes("acct", &key).unwrap()
    }

    fn request(fee: FeeModel, chain_id: u64) -> TransactionRequest {
        let signer = signer();
        let to = Address::repeat_byte(0x22);
        apply_quote(
            to_transaction_request(&TxRequest::native(to, U256::from(1000u64)), signer.address()),
            &GasQuote::new(fee, 21_000),
            3,
            chain_id,
        )
    }

    #[tokio::test]
    async fn signs_eip1559_with_chain_id() {
        let tx = request(
            FeeModel::Eip1559 {
                max_fee_per_gas: 30_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
            },
            11_155_111,
        );
        let signed = sign_transaction(tx, signer()).await.unwrap();

        assert_eq!(signed.hash, keccak256(&signed.raw));
        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_slice()).unwrap();
        assert!(decoded.is_eip1559());
        assert_eq!(decoded.chain_id(), Some(11_155_111));
        assert_eq!(decoded.nonce(), 3);
    }

    #[tokio::test]
    async fn signs_legacy_with_chain_id() {
        let tx = request(FeeModel::Legacy { gas_price: 5_000_000_000 }, 56);
        let signed = sign_transaction(tx, signer()).await.unwrap();

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_slice()).unwrap();
        assert!(decoded.is_legacy());
        // EIP-155 replay protection
        assert_eq!(decoded.chain_id(), Some(56));
    }

    #[tokio::test]
    async fn incomplete_request_is_a_signing_error() {
        let tx = TransactionRequest::default().to(Address::repeat_byte(0x22));
        assert!(matches!(
            sign_transaction(tx, signer()).await,
            Err(ChainError::Signing(_))
        ));
    }
}
