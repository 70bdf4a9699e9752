// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-endpoint JSON-RPC access.
//!
//! [`ChainRpc`] is the narrow set of calls the wallet makes against one
//! endpoint. Failover, retries and network bookkeeping live above it in
//! [`super::failover`].

use std::sync::Arc;

use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, Bytes, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    transports::TransportError,
};
use async_trait::async_trait;

use super::client::ChainError;
use super::types::ReceiptSummary;

/// Why a single RPC call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcFailure {
    /// Endpoint unreachable, timed out, rate limited or returned garbage.
    /// Worth retrying elsewhere.
    #[error("transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error (revert, bad nonce,
    /// insufficient funds). Retrying elsewhere gives the same answer.
    #[error("{0}")]
    Rejected(String),
}

/// JSON-RPC error codes that signal endpoint trouble rather than a verdict
/// on the request.
const RETRYABLE_CODES: &[i64] = &[
    -32005, // limit exceeded
    -32603, // internal error
    429,
];

impl From<TransportError> for RpcFailure {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(resp) if !RETRYABLE_CODES.contains(&resp.code) => {
                RpcFailure::Rejected(resp.message.to_string())
            }
            _ => RpcFailure::Transport(err.to_string()),
        }
    }
}

/// Calls the wallet needs from one endpoint.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Endpoint URL, for logging.
    fn url(&self) -> &str;

    async fn chain_id(&self) -> Result<u64, RpcFailure>;

    async fn balance(&self, address: Address) -> Result<U256, RpcFailure>;

    /// Base fee of the latest block; `None` on chains without a fee market.
    async fn base_fee(&self) -> Result<Option<u128>, RpcFailure>;

    async fn gas_price(&self) -> Result<u128, RpcFailure>;

    async fn max_priority_fee(&self) -> Result<u128, RpcFailure>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, RpcFailure>;

    /// Next nonce including pending transactions.
    async fn nonce(&self, address: Address) -> Result<u64, RpcFailure>;

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, RpcFailure>;

    async fn send_raw(&self, raw: &[u8]) -> Result<TxHash, RpcFailure>;

    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptSummary>, RpcFailure>;
}

/// Builds endpoint clients from URLs.
pub trait RpcConnector: Send + Sync {
    fn connect(&self, url: &str) -> Result<Arc<dyn ChainRpc>, ChainError>;
}

/// HTTP JSON-RPC endpoint backed by an alloy provider.
pub struct HttpRpc {
    url: String,
    provider: DynProvider,
}

impl HttpRpc {
    pub fn new(url: &str) -> Result<Self, ChainError> {
        let parsed: url::Url = url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ChainError::InvalidRpcUrl(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let provider = ProviderBuilder::new().connect_http(parsed).erased();

        Ok(Self {
            url: url.to_string(),
            provider,
        })
    }
}

#[async_trait]
impl ChainRpc for HttpRpc {
    fn url(&self) -> &str {
        &self.url
    }

    async fn chain_id(&self) -> Result<u64, RpcFailure> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcFailure> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn base_fee(&self) -> Result<Option<u128>, RpcFailure> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| RpcFailure::Transport("No latest block".to_string()))?;

        Ok(block.header.base_fee_per_gas.map(u128::from))
    }

    async fn gas_price(&self) -> Result<u128, RpcFailure> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn max_priority_fee(&self) -> Result<u128, RpcFailure> {
        Ok(self.provider.get_max_priority_fee_per_gas().await?)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, RpcFailure> {
        Ok(self.provider.estimate_gas(tx.clone()).await?)
    }

    async fn nonce(&self, address: Address) -> Result<u64, RpcFailure> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, RpcFailure> {
        Ok(self.provider.call(tx.clone()).await?)
    }

    async fn send_raw(&self, raw: &[u8]) -> Result<TxHash, RpcFailure> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<ReceiptSummary>, RpcFailure> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| ReceiptSummary {
            block_number: r.block_number,
            gas_used: r.gas_used,
            success: r.status(),
        }))
    }
}

/// Connector producing [`HttpRpc`] endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl RpcConnector for HttpConnector {
    fn connect(&self, url: &str) -> Result<Arc<dyn ChainRpc>, ChainError> {
        Ok(Arc::new(HttpRpc::new(url)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_connector_validates_urls() {
        assert!(HttpConnector.connect("https://rpc.example.org").is_ok());
        assert!(matches!(
            HttpConnector.connect("not a url"),
            Err(ChainError::InvalidRpcUrl(_))
        ));
        assert!(matches!(
            HttpConnector.connect("ftp://rpc.example.org"),
            Err(ChainError::InvalidRpcUrl(_))
        ));
    }

    #[test]
    fn error_responses_are_classified() {
        use alloy::rpc::json_rpc::ErrorPayload;

        let reverted: TransportError = TransportError::ErrorResp(ErrorPayload {
            code: 3,
            message: "execution reverted".into(),
            data: None,
        });
        assert_eq!(
            RpcFailure::from(reverted),
            RpcFailure::Rejected("execution reverted".to_string())
        );

        let limited: TransportError = TransportError::ErrorResp(ErrorPayload {
            code: -32005,
            message: "limit exceeded".into(),
            data: None,
        });
        assert!(matches!(RpcFailure::from(limited), RpcFailure::Transport(_)));
    }
}
