// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Multi-network EVM client.
//!
//! ## Concurrency
//!
//! The active network lives behind a `tokio::sync::RwLock`. A send holds the
//! read guard from nonce lookup through broadcast; [`ChainClient::switch_network`]
//! takes the write guard. A switch therefore waits for every in-flight
//! broadcast, and a transaction signed for one chain can never reach another
//! chain's endpoints. Confirmation polling runs after the guard is released,
//! against the pool the transaction was broadcast on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use chrono::Utc;
use tokio::sync::RwLock;

use super::erc20::TokenContractAdapter;
use super::failover::{EndpointHealth, EndpointPool, RetryPolicy};
use super::rpc::RpcConnector;
use super::signing::sign_transaction;
use super::transactions::{
    apply_quote, format_amount, is_already_known, is_revert, parse_address, parse_amount,
    to_transaction_request, token_transfer_request, DEFAULT_PRIORITY_FEE,
    FALLBACK_TOKEN_TRANSFER_GAS,
};
use super::types::*;
use crate::vault::EphemeralSigner;

/// Timing knobs of the client.
#[derive(Debug, Clone, Copy)]
pub struct ChainClientSettings {
    pub retry: RetryPolicy,
    /// Upper bound on receipt polling after broadcast
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ChainClientSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            confirmation_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Snapshot of the active network for status endpoints.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    pub network: NetworkConfig,
    pub endpoints: Vec<(String, EndpointHealth)>,
}

/// EVM client over a set of known networks, one of which is active.
pub struct ChainClient {
    networks: HashMap<u64, NetworkConfig>,
    connector: Arc<dyn RpcConnector>,
    settings: ChainClientSettings,
    active: RwLock<Arc<EndpointPool>>,
    tokens: TokenContractAdapter,
}

impl ChainClient {
    /// Create a client with `active_chain_id` selected. No network I/O
    /// happens here; unreachable endpoints surface on first use.
    pub fn new(
        networks: Vec<NetworkConfig>,
        active_chain_id: u64,
        connector: Arc<dyn RpcConnector>,
        settings: ChainClientSettings,
    ) -> Result<Self, ChainError> {
        let networks: HashMap<u64, NetworkConfig> =
            networks.into_iter().map(|n| (n.chain_id, n)).collect();
        let network = networks
            .get(&active_chain_id)
            .cloned()
            .ok_or(ChainError::UnknownNetwork(active_chain_id))?;
        let pool = EndpointPool::connect(network, connector.as_ref(), settings.retry)?;

        Ok(Self {
            networks,
            connector,
            settings,
            active: RwLock::new(Arc::new(pool)),
            tokens: TokenContractAdapter::default(),
        })
    }

    /// Known networks, sorted by chain id.
    pub fn networks(&self) -> Vec<NetworkConfig> {
        let mut networks: Vec<_> = self.networks.values().cloned().collect();
        networks.sort_by_key(|n| n.chain_id);
        networks
    }

    /// Get the active network configuration.
    pub async fn network(&self) -> NetworkConfig {
        self.active.read().await.network().clone()
    }

    pub async fn network_status(&self) -> NetworkStatus {
        let pool = Arc::clone(&*self.active.read().await);
        NetworkStatus {
            network: pool.network().clone(),
            endpoints: pool.health(),
        }
    }

    async fn pool(&self) -> Arc<EndpointPool> {
        Arc::clone(&*self.active.read().await)
    }

    /// Pool for `chain_id`: the active one, or a throwaway pool for a
    /// read-only query on another known network.
    async fn pool_for(&self, chain_id: u64) -> Result<Arc<EndpointPool>, ChainError> {
        let active = self.pool().await;
        if active.chain_id() == chain_id {
            return Ok(active);
        }
        let network = self
            .networks
            .get(&chain_id)
            .cloned()
            .ok_or(ChainError::UnknownNetwork(chain_id))?;
        Ok(Arc::new(EndpointPool::connect(
            network,
            self.connector.as_ref(),
            self.settings.retry,
        )?))
    }

    // =========================================================================
    // Balances
    // =========================================================================

    async fn native_balance(pool: &EndpointPool, address: Address) -> Result<U256, ChainError> {
        pool.retry_with_failover("eth_getBalance", |rpc| async move {
            rpc.balance(address).await
        })
        .await
    }

    /// Native balance on the active network as a decimal string.
    pub async fn get_balance(&self, address: &str) -> Result<String, ChainError> {
        let chain_id = self.pool().await.chain_id();
        Ok(self.get_native_balance(address, chain_id).await?.balance_formatted)
    }

    /// Native balance on any known network.
    pub async fn get_native_balance(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<TokenBalance, ChainError> {
        let address = parse_address(address, "wallet")?;
        let pool = self.pool_for(chain_id).await?;
        let balance = Self::native_balance(&pool, address).await?;
        Ok(TokenBalance::native(pool.network(), balance))
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    pub async fn get_token_info(&self, token: Address) -> Result<TokenInfo, ChainError> {
        let pool = self.pool().await;
        self.tokens.get_token_info(&pool, token).await
    }

    pub async fn get_token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> Result<TokenBalance, ChainError> {
        let pool = self.pool().await;
        self.tokens.get_token_balance(&pool, token, owner).await
    }

    /// Partial-failure tolerant: failing tokens are omitted.
    pub async fn get_multiple_token_balances(
        &self,
        owner: Address,
        tokens: &[Address],
    ) -> Vec<TokenBalance> {
        let pool = self.pool().await;
        self.tokens
            .get_multiple_token_balances(&pool, owner, tokens)
            .await
    }

    // =========================================================================
    // Fees
    // =========================================================================

    /// Price `request` on the active network.
    ///
    /// Networks whose latest block carries a base fee get an EIP-1559 quote
    /// (`max_fee = 2 × base_fee + tip`); others get a legacy gas price.
    pub async fn estimate_gas(&self, request: &TxRequest) -> Result<NetworkQuote, ChainError> {
        let pool = self.pool().await;
        let tx = to_transaction_request(request, request.from.unwrap_or_default());
        let quote = Self::quote(&pool, &tx, None).await?;
        Ok(NetworkQuote {
            network: pool.network().clone(),
            quote,
        })
    }

    async fn simulate(
        pool: &EndpointPool,
        tx: &alloy::rpc::types::TransactionRequest,
        fallback_gas: Option<u64>,
    ) -> Result<u64, ChainError> {
        let result = pool
            .retry_with_failover("eth_estimateGas", |rpc| async move {
                rpc.estimate_gas(tx).await
            })
            .await;

        match (result, fallback_gas) {
            (Err(ChainError::Rejected(message)), Some(fallback)) if !is_revert(&message) => {
                tracing::warn!(
                    network = %pool.network().name,
                    error = %message,
                    fallback,
                    "Gas simulation unavailable, using fallback limit"
                );
                Ok(fallback)
            }
            (result, _) => result,
        }
    }

    async fn fee_model(pool: &EndpointPool) -> Result<FeeModel, ChainError> {
        let base_fee = pool
            .retry_with_failover("eth_getBlockByNumber", |rpc| async move {
                rpc.base_fee().await
            })
            .await?;

        match base_fee {
            Some(base_fee) => {
                let tip = match pool
                    .retry_with_failover("eth_maxPriorityFeePerGas", |rpc| async move {
                        rpc.max_priority_fee().await
                    })
                    .await
                {
                    Ok(tip) => tip,
                    Err(ChainError::Rejected(_)) => DEFAULT_PRIORITY_FEE,
                    Err(e) => return Err(e),
                };
                Ok(FeeModel::Eip1559 {
                    max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(tip),
                    max_priority_fee_per_gas: tip,
                })
            }
            None => {
                let gas_price = pool
                    .retry_with_failover("eth_gasPrice", |rpc| async move {
                        rpc.gas_price().await
                    })
                    .await?;
                Ok(FeeModel::Legacy { gas_price })
            }
        }
    }

    /// Fee model and gas limit together; any failure fails the quote.
    async fn quote(
        pool: &EndpointPool,
        tx: &alloy::rpc::types::TransactionRequest,
        fallback_gas: Option<u64>,
    ) -> Result<GasQuote, ChainError> {
        let (fee, gas_limit) =
            tokio::try_join!(Self::fee_model(pool), Self::simulate(pool, tx, fallback_gas))?;
        Ok(GasQuote::new(fee, gas_limit))
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Sign `request` with `signer`, broadcast it and wait (bounded) for a
    /// receipt.
    ///
    /// # Returns
    /// - `TxStatus::Success` / `TxStatus::Failed` once a receipt is seen
    /// - `TxStatus::Unknown` if none appeared within the confirmation timeout;
    ///   the transaction may still be mined
    ///
    /// With `expected_chain_id` set, the send fails with
    /// `ChainError::NetworkChanged` unless that network is still active.
    pub async fn send_transaction(
        &self,
        request: TxRequest,
        signer: EphemeralSigner,
        expected_chain_id: Option<u64>,
    ) -> Result<PendingTransaction, ChainError> {
        self.send_with(request, signer, expected_chain_id, None).await
    }

    /// Transfer `amount` (human units) of `token` to `to`.
    ///
    /// Decimals and balance are checked before anything is signed; an amount
    /// above the sender's token balance never reaches broadcast.
    pub async fn send_token_transfer(
        &self,
        token: Address,
        to: Address,
        amount: &str,
        signer: EphemeralSigner,
        expected_chain_id: Option<u64>,
    ) -> Result<PendingTransaction, ChainError> {
        let pool = self.pool().await;
        let expected = expected_chain_id.unwrap_or_else(|| pool.chain_id());
        if expected != pool.chain_id() {
            return Err(ChainError::NetworkChanged {
                expected,
                active: pool.chain_id(),
            });
        }
        let owner = signer.address();

        let (info, balance) = tokio::try_join!(
            self.tokens.get_token_info(&pool, token),
            self.tokens.balance_of(&pool, token, owner),
        )?;
        let amount = parse_amount(amount, info.decimals)?;
        if amount > balance {
            return Err(ChainError::InsufficientBalance {
                needed: format!("{} {}", format_amount(amount, info.decimals), info.symbol),
                available: format!("{} {}", format_amount(balance, info.decimals), info.symbol),
            });
        }

        let request = token_transfer_request(token, to, amount);
        self.send_with(
            request,
            signer,
            Some(expected),
            Some(FALLBACK_TOKEN_TRANSFER_GAS),
        )
        .await
    }

    async fn send_with(
        &self,
        request: TxRequest,
        signer: EphemeralSigner,
        expected_chain_id: Option<u64>,
        fallback_gas: Option<u64>,
    ) -> Result<PendingTransaction, ChainError> {
        let from = signer.address();
        if request.from.is_some_and(|f| f != from) {
            return Err(ChainError::InvalidAddress(format!(
                "request sender does not match signer {from}"
            )));
        }

        // Held until the broadcast settles; see module docs
        let guard = self.active.read().await;
        let pool = Arc::clone(&*guard);
        let chain_id = pool.chain_id();
        if let Some(expected) = expected_chain_id.filter(|id| *id != chain_id) {
            return Err(ChainError::NetworkChanged {
                expected,
                active: chain_id,
            });
        }

        let tx = to_transaction_request(&request, from);
        let (nonce, quote, balance) = tokio::try_join!(
            pool.retry_with_failover("eth_getTransactionCount", |rpc| async move {
                rpc.nonce(from).await
            }),
            Self::quote(&pool, &tx, fallback_gas),
            Self::native_balance(&pool, from),
        )?;

        let needed = request.value.saturating_add(quote.estimated_cost);
        if needed > balance {
            let network = pool.network();
            return Err(ChainError::InsufficientBalance {
                needed: format!(
                    "{} {}",
                    format_amount(needed, network.native_decimals),
                    network.native_symbol
                ),
                available: format!(
                    "{} {}",
                    format_amount(balance, network.native_decimals),
                    network.native_symbol
                ),
            });
        }

        let signed = sign_transaction(apply_quote(tx, &quote, nonce, chain_id), signer).await?;
        self.broadcast(&pool, signed.hash, &signed.raw).await?;
        let submitted_at = Utc::now();
        drop(guard);

        tracing::info!(
            network = %pool.network().name,
            tx_hash = %signed.hash,
            nonce,
            "Transaction broadcast"
        );

        let (status, receipt) = self.await_receipt(&pool, signed.hash).await;
        let hash = signed.hash.to_string();
        Ok(PendingTransaction {
            explorer_url: pool.network().explorer_tx_url(&hash),
            hash,
            chain_id,
            nonce,
            submitted_at,
            status,
            receipt,
        })
    }

    async fn broadcast(
        &self,
        pool: &EndpointPool,
        hash: TxHash,
        raw: &[u8],
    ) -> Result<(), ChainError> {
        let result = pool
            .retry_with_failover("eth_sendRawTransaction", |rpc| async move {
                rpc.send_raw(raw).await
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(ChainError::Rejected(message)) if is_already_known(&message) => {
                tracing::info!(tx_hash = %hash, "Endpoint already has transaction");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll for a receipt until one appears or the confirmation timeout
    /// elapses.
    async fn await_receipt(
        &self,
        pool: &EndpointPool,
        hash: TxHash,
    ) -> (TxStatus, Option<ReceiptSummary>) {
        let poll = async {
            loop {
                match Self::fetch_receipt(pool, hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(tx_hash = %hash, error = %e, "Receipt poll failed");
                    }
                }
                tokio::time::sleep(self.settings.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.settings.confirmation_timeout, poll).await {
            Ok(receipt) => {
                tracing::info!(
                    tx_hash = %hash,
                    success = receipt.success,
                    block = ?receipt.block_number,
                    "Transaction confirmed"
                );
                (receipt.status(), Some(receipt))
            }
            Err(_) => {
                tracing::warn!(
                    tx_hash = %hash,
                    timeout_secs = self.settings.confirmation_timeout.as_secs(),
                    "No receipt before timeout"
                );
                (TxStatus::Unknown, None)
            }
        }
    }

    async fn fetch_receipt(
        pool: &EndpointPool,
        hash: TxHash,
    ) -> Result<Option<ReceiptSummary>, ChainError> {
        pool.retry_with_failover("eth_getTransactionReceipt", |rpc| async move {
            rpc.receipt(hash).await
        })
        .await
    }

    /// One-shot status lookup on the active network.
    pub async fn transaction_status(&self, hash: TxHash) -> Result<TxStatus, ChainError> {
        let pool = self.pool().await;
        Ok(Self::fetch_receipt(&pool, hash)
            .await?
            .map_or(TxStatus::Pending, |r| r.status()))
    }

    // =========================================================================
    // Network switching
    // =========================================================================

    /// Make `chain_id` the active network.
    ///
    /// Waits for in-flight sends, then queries `eth_chainId` on the new pool.
    /// If the new network is unreachable, or answers with another chain id,
    /// the previous network stays active and `Ok(false)` is returned.
    pub async fn switch_network(&self, chain_id: u64) -> Result<bool, ChainError> {
        let network = self
            .networks
            .get(&chain_id)
            .cloned()
            .ok_or(ChainError::UnknownNetwork(chain_id))?;

        let mut active = self.active.write().await;
        if active.chain_id() == chain_id {
            return Ok(true);
        }
        let candidate = Arc::new(EndpointPool::connect(
            network,
            self.connector.as_ref(),
            self.settings.retry,
        )?);

        let reported_chain = candidate
            .retry_with_failover("eth_chainId", |rpc| async move { rpc.chain_id().await })
            .await;

        match reported_chain {
            Ok(reported) if reported == chain_id => {
                tracing::info!(
                    from = %active.network().name,
                    to = %candidate.network().name,
                    chain_id,
                    "Switched network"
                );
                *active = candidate;
                Ok(true)
            }
            Ok(reported) => {
                tracing::warn!(
                    network = %candidate.network().name,
                    expected = chain_id,
                    reported,
                    "Endpoint reports a different chain, keeping current network"
                );
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(
                    network = %candidate.network().name,
                    error = %e,
                    "Network unreachable, keeping current network"
                );
                Ok(false)
            }
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown network: chain id {0}")]
    UnknownNetwork(u64),

    #[error("Active network changed from {expected} to {active}")]
    NetworkChanged { expected: u64, active: u64 },

    /// Every attempt failed at the transport level.
    #[error("Network {chain_id} unreachable after {attempts} attempts: {message}")]
    Network {
        chain_id: u64,
        attempts: u32,
        message: String,
    },

    /// The node refused the request. Not retried.
    #[error("Rejected by chain: {0}")]
    Rejected(String),

    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: String, available: String },

    #[error("Contract error on {token}: {message}")]
    ContractCall { token: String, message: String },

    #[error("Signing failed: {0}")]
    Signing(String),
}
