// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 token contract interactions.
//!
//! Reads are plain `eth_call`s routed through the endpoint pool, so they get
//! the same failover as every other chain call. Token metadata never
//! changes and is cached per `(chain_id, token)`.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
};
use futures::future::join_all;
use lru::LruCache;

use super::client::ChainError;
use super::failover::EndpointPool;
use super::types::{TokenBalance, TokenInfo};

// Define the ERC-20 interface using alloy's sol! macro
sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Default number of cached token metadata entries.
pub const TOKEN_CACHE_CAPACITY: usize = 256;

/// ERC-20 read helpers with a metadata cache.
pub struct TokenContractAdapter {
    cache: Mutex<LruCache<(u64, Address), TokenInfo>>,
}

impl Default for TokenContractAdapter {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(TOKEN_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}

impl TokenContractAdapter {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Encode `transfer(to, amount)`.
    pub fn transfer_calldata(to: Address, amount: U256) -> Bytes {
        IERC20::transferCall { to, amount }.abi_encode().into()
    }

    async fn read<C: SolCall>(
        pool: &EndpointPool,
        token: Address,
        call: C,
    ) -> Result<C::Return, ChainError> {
        let tx = TransactionRequest::default()
            .to(token)
            .input(call.abi_encode().into());
        let tx = &tx;

        let raw = pool
            .retry_with_failover(C::SIGNATURE, |rpc| async move { rpc.call(tx).await })
            .await
            .map_err(|e| match e {
                ChainError::Rejected(message) => ChainError::ContractCall {
                    token: token.to_checksum(None),
                    message,
                },
                other => other,
            })?;

        C::abi_decode_returns(&raw).map_err(|e| ChainError::ContractCall {
            token: token.to_checksum(None),
            message: format!("{} returned malformed data: {e}", C::SIGNATURE),
        })
    }

    /// Name, symbol and decimals, read in parallel.
    ///
    /// # Returns
    /// - `Err(ChainError::ContractCall)` if any of the three reads is not
    ///   supported by the contract
    pub async fn get_token_info(
        &self,
        pool: &EndpointPool,
        token: Address,
    ) -> Result<TokenInfo, ChainError> {
        let key = (pool.chain_id(), token);
        if let Some(info) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(info.clone());
        }

        let (name, symbol, decimals) = tokio::try_join!(
            Self::read(pool, token, IERC20::nameCall {}),
            Self::read(pool, token, IERC20::symbolCall {}),
            Self::read(pool, token, IERC20::decimalsCall {}),
        )?;

        let info = TokenInfo {
            address: token.to_checksum(None),
            name,
            symbol,
            decimals,
        };
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, info.clone());
        Ok(info)
    }

    /// Raw `balanceOf(owner)`.
    pub async fn balance_of(
        &self,
        pool: &EndpointPool,
        token: Address,
        owner: Address,
    ) -> Result<U256, ChainError> {
        Self::read(pool, token, IERC20::balanceOfCall { account: owner }).await
    }

    pub async fn get_token_balance(
        &self,
        pool: &EndpointPool,
        token: Address,
        owner: Address,
    ) -> Result<TokenBalance, ChainError> {
        let (info, balance) = tokio::try_join!(
            self.get_token_info(pool, token),
            self.balance_of(pool, token, owner),
        )?;
        Ok(TokenBalance::token(&info, balance))
    }

    /// Balances for several tokens, fetched concurrently.
    ///
    /// Tokens whose reads fail are left out of the result and logged; the
    /// caller detects a partial result by comparing lengths.
    pub async fn get_multiple_token_balances(
        &self,
        pool: &EndpointPool,
        owner: Address,
        tokens: &[Address],
    ) -> Vec<TokenBalance> {
        let results = join_all(
            tokens
                .iter()
                .map(|token| self.get_token_balance(pool, *token, owner)),
        )
        .await;

        tokens
            .iter()
            .zip(results)
            .filter_map(|(token, result)| match result {
                Ok(balance) => Some(balance),
                Err(e) => {
                    tracing::warn!(
                        network = %pool.network().name,
                        token = %token,
                        error = %e,
                        "Dropping token from balance batch"
                    );
                    None
                }
            })
            .collect()
    }
}
