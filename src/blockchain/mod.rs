// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain integration.
//!
//! This module provides functionality for:
//! - Native and ERC-20 balance queries across known networks
//! - Legacy and EIP-1559 fee estimation
//! - Local signing, broadcast and bounded confirmation polling
//! - Endpoint failover and network switching

pub mod client;
pub mod erc20;
pub mod failover;
pub mod rpc;
pub mod signing;
pub mod transactions;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ChainClient, ChainClientSettings, ChainError, NetworkStatus};
pub use erc20::TokenContractAdapter;
pub use failover::{EndpointHealth, EndpointPool, RetryPolicy};
pub use rpc::{ChainRpc, HttpConnector, HttpRpc, RpcConnector, RpcFailure};
pub use types::*;
