// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and network presets.

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::transactions::format_amount;

/// EVM network configuration with an ordered endpoint pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID
    pub chain_id: u64,
    /// Native currency symbol (e.g. "ETH", "AVAX")
    pub native_symbol: String,
    /// Native currency decimals
    pub native_decimals: u8,
    /// RPC endpoints, in failover order
    pub rpc_urls: Vec<String>,
    /// Block explorer URL
    pub explorer_url: String,
}

impl NetworkConfig {
    pub fn new(name: &str, chain_id: u64, native_symbol: &str, rpc_urls: &[&str], explorer_url: &str) -> Self {
        Self {
            name: name.to_string(),
            chain_id,
            native_symbol: native_symbol.to_string(),
            native_decimals: 18,
            rpc_urls: rpc_urls.iter().map(|u| u.to_string()).collect(),
            explorer_url: explorer_url.to_string(),
        }
    }

    /// Ethereum mainnet.
    pub fn ethereum_mainnet() -> Self {
        Self::new(
            "Ethereum Mainnet",
            1,
            "ETH",
            &[
                "https://ethereum-rpc.publicnode.com",
                "https://eth.llamarpc.com",
                "https://rpc.ankr.com/eth",
            ],
            "https://etherscan.io",
        )
    }

    /// Ethereum Sepolia testnet.
    pub fn sepolia() -> Self {
        Self::new(
            "Sepolia",
            11_155_111,
            "ETH",
            &[
                "https://ethereum-sepolia-rpc.publicnode.com",
                "https://sepolia.drpc.org",
                "https://rpc.sepolia.org",
            ],
            "https://sepolia.etherscan.io",
        )
    }

    /// Avalanche C-Chain mainnet.
    pub fn avalanche() -> Self {
        Self::new(
            "Avalanche C-Chain",
            43_114,
            "AVAX",
            &[
                "https://api.avax.network/ext/bc/C/rpc",
                "https://avalanche-c-chain-rpc.publicnode.com",
            ],
            "https://snowtrace.io",
        )
    }

    /// Avalanche Fuji testnet.
    pub fn avalanche_fuji() -> Self {
        Self::new(
            "Avalanche Fuji Testnet",
            43_113,
            "AVAX",
            &[
                "https://api.avax-test.network/ext/bc/C/rpc",
                "https://avalanche-fuji-c-chain-rpc.publicnode.com",
            ],
            "https://testnet.snowtrace.io",
        )
    }

    /// BNB Smart Chain. Legacy gas pricing on most endpoints.
    pub fn bnb_smart_chain() -> Self {
        Self::new(
            "BNB Smart Chain",
            56,
            "BNB",
            &[
                "https://bsc-dataseed.bnbchain.org",
                "https://bsc-rpc.publicnode.com",
                "https://bsc-dataseed1.defibit.io",
            ],
            "https://bscscan.com",
        )
    }

    /// Every built-in network.
    pub fn builtin_networks() -> Vec<Self> {
        vec![
            Self::ethereum_mainnet(),
            Self::sepolia(),
            Self::avalanche(),
            Self::avalanche_fuji(),
            Self::bnb_smart_chain(),
        ]
    }

    pub fn builtin(chain_id: u64) -> Option<Self> {
        Self::builtin_networks()
            .into_iter()
            .find(|n| n.chain_id == chain_id)
    }

    pub fn explorer_tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

/// Token balance information.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenBalance {
    /// Token symbol (e.g., "ETH", "USDC")
    pub symbol: String,
    /// Token name
    pub name: String,
    /// Balance in smallest unit (wei for native, token decimals for ERC-20)
    pub balance_raw: String,
    /// Balance formatted with decimals
    pub balance_formatted: String,
    /// Number of decimals
    pub decimals: u8,
    /// Contract address (None for native token)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

impl TokenBalance {
    pub fn native(network: &NetworkConfig, balance: U256) -> Self {
        Self {
            symbol: network.native_symbol.clone(),
            name: network.name.clone(),
            balance_raw: balance.to_string(),
            balance_formatted: format_amount(balance, network.native_decimals),
            decimals: network.native_decimals,
            contract_address: None,
        }
    }

    pub fn token(info: &TokenInfo, balance: U256) -> Self {
        Self {
            symbol: info.symbol.clone(),
            name: info.name.clone(),
            balance_raw: balance.to_string(),
            balance_formatted: format_amount(balance, info.decimals),
            decimals: info.decimals,
            contract_address: Some(info.address.clone()),
        }
    }
}

/// Immutable ERC-20 metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenInfo {
    /// EIP-55 checksummed contract address
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Fee market a quote was priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeModel {
    /// Single gas price (pre-London chains, BSC)
    Legacy { gas_price: u128 },
    /// Base fee plus priority tip
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl FeeModel {
    /// Highest price per gas the sender may pay.
    pub fn max_price_per_gas(&self) -> u128 {
        match self {
            Self::Legacy { gas_price } => *gas_price,
            Self::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// Fee estimate for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasQuote {
    pub fee: FeeModel,
    pub gas_limit: u64,
    /// `gas_limit × max price per gas`, in wei
    pub estimated_cost: U256,
}

impl GasQuote {
    pub fn new(fee: FeeModel, gas_limit: u64) -> Self {
        Self {
            fee,
            gas_limit,
            estimated_cost: U256::from(gas_limit) * U256::from(fee.max_price_per_gas()),
        }
    }
}

/// A quote and the network it was priced on.
#[derive(Debug, Clone)]
pub struct NetworkQuote {
    pub network: NetworkConfig,
    pub quote: GasQuote,
}

/// Outcome of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Broadcast, no receipt yet
    Pending,
    /// Mined with status 1
    Success,
    /// Mined with status 0 (reverted)
    Failed,
    /// No receipt within the confirmation bound; may still be mined
    Unknown,
}

/// Subset of a receipt the wallet reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptSummary {
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
}

impl ReceiptSummary {
    pub fn status(&self) -> TxStatus {
        if self.success {
            TxStatus::Success
        } else {
            TxStatus::Failed
        }
    }
}

/// A broadcast transaction and what is known about it so far.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingTransaction {
    pub hash: String,
    pub chain_id: u64,
    pub nonce: u64,
    pub submitted_at: DateTime<Utc>,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptSummary>,
    pub explorer_url: String,
}

/// A transaction to price or send. `from` defaults to the signer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Option<Address>,
    pub to: Address,
    /// Native value in wei
    pub value: U256,
    pub data: Option<Bytes>,
}

impl TxRequest {
    pub fn native(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}
