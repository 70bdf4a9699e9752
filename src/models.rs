// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the daemon's REST API. Responses derive
//! `Serialize` and `ToSchema`; requests derive `Deserialize` and `ToSchema`.
//!
//! Requests carrying passwords, phrases or keys do not derive
//! `Debug`. Handlers move those strings straight into `Zeroizing` buffers.
//!
//! Wei amounts are serialized as decimal strings: they routinely exceed the
//! 2^53 range JSON numbers can carry exactly.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::blockchain::failover::EXHAUSTED_AFTER;
use crate::blockchain::transactions::format_amount;
use crate::blockchain::{EndpointHealth, FeeModel, GasQuote, NetworkConfig, TokenBalance, TxStatus};
use crate::storage::AccountSummary;
use crate::vault::DerivationScheme;

// =============================================================================
// Accounts
// =============================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    /// Display name; defaults to a label derived from the address
    #[serde(default)]
    pub name: Option<String>,
    /// Vault password, at least 8 characters
    pub password: String,
}

/// The phrase is returned exactly once. It is not stored in plaintext
/// anywhere and cannot be retrieved again.
#[derive(Serialize, ToSchema)]
pub struct CreateWalletResponse {
    pub account: AccountSummary,
    pub mnemonic: String,
}

/// Import from exactly one of `mnemonic` or `private_key`.
#[derive(Deserialize, ToSchema)]
pub struct ImportWalletRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub password: String,
    #[serde(default)]
    pub mnemonic: Option<String>,
    /// 64 hex characters, `0x` prefix optional
    #[serde(default)]
    pub private_key: Option<String>,
    /// Derivation scheme for mnemonic imports
    #[serde(default)]
    pub scheme: Option<DerivationScheme>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountListResponse {
    pub accounts: Vec<AccountSummary>,
}

#[derive(Deserialize, ToSchema)]
pub struct DeriveAccountRequest {
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Proof of control for deleting an account: its password or a live session
/// token for it.
#[derive(Deserialize, ToSchema)]
pub struct RemoveAccountRequest {
    pub password: Option<String>,
    pub session_token: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

// =============================================================================
// Session
// =============================================================================

#[derive(Deserialize, ToSchema)]
pub struct UnlockRequest {
    pub account_id: String,
    pub password: String,
}

// =============================================================================
// Balances
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Network to query; defaults to the active network
    pub chain_id: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub address: String,
    pub chain_id: u64,
    #[serde(flatten)]
    pub balance: TokenBalance,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TokenBalancesQuery {
    /// Wallet address
    pub owner: String,
    /// Token contract addresses (comma-separated)
    pub tokens: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenBalancesResponse {
    pub owner: String,
    pub balances: Vec<TokenBalance>,
    /// True when at least one requested token could not be read
    pub partial: bool,
}

// =============================================================================
// Fees and transactions
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FeeEstimateRequest {
    /// Sender address, improves the gas simulation
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    /// Human-readable amount (e.g. "0.25")
    pub amount: String,
    /// ERC-20 contract; omit for the native asset
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeeModelKind {
    Legacy,
    Eip1559,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeeEstimateResponse {
    pub fee_model: FeeModelKind,
    pub gas_limit: u64,
    /// Wei per gas (legacy networks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Wei per gas (EIP-1559 networks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    /// Wei per gas (EIP-1559 networks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    /// Upper bound of the fee in wei
    pub estimated_cost_wei: String,
    /// Upper bound of the fee in native units
    pub estimated_cost: String,
    pub symbol: String,
}

impl FeeEstimateResponse {
    pub fn new(quote: &GasQuote, network: &NetworkConfig) -> Self {
        let (fee_model, gas_price, max_fee, max_priority) = match quote.fee {
            FeeModel::Legacy { gas_price } => {
                (FeeModelKind::Legacy, Some(gas_price.to_string()), None, None)
            }
            FeeModel::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => (
                FeeModelKind::Eip1559,
                None,
                Some(max_fee_per_gas.to_string()),
                Some(max_priority_fee_per_gas.to_string()),
            ),
        };
        Self {
            fee_model,
            gas_limit: quote.gas_limit,
            gas_price,
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: max_priority,
            estimated_cost_wei: quote.estimated_cost.to_string(),
            estimated_cost: format_amount(quote.estimated_cost, network.native_decimals),
            symbol: network.native_symbol.clone(),
        }
    }
}

/// Authorised by `password` or by an unlock `session_token`.
#[derive(Deserialize, ToSchema)]
pub struct SendTransactionRequest {
    pub account_id: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    pub to: String,
    pub amount: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Hex calldata for native sends
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionStatusResponse {
    pub hash: String,
    pub status: TxStatus,
}

// =============================================================================
// Networks
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct EndpointStatus {
    pub url: String,
    /// `healthy`, `degraded` or `exhausted`
    pub health: String,
    /// Capped at the exhaustion threshold
    pub consecutive_failures: u32,
}

impl EndpointStatus {
    pub fn new(url: String, health: EndpointHealth) -> Self {
        let (label, failures) = match health {
            EndpointHealth::Healthy => ("healthy", 0),
            EndpointHealth::Degraded {
                consecutive_failures,
            } => ("degraded", consecutive_failures),
            EndpointHealth::Exhausted => ("exhausted", EXHAUSTED_AFTER),
        };
        Self {
            url,
            health: label.to_string(),
            consecutive_failures: failures,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworkResponse {
    pub active: NetworkConfig,
    pub endpoints: Vec<EndpointStatus>,
    pub available: Vec<NetworkConfig>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SwitchNetworkRequest {
    pub chain_id: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SwitchNetworkResponse {
    /// False when the target network was unreachable and the previous
    /// network stayed active
    pub switched: bool,
    pub active: NetworkConfig,
}
