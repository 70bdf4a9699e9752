// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction request building and amount conversion.

use std::str::FromStr;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, U256},
    rpc::types::TransactionRequest,
};

use super::client::ChainError;
use super::erc20::TokenContractAdapter;
use super::types::{FeeModel, GasQuote, TxRequest};

/// Gas limit used for token transfers whose simulation is unavailable.
pub const FALLBACK_TOKEN_TRANSFER_GAS: u64 = 100_000;

/// Priority tip used when the endpoint does not support
/// `eth_maxPriorityFeePerGas`.
pub const DEFAULT_PRIORITY_FEE: u128 = 1_500_000_000; // 1.5 gwei

/// Largest decimals value a token may declare and still be scaled.
const MAX_DECIMALS: u8 = 77;

/// Parse and validate a `0x` address.
pub fn parse_address(value: &str, field: &str) -> Result<Address, ChainError> {
    Address::from_str(value.trim())
        .map_err(|e| ChainError::InvalidAddress(format!("Invalid {field} address: {e}")))
}

/// Build the RPC request for `request` sent by `from`.
pub fn to_transaction_request(request: &TxRequest, from: Address) -> TransactionRequest {
    let mut tx = TransactionRequest::default()
        .from(from)
        .to(request.to)
        .value(request.value);
    if let Some(data) = &request.data {
        tx = tx.input(data.clone().into());
    }
    tx
}

/// Request calling `transfer(to, amount)` on `token`.
pub fn token_transfer_request(token: Address, to: Address, amount: U256) -> TxRequest {
    TxRequest {
        from: None,
        to: token,
        value: U256::ZERO,
        data: Some(TokenContractAdapter::transfer_calldata(to, amount)),
    }
}

/// Bind nonce, chain id and the quoted fees into `tx`.
pub fn apply_quote(
    tx: TransactionRequest,
    quote: &GasQuote,
    nonce: u64,
    chain_id: u64,
) -> TransactionRequest {
    let tx = tx
        .with_nonce(nonce)
        .with_chain_id(chain_id)
        .with_gas_limit(quote.gas_limit);
    match quote.fee {
        FeeModel::Legacy { gas_price } => tx.with_gas_price(gas_price),
        FeeModel::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => tx
            .with_max_fee_per_gas(max_fee_per_gas)
            .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
    }
}

/// The node already has this exact transaction, typically because an
/// earlier broadcast attempt reached it before the connection dropped.
pub fn is_already_known(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already known")
        || message.contains("known transaction")
        || message.contains("already imported")
}

/// Simulation reverted: the call itself would fail on chain.
pub fn is_revert(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("revert") || message.contains("insufficient funds")
}

/// Parse a human-readable amount to wei (or token units).
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for ETH, 6 for USDC)
///
/// # Returns
/// * `Ok(U256)` - Amount in smallest unit, always > 0
/// * `Err(ChainError::InvalidAmount)` - Malformed, zero, too precise or
///   overflowing input
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ChainError> {
    let amount = amount.trim();
    if decimals > MAX_DECIMALS {
        return Err(ChainError::InvalidAmount(format!(
            "Unsupported decimals: {decimals}"
        )));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(ChainError::InvalidAmount(format!(
            "Invalid amount format: {amount:?}"
        )));
    }
    if fraction.len() > decimals as usize {
        return Err(ChainError::InvalidAmount(format!(
            "Too many decimal places (max {decimals})"
        )));
    }

    let overflow = || ChainError::InvalidAmount("Amount overflow".to_string());
    let parse = |s: &str| -> Result<U256, ChainError> {
        if s.is_empty() {
            Ok(U256::ZERO)
        } else {
            U256::from_str_radix(s, 10).map_err(|_| overflow())
        }
    };

    // Pad with zeros to match decimals
    let padded = format!("{fraction:0<width$}", width = decimals as usize);
    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    let total = parse(whole)?
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(parse(&padded).ok()?))
        .ok_or_else(overflow)?;

    if total.is_zero() {
        return Err(ChainError::InvalidAmount(
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(total)
}

/// Format wei (or token units) to human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}
