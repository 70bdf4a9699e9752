// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fee estimation, send and status endpoints.

use alloy::primitives::Bytes;
use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    blockchain::PendingTransaction,
    error::ApiError,
    models::{
        FeeEstimateRequest, FeeEstimateResponse, SendTransactionRequest, TransactionStatusResponse,
    },
    state::AppState,
    wallet::TransferParams,
};

use super::session::account_auth;

/// Price a transfer on the active network.
///
/// Returns an EIP-1559 quote on networks with a base fee and a legacy gas
/// price elsewhere.
#[utoipa::path(
    post,
    path = "/v1/fees/estimate",
    tag = "Transactions",
    request_body = FeeEstimateRequest,
    responses(
        (status = 200, description = "Fee quote", body = FeeEstimateResponse),
        (status = 400, description = "Invalid address or amount"),
        (status = 422, description = "Simulation rejected"),
        (status = 503, description = "Blockchain network unavailable")
    )
)]
pub async fn estimate_fee(
    State(state): State<AppState>,
    Json(request): Json<FeeEstimateRequest>,
) -> Result<Json<FeeEstimateResponse>, ApiError> {
    let params = TransferParams {
        to: request.to,
        amount: request.amount,
        token: request.token,
        data: None,
    };
    let estimate = state
        .wallet
        .estimate_fee(request.from.as_deref(), &params)
        .await?;
    Ok(Json(FeeEstimateResponse::new(
        &estimate.quote,
        &estimate.network,
    )))
}

/// Sign and broadcast a native or ERC-20 transfer.
///
/// Waits a bounded time for a receipt. `status = unknown` means no receipt
/// was seen in time; the transaction may still be mined.
#[utoipa::path(
    post,
    path = "/v1/transactions",
    tag = "Transactions",
    request_body = SendTransactionRequest,
    responses(
        (status = 200, description = "Transaction broadcast", body = PendingTransaction),
        (status = 400, description = "Invalid address or amount"),
        (status = 401, description = "Wrong password or expired session"),
        (status = 422, description = "Rejected by chain or insufficient balance"),
        (status = 503, description = "Blockchain network unavailable")
    )
)]
pub async fn send_transaction(
    State(state): State<AppState>,
    Json(request): Json<SendTransactionRequest>,
) -> Result<Json<PendingTransaction>, ApiError> {
    let auth = account_auth(request.password, request.session_token)?;
    let data = request
        .data
        .as_deref()
        .map(|hex| hex.parse::<Bytes>())
        .transpose()
        .map_err(|_| ApiError::bad_request("data must be 0x-prefixed hex"))?;

    let params = TransferParams {
        to: request.to,
        amount: request.amount,
        token: request.token,
        data,
    };
    let pending = state.wallet.send(request.account_id, auth, params).await?;
    Ok(Json(pending))
}

/// Receipt status of a transaction on the active network.
#[utoipa::path(
    get,
    path = "/v1/transactions/{hash}",
    tag = "Transactions",
    params(("hash" = String, Path, description = "Transaction hash")),
    responses(
        (status = 200, description = "Transaction status", body = TransactionStatusResponse),
        (status = 400, description = "Invalid hash")
    )
)]
pub async fn transaction_status(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<TransactionStatusResponse>, ApiError> {
    let status = state.wallet.transaction_status(&hash).await?;
    Ok(Json(TransactionStatusResponse { hash, status }))
}
