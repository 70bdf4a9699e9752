// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain balance query endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::ApiError,
    models::{BalanceQuery, BalanceResponse, TokenBalancesQuery, TokenBalancesResponse},
    state::AppState,
    wallet::parse_token_list,
};

/// Native balance of an address.
///
/// Queries the active network unless `chain_id` names another known network.
/// The active network is not changed.
#[utoipa::path(
    get,
    path = "/v1/balance/{address}",
    tag = "Balances",
    params(
        ("address" = String, Path, description = "Wallet address"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Balance retrieved successfully", body = BalanceResponse),
        (status = 400, description = "Invalid address or unknown network"),
        (status = 503, description = "Blockchain network unavailable")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.wallet.get_balance(&address, query.chain_id).await?;
    let chain_id = match query.chain_id {
        Some(id) => id,
        None => state.wallet.chain().network().await.chain_id,
    };

    Ok(Json(BalanceResponse {
        address,
        chain_id,
        balance,
    }))
}

/// ERC-20 balances on the active network.
///
/// Tokens whose contract calls fail are left out and `partial` is set.
#[utoipa::path(
    get,
    path = "/v1/tokens/balances",
    tag = "Balances",
    params(TokenBalancesQuery),
    responses(
        (status = 200, description = "Token balances", body = TokenBalancesResponse),
        (status = 400, description = "Invalid owner or token address")
    )
)]
pub async fn get_token_balances(
    State(state): State<AppState>,
    Query(query): Query<TokenBalancesQuery>,
) -> Result<Json<TokenBalancesResponse>, ApiError> {
    let tokens = parse_token_list(&query.tokens);
    if tokens.is_empty() {
        return Err(ApiError::bad_request("At least one token address is required"));
    }

    let balances = state.wallet.token_balances(&query.owner, &tokens).await?;
    Ok(Json(TokenBalancesResponse {
        partial: balances.len() < tokens.len(),
        owner: query.owner,
        balances,
    }))
}
