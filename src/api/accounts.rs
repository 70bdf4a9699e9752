// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account management endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use zeroize::Zeroizing;

use crate::{
    error::ApiError,
    models::{
        AccountListResponse, ChangePasswordRequest, DeriveAccountRequest, RemoveAccountRequest,
    },
    state::AppState,
    storage::AccountSummary,
};

use super::session::account_auth;

/// List every stored account. Never includes key material.
#[utoipa::path(
    get,
    path = "/v1/accounts",
    tag = "Accounts",
    responses(
        (status = 200, description = "Accounts", body = AccountListResponse)
    )
)]
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<AccountListResponse>, ApiError> {
    let accounts = state.wallet.list_accounts().await?;
    Ok(Json(AccountListResponse { accounts }))
}

/// Delete an account and its encrypted key.
///
/// Requires the account's password or a live session token for it.
#[utoipa::path(
    delete,
    path = "/v1/accounts/{id}",
    tag = "Accounts",
    params(("id" = String, Path, description = "Account ID")),
    request_body = RemoveAccountRequest,
    responses(
        (status = 200, description = "Account removed", body = AccountSummary),
        (status = 401, description = "Missing or wrong credentials"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn remove_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RemoveAccountRequest>,
) -> Result<Json<AccountSummary>, ApiError> {
    let auth = account_auth(request.password, request.session_token)?;
    Ok(Json(state.wallet.remove_account(id, auth).await?))
}

/// Add the next unused address of a seed-backed account's phrase.
#[utoipa::path(
    post,
    path = "/v1/accounts/{id}/derive",
    tag = "Accounts",
    params(("id" = String, Path, description = "Source account ID")),
    request_body = DeriveAccountRequest,
    responses(
        (status = 201, description = "Account derived", body = AccountSummary),
        (status = 400, description = "Source is not a mnemonic account"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn derive_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeriveAccountRequest>,
) -> Result<(StatusCode, Json<AccountSummary>), ApiError> {
    let account = state
        .wallet
        .derive_next_account(
            id,
            Zeroizing::new(request.password),
            request.name.unwrap_or_default(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Re-encrypt an account's key under a new password.
#[utoipa::path(
    post,
    path = "/v1/accounts/{id}/password",
    tag = "Accounts",
    params(("id" = String, Path, description = "Account ID")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "New password too short"),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .wallet
        .change_password(
            id,
            Zeroizing::new(request.old_password),
            Zeroizing::new(request.new_password),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
