// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet creation and import endpoints.

use axum::{extract::State, http::StatusCode, Json};
use zeroize::Zeroizing;

use crate::{
    error::ApiError,
    models::{CreateWalletRequest, CreateWalletResponse, ImportWalletRequest},
    state::AppState,
    storage::AccountSummary,
    wallet::ImportSource,
};

/// Create a new wallet.
///
/// Generates a 12-word phrase, stores the account at index 0 encrypted under
/// the password and returns the phrase. The phrase is never returned again.
#[utoipa::path(
    post,
    path = "/v1/wallets",
    tag = "Wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = CreateWalletResponse),
        (status = 400, description = "Password too short"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<CreateWalletResponse>), ApiError> {
    let password = Zeroizing::new(request.password);
    let created = state
        .wallet
        .create_wallet(request.name.unwrap_or_default(), password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateWalletResponse {
            account: created.account,
            mnemonic: created.mnemonic.as_str().to_string(),
        }),
    ))
}

/// Import a wallet from a mnemonic phrase or a raw private key.
#[utoipa::path(
    post,
    path = "/v1/wallets/import",
    tag = "Wallets",
    request_body = ImportWalletRequest,
    responses(
        (status = 201, description = "Wallet imported", body = AccountSummary),
        (status = 400, description = "Invalid mnemonic, key or password"),
        (status = 409, description = "Account already exists")
    )
)]
pub async fn import_wallet(
    State(state): State<AppState>,
    Json(request): Json<ImportWalletRequest>,
) -> Result<(StatusCode, Json<AccountSummary>), ApiError> {
    let source = match (request.mnemonic, request.private_key) {
        (Some(phrase), None) => ImportSource::Mnemonic {
            phrase: Zeroizing::new(phrase),
            scheme: request.scheme.unwrap_or_default(),
        },
        (None, Some(key)) => ImportSource::PrivateKey(Zeroizing::new(key)),
        _ => {
            return Err(ApiError::bad_request(
                "Provide exactly one of mnemonic or private_key",
            ))
        }
    };

    let account = state
        .wallet
        .import_wallet(
            source,
            request.name.unwrap_or_default(),
            Zeroizing::new(request.password),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}
