// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unlock session endpoints.

use axum::{extract::State, http::StatusCode, Json};
use zeroize::Zeroizing;

use crate::{
    error::ApiError, models::UnlockRequest, state::AppState, vault::SessionToken,
    wallet::AccountAuth,
};

/// Credentials from a request body; the password wins when both are given.
pub(crate) fn account_auth(
    password: Option<String>,
    session_token: Option<String>,
) -> Result<AccountAuth, ApiError> {
    match (password, session_token) {
        (Some(password), _) => Ok(AccountAuth::Password(Zeroizing::new(password))),
        (None, Some(token)) => Ok(AccountAuth::Session(token)),
        (None, None) => Err(ApiError::unauthorized(
            "Either password or session_token is required",
        )),
    }
}

/// Unlock an account for password-less sends.
///
/// Replaces any existing session. The token expires after the configured
/// session TTL.
#[utoipa::path(
    post,
    path = "/v1/session",
    tag = "Session",
    request_body = UnlockRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionToken),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn unlock(
    State(state): State<AppState>,
    Json(request): Json<UnlockRequest>,
) -> Result<Json<SessionToken>, ApiError> {
    let token = state
        .wallet
        .unlock(request.account_id, Zeroizing::new(request.password))
        .await?;
    Ok(Json(token))
}

/// End the current session.
#[utoipa::path(
    delete,
    path = "/v1/session",
    tag = "Session",
    responses(
        (status = 204, description = "Session closed")
    )
)]
pub async fn lock(State(state): State<AppState>) -> StatusCode {
    state.wallet.lock();
    StatusCode::NO_CONTENT
}
