// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::blockchain::ChainError;
use crate::vault::VaultError;
use crate::wallet::WalletError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::InvalidMnemonic
            | VaultError::InvalidPrivateKey(_)
            | VaultError::InvalidPassword(_)
            | VaultError::InvalidDerivationIndex(_)
            | VaultError::UnsupportedAccountKind(_) => Self::bad_request(err.to_string()),
            VaultError::DecryptionFailed => Self::unauthorized(err.to_string()),
            VaultError::AccountNotFound(_) => Self::not_found(err.to_string()),
            VaultError::DuplicateAccount(_) | VaultError::ConcurrentUpdate(_) => {
                Self::conflict(err.to_string())
            }
            VaultError::UnsupportedFormat(_)
            | VaultError::Derivation(_)
            | VaultError::Encryption(_)
            | VaultError::Storage(_) => {
                tracing::error!(error = %err, "Vault failure");
                Self::internal("Internal vault error")
            }
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InvalidAddress(_)
            | ChainError::InvalidAmount(_)
            | ChainError::UnknownNetwork(_) => Self::bad_request(err.to_string()),
            ChainError::Rejected(_)
            | ChainError::InsufficientBalance { .. }
            | ChainError::ContractCall { .. } => Self::unprocessable(err.to_string()),
            ChainError::Network { .. } | ChainError::NetworkChanged { .. } => {
                Self::service_unavailable(err.to_string())
            }
            ChainError::InvalidRpcUrl(_) | ChainError::Signing(_) => {
                tracing::error!(error = %err, "Chain client failure");
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Vault(e) => e.into(),
            WalletError::Chain(e) => e.into(),
            WalletError::SessionInvalid => Self::unauthorized(err.to_string()),
            WalletError::InvalidInput(message) => Self::bad_request(message),
            WalletError::Internal(message) => {
                tracing::error!(error = %message, "Wallet service failure");
                Self::internal("Internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
