// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{blockchain::EndpointHealth, state::AppState};

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Data directory availability (if file-backed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// "ok" unless every endpoint of the active network is exhausted.
    pub rpc: String,
    pub chain_id: u64,
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails. Makes no network
/// calls; RPC health reflects recent traffic.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is degraded", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let data_dir = state.data_dir.as_ref().map(|dir| {
        if dir.exists() { "ok" } else { "missing" }.to_string()
    });
    let network = state.wallet.network_status().await;
    let rpc_ok = network
        .endpoints
        .iter()
        .any(|(_, health)| *health != EndpointHealth::Exhausted);

    let data_ok = data_dir.as_deref().map(|s| s == "ok").unwrap_or(true);
    let all_ok = data_ok && rpc_ok;

    let response = HealthResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            data_dir,
            rpc: if rpc_ok { "ok" } else { "exhausted" }.to_string(),
            chain_id: network.network.chain_id,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
