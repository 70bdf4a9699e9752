// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Active network endpoints.

use axum::{extract::State, Json};

use crate::{
    error::ApiError,
    models::{EndpointStatus, NetworkResponse, SwitchNetworkRequest, SwitchNetworkResponse},
    state::AppState,
};

/// Active network, its endpoint health and the known networks.
#[utoipa::path(
    get,
    path = "/v1/network",
    tag = "Network",
    responses(
        (status = 200, description = "Network status", body = NetworkResponse)
    )
)]
pub async fn get_network(State(state): State<AppState>) -> Json<NetworkResponse> {
    let status = state.wallet.network_status().await;
    Json(NetworkResponse {
        active: status.network,
        endpoints: status
            .endpoints
            .into_iter()
            .map(|(url, health)| EndpointStatus::new(url, health))
            .collect(),
        available: state.wallet.networks(),
    })
}

/// Switch the active network.
///
/// Waits for in-flight sends on the current network. If the target is
/// unreachable the current network stays active and `switched` is false.
#[utoipa::path(
    put,
    path = "/v1/network",
    tag = "Network",
    request_body = SwitchNetworkRequest,
    responses(
        (status = 200, description = "Switch attempted", body = SwitchNetworkResponse),
        (status = 400, description = "Unknown network")
    )
)]
pub async fn switch_network(
    State(state): State<AppState>,
    Json(request): Json<SwitchNetworkRequest>,
) -> Result<Json<SwitchNetworkResponse>, ApiError> {
    let switched = state.wallet.switch_network(request.chain_id).await?;
    Ok(Json(SwitchNetworkResponse {
        switched,
        active: state.wallet.chain().network().await,
    }))
}
