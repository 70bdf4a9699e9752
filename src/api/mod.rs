// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::{NetworkConfig, PendingTransaction, ReceiptSummary, TokenBalance, TxStatus},
    models::{
        AccountListResponse, BalanceResponse, ChangePasswordRequest, CreateWalletRequest,
        CreateWalletResponse, DeriveAccountRequest, EndpointStatus, FeeEstimateRequest,
        FeeEstimateResponse, FeeModelKind, ImportWalletRequest, NetworkResponse,
        RemoveAccountRequest, SendTransactionRequest, SwitchNetworkRequest, SwitchNetworkResponse,
        TokenBalancesResponse, TransactionStatusResponse, UnlockRequest,
    },
    state::AppState,
    storage::{AccountKind, AccountSummary},
    vault::{DerivationScheme, SessionToken},
};

pub mod accounts;
pub mod balance;
pub mod health;
pub mod network;
pub mod origin;
pub mod session;
pub mod transactions;
pub mod wallets;

pub fn router(state: AppState) -> Router {
    let origins = state.origins.clone();
    let v1_routes = Router::new()
        .route("/wallets", post(wallets::create_wallet))
        .route("/wallets/import", post(wallets::import_wallet))
        .route("/accounts", get(accounts::list_accounts))
        .route("/accounts/{id}", delete(accounts::remove_account))
        .route("/accounts/{id}/derive", post(accounts::derive_account))
        .route("/accounts/{id}/password", post(accounts::change_password))
        .route("/session", post(session::unlock).delete(session::lock))
        .route("/balance/{address}", get(balance::get_balance))
        .route("/tokens/balances", get(balance::get_token_balances))
        .route("/fees/estimate", post(transactions::estimate_fee))
        .route("/transactions", post(transactions::send_transaction))
        .route("/transactions/{hash}", get(transactions::transaction_status))
        .route(
            "/network",
            get(network::get_network).put(network::switch_network),
        )
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .with_state(state)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(origins.cors_layer())
        .layer(middleware::from_fn_with_state(
            origins,
            origin::reject_foreign_origin,
        ))
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        wallets::create_wallet,
        wallets::import_wallet,
        accounts::list_accounts,
        accounts::remove_account,
        accounts::derive_account,
        accounts::change_password,
        session::unlock,
        session::lock,
        balance::get_balance,
        balance::get_token_balances,
        transactions::estimate_fee,
        transactions::send_transaction,
        transactions::transaction_status,
        network::get_network,
        network::switch_network
    ),
    components(
        schemas(
            health::HealthResponse,
            health::HealthChecks,
            AccountKind,
            AccountSummary,
            AccountListResponse,
            DerivationScheme,
            CreateWalletRequest,
            CreateWalletResponse,
            ImportWalletRequest,
            DeriveAccountRequest,
            ChangePasswordRequest,
            RemoveAccountRequest,
            UnlockRequest,
            SessionToken,
            TokenBalance,
            BalanceResponse,
            TokenBalancesResponse,
            FeeEstimateRequest,
            FeeEstimateResponse,
            FeeModelKind,
            SendTransactionRequest,
            PendingTransaction,
            ReceiptSummary,
            TxStatus,
            TransactionStatusResponse,
            NetworkConfig,
            EndpointStatus,
            NetworkResponse,
            SwitchNetworkRequest,
            SwitchNetworkResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Wallets", description = "Wallet creation and import"),
        (name = "Accounts", description = "Account management"),
        (name = "Session", description = "Unlock sessions"),
        (name = "Balances", description = "Native and token balances"),
        (name = "Transactions", description = "Fee estimation and sending"),
        (name = "Network", description = "Active network selection")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::U256;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, Response, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::blockchain::mock::MockRpc;
    use crate::wallet::tests::{service, ADDRESS_0, PASSWORD, PHRASE, RECIPIENT};

    fn app() -> (Router, Arc<MockRpc>) {
        let (service, mock) = service();
        (router(AppState::new(service)), mock)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn import(app: &Router) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/v1/wallets/import",
            Some(json!({ "name": "Main", "password": PASSWORD, "mnemonic": PHRASE })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["address"], ADDRESS_0);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (app, _) = app();
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (app, _) = app();
        let (status, body) = call(&app, "GET", "/api-doc/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/v1/transactions"].is_object());
    }

    #[tokio::test]
    async fn health_reports_active_chain() {
        let (app, _) = app();
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["chain_id"], 1111);
        assert_eq!(body["checks"]["rpc"], "ok");
    }

    #[tokio::test]
    async fn create_wallet_returns_phrase_once() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            "POST",
            "/v1/wallets",
            Some(json!({ "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["mnemonic"].as_str().unwrap().split(' ').count(), 12);

        let (status, body) = call(&app, "GET", "/v1/accounts", None).await;
        assert_eq!(status, StatusCode::OK);
        let accounts = body["accounts"].as_array().unwrap();
        assert_eq!(accounts.len(), 1);
        assert!(accounts[0].get("mnemonic").is_none());
        assert!(accounts[0].get("vault").is_none());
    }

    #[tokio::test]
    async fn import_validation_errors() {
        let (app, _) = app();

        let (status, body) = call(
            &app,
            "POST",
            "/v1/wallets/import",
            Some(json!({ "password": PASSWORD, "mnemonic": "not a real phrase at all" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid mnemonic phrase");

        let (status, _) = call(
            &app,
            "POST",
            "/v1/wallets/import",
            Some(json!({ "password": PASSWORD, "mnemonic": PHRASE, "private_key": "00" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        import(&app).await;
        let (status, _) = call(
            &app,
            "POST",
            "/v1/wallets/import",
            Some(json!({ "password": PASSWORD, "mnemonic": PHRASE })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unlock_and_send_with_session() {
        let (app, mock) = app();
        let id = import(&app).await;
        mock.set_balance(ADDRESS_0.parse().unwrap(), U256::from(10u64).pow(U256::from(18u64)));
        mock.set_receipt(Some(ReceiptSummary {
            block_number: Some(3),
            gas_used: 21_000,
            success: true,
        }));

        let (status, _) = call(
            &app,
            "POST",
            "/v1/session",
            Some(json!({ "account_id": id, "password": "wrong password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, session) = call(
            &app,
            "POST",
            "/v1/session",
            Some(json!({ "account_id": id, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            &app,
            "POST",
            "/v1/transactions",
            Some(json!({
                "account_id": id,
                "session_token": session["token"],
                "to": RECIPIENT,
                "amount": "0.1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["chain_id"], 1111);

        let (status, _) = call(&app, "DELETE", "/v1/session", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(
            &app,
            "POST",
            "/v1/transactions",
            Some(json!({
                "account_id": id,
                "session_token": session["token"],
                "to": RECIPIENT,
                "amount": "0.1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn insufficient_balance_is_unprocessable() {
        let (app, _) = app();
        let id = import(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            "/v1/transactions",
            Some(json!({
                "account_id": id,
                "password": PASSWORD,
                "to": RECIPIENT,
                "amount": "5"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("Insufficient balance"));
    }

    #[tokio::test]
    async fn fee_estimate_strings() {
        let (app, _) = app();
        let (status, body) = call(
            &app,
            "POST",
            "/v1/fees/estimate",
            Some(json!({ "to": RECIPIENT, "amount": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fee_model"], "eip1559");
        assert_eq!(body["gas_limit"], 21_000);
        assert!(body["max_fee_per_gas"].is_string());
        assert!(body.get("gas_price").is_none());
    }

    #[tokio::test]
    async fn balance_rejects_bad_address() {
        let (app, _) = app();
        let (status, _) = call(&app, "GET", "/v1/balance/0x1234", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", &format!("/v1/balance/{ADDRESS_0}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance_formatted"], "0");
        assert_eq!(body["chain_id"], 1111);
    }

    #[tokio::test]
    async fn unknown_network_switch_is_bad_request() {
        let (app, _) = app();
        let (status, _) = call(&app, "PUT", "/v1/network", Some(json!({ "chain_id": 999 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/v1/network", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"]["chain_id"], 1111);
        assert_eq!(body["endpoints"][0]["health"], "healthy");
    }

    #[tokio::test]
    async fn derive_and_remove_accounts() {
        let (app, _) = app();
        let id = import(&app).await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/v1/accounts/{id}/derive"),
            Some(json!({ "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["address"], RECIPIENT);
        assert_eq!(body["derivation_path"], "m/44'/60'/0'/0/1");

        let uri = format!("/v1/accounts/{id}");
        let (status, _) = call(&app, "DELETE", &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let wrong = json!({ "password": "wrong password" });
        let (status, _) = call(&app, "DELETE", &uri, Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "DELETE", &uri, Some(json!({ "password": PASSWORD }))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "DELETE", &uri, Some(json!({ "password": PASSWORD }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    async fn call_from(app: &Router, origin: &str, method: &str, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("origin", origin)
            .header("access-control-request-method", "DELETE")
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn foreign_origins_are_refused() {
        let (app, _) = app();
        let id = import(&app).await;
        let uri = format!("/v1/accounts/{id}");

        let preflight = call_from(&app, "https://evil.example", "OPTIONS", &uri).await;
        assert_eq!(preflight.status(), StatusCode::FORBIDDEN);
        assert!(preflight
            .headers()
            .get("access-control-allow-origin")
            .is_none());

        let delete = call_from(&app, "https://evil.example", "DELETE", &uri).await;
        assert_eq!(delete.status(), StatusCode::FORBIDDEN);
        let listing = call_from(&app, "https://evil.example", "GET", "/v1/accounts").await;
        assert_eq!(listing.status(), StatusCode::FORBIDDEN);

        let (_, body) = call(&app, "GET", "/v1/accounts", None).await;
        assert_eq!(body["accounts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn loopback_front_end_passes_preflight() {
        let (app, _) = app();
        let preflight =
            call_from(&app, "http://localhost:5173", "OPTIONS", "/v1/accounts/x").await;
        assert!(preflight.status().is_success());
        assert_eq!(
            preflight.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
    }
}
