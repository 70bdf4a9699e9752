// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Browser origin policy.
//!
//! The daemon serves a front-end on the same machine. Requests carrying an
//! `Origin` header are accepted only from loopback origins
//! (`http://localhost:*`, `http://127.0.0.1:*`, `http://[::1]:*`) and the
//! origins listed in `CORS_ALLOWED_ORIGINS`. Requests without the header
//! (CLI tools, native front-ends) are unaffected.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::{Host, Url};

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    extra: Arc<Vec<HeaderValue>>,
}

impl OriginPolicy {
    /// Loopback origins plus `extra`. Entries that are not valid header
    /// values are skipped with a warning.
    pub fn new(extra: &[String]) -> Self {
        let extra = extra
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim_end_matches('/')) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Invalid allowed origin ignored");
                    None
                }
            })
            .collect();
        Self {
            extra: Arc::new(extra),
        }
    }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        self.extra.iter().any(|allowed| allowed == origin) || is_loopback_origin(origin)
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let policy = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin, _| policy.allows(origin)))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(Duration::from_secs(600))
    }
}

fn is_loopback_origin(origin: &HeaderValue) -> bool {
    let Some(url) = origin.to_str().ok().and_then(|o| Url::parse(o).ok()) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Reject any request whose `Origin` the policy does not allow, preflights
/// included, before it reaches a handler.
pub async fn reject_foreign_origin(
    State(policy): State<OriginPolicy>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !policy.allows(origin) {
            tracing::warn!(
                origin = ?origin,
                method = %request.method(),
                path = %request.uri().path(),
                "Request from foreign origin rejected"
            );
            return ApiError::forbidden("Origin not allowed").into_response();
        }
    }
    next.run(request).await
}
