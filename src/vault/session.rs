// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unlock sessions.
//!
//! A session caches one account's password so the caller is not re-prompted
//! for every send. It lives only in process memory, is zeroized when
//! replaced or invalidated, and expires after a fixed TTL.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Default validity of an unlock session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);

/// Capability returned by an unlock. Holding the token is what authorises
/// password-less sends for `account_id` until `expires_at`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionToken {
    pub token: String,
    pub account_id: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_secs: u64,
}

struct Session {
    token: Uuid,
    account_id: String,
    password: Zeroizing<String>,
    expires_at: Instant,
}

/// Holds at most one active session.
pub struct SessionManager {
    current: Mutex<Option<Session>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: Mutex::new(None),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session, replacing (and zeroizing) any previous one.
    ///
    /// The caller must have verified `password` against the account first.
    pub fn open(&self, account_id: &str, password: &str) -> SessionToken {
        let token = Uuid::new_v4();
        let session = Session {
            token,
            account_id: account_id.to_string(),
            password: Zeroizing::new(password.to_string()),
            expires_at: Instant::now() + self.ttl,
        };

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(session);

        let wall_ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        SessionToken {
            token: token.to_string(),
            account_id: account_id.to_string(),
            expires_at: Utc::now() + wall_ttl,
            expires_in_secs: self.ttl.as_secs(),
        }
    }

    /// Resolve a token to the cached password if it is current and bound to
    /// `account_id`. Expired sessions are dropped on access.
    pub fn password_for(&self, token: &str, account_id: &str) -> Option<Zeroizing<String>> {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());

        if guard.as_ref().is_some_and(|s| Instant::now() >= s.expires_at) {
            *guard = None;
            tracing::debug!("Unlock session expired");
            return None;
        }

        let session = guard.as_ref()?;
        let token = Uuid::parse_str(token).ok()?;
        if session.token == token && session.account_id == account_id {
            Some(session.password.clone())
        } else {
            None
        }
    }

    /// Account of the active session, if any.
    pub fn active_account(&self) -> Option<String> {
        let guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .filter(|s| Instant::now() < s.expires_at)
            .map(|s| s.account_id.clone())
    }

    /// Explicit logout.
    pub fn invalidate(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Drop the session only if it belongs to `account_id`.
    pub fn invalidate_account(&self, account_id: &str) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref().is_some_and(|s| s.account_id == account_id) {
            *guard = None;
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}
