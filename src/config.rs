// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the daemon. Configuration is loaded from the environment at
//! startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory of the account store | `./data` |
//! | `HOST` | Daemon bind address | `127.0.0.1` |
//! | `PORT` | Daemon bind port | `8787` |
//! | `DEFAULT_CHAIN_ID` | Network active at startup | `11155111` (Sepolia) |
//! | `RPC_URLS_<CHAIN_ID>` | Comma-separated endpoint override for one network | Built-in pool |
//! | `SESSION_TTL_SECS` | Unlock session validity | `300` |
//! | `CONFIRMATION_TIMEOUT_SECS` | Receipt polling bound | `60` |
//! | `CONFIRMATION_POLL_MS` | Receipt polling interval | `2000` |
//! | `RPC_MAX_ATTEMPTS` | Failover attempts per call | `3` |
//! | `RPC_BACKOFF_MS` | Backoff unit, multiplied by the attempt number | `500` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated browser origins allowed besides loopback | none |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::{ChainClientSettings, NetworkConfig, RetryPolicy};
use crate::storage::paths::DATA_ROOT;

/// Environment variable name for the account store directory.
///
/// Every account record (metadata plus encrypted vault entry) is written
/// below this directory, one file per key.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Loopback only: the daemon serves a local front-end.
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;

pub const DEFAULT_CHAIN_ID_ENV: &str = "DEFAULT_CHAIN_ID";

/// Sepolia testnet
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Prefix of the per-network endpoint override, e.g. `RPC_URLS_43113`.
pub const RPC_URLS_ENV_PREFIX: &str = "RPC_URLS_";

pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const CONFIRMATION_TIMEOUT_ENV: &str = "CONFIRMATION_TIMEOUT_SECS";
pub const CONFIRMATION_POLL_ENV: &str = "CONFIRMATION_POLL_MS";
pub const RPC_MAX_ATTEMPTS_ENV: &str = "RPC_MAX_ATTEMPTS";
pub const RPC_BACKOFF_ENV: &str = "RPC_BACKOFF_MS";

/// Browser origins accepted in addition to loopback ones, e.g. a packaged
/// front-end's `tauri://localhost`.
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";

/// Environment variable name for logging format.
///
/// # Values
/// - `json` - Structured JSON logs
/// - `pretty` - Human-readable colored logs (default)
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Daemon configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub default_chain_id: u64,
    pub networks: Vec<NetworkConfig>,
    pub session_ttl: Duration,
    pub chain: ChainClientSettings,
    pub allowed_origins: Vec<String>,
}

impl WalletConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through `lookup`. Invalid numbers fall back
    /// to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let networks = NetworkConfig::builtin_networks()
            .into_iter()
            .map(|mut network| {
                let var = format!("{RPC_URLS_ENV_PREFIX}{}", network.chain_id);
                if let Some(urls) = lookup(&var) {
                    let urls = split_list(&urls);
                    if urls.is_empty() {
                        tracing::warn!(var = %var, "Empty RPC override ignored");
                    } else {
                        network.rpc_urls = urls;
                    }
                }
                network
            })
            .collect();

        let defaults = ChainClientSettings::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, RPC_MAX_ATTEMPTS_ENV, defaults.retry.max_attempts)
                .max(1),
            backoff: Duration::from_millis(parse_or(
                &lookup,
                RPC_BACKOFF_ENV,
                defaults.retry.backoff.as_millis() as u64,
            )),
        };

        Self {
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DATA_ROOT)),
            host: lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, PORT_ENV, DEFAULT_PORT),
            default_chain_id: parse_or(&lookup, DEFAULT_CHAIN_ID_ENV, DEFAULT_CHAIN_ID),
            networks,
            session_ttl: Duration::from_secs(parse_or(&lookup, SESSION_TTL_ENV, 300)),
            chain: ChainClientSettings {
                retry,
                confirmation_timeout: Duration::from_secs(parse_or(
                    &lookup,
                    CONFIRMATION_TIMEOUT_ENV,
                    defaults.confirmation_timeout.as_secs(),
                )),
                poll_interval: Duration::from_millis(parse_or(
                    &lookup,
                    CONFIRMATION_POLL_ENV,
                    defaults.poll_interval.as_millis() as u64,
                )),
            },
            allowed_origins: lookup(CORS_ALLOWED_ORIGINS_ENV)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
    }
}
