// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Endpoint pool with sequential round-robin failover.
//!
//! ## Endpoint health
//!
//! ```text
//!            failure                 failure × EXHAUSTED_AFTER
//! Healthy ──────────► Degraded(n) ───────────────────────────► Exhausted
//!    ▲                    │                                        │
//!    └────── success ─────┴──────────────── success ───────────────┘
//! ```
//!
//! A call starts at the cursor and, on a transport failure, advances to the
//! next endpoint that is not exhausted, sleeping `backoff × attempt` first.
//! A rejection from the node ends the call immediately: another endpoint
//! would say the same thing. Attempts for one call never overlap.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::client::ChainError;
use super::rpc::{ChainRpc, RpcConnector, RpcFailure};
use super::types::NetworkConfig;

/// Consecutive failures after which an endpoint is skipped when possible.
pub const EXHAUSTED_AFTER: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointHealth {
    Healthy,
    Degraded { consecutive_failures: u32 },
    Exhausted,
}

impl EndpointHealth {
    fn after_failure(self) -> Self {
        let failures = match self {
            Self::Healthy => 1,
            Self::Degraded {
                consecutive_failures,
            } => consecutive_failures + 1,
            Self::Exhausted => return Self::Exhausted,
        };
        if failures >= EXHAUSTED_AFTER {
            Self::Exhausted
        } else {
            Self::Degraded {
                consecutive_failures: failures,
            }
        }
    }
}

/// Attempts per logical call and the backoff unit between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

struct PoolState {
    cursor: usize,
    health: Vec<EndpointHealth>,
}

/// Ordered endpoints of one network.
pub struct EndpointPool {
    network: NetworkConfig,
    endpoints: Vec<Arc<dyn ChainRpc>>,
    policy: RetryPolicy,
    state: Mutex<PoolState>,
}

impl EndpointPool {
    pub fn new(
        network: NetworkConfig,
        endpoints: Vec<Arc<dyn ChainRpc>>,
        policy: RetryPolicy,
    ) -> Result<Self, ChainError> {
        if endpoints.is_empty() {
            return Err(ChainError::InvalidRpcUrl(format!(
                "no endpoints configured for {}",
                network.name
            )));
        }
        let health = vec![EndpointHealth::Healthy; endpoints.len()];
        Ok(Self {
            network,
            endpoints,
            policy: RetryPolicy {
                max_attempts: policy.max_attempts.max(1),
                ..policy
            },
            state: Mutex::new(PoolState { cursor: 0, health }),
        })
    }

    /// Build a pool from the network's URL list.
    pub fn connect(
        network: NetworkConfig,
        connector: &dyn RpcConnector,
        policy: RetryPolicy,
    ) -> Result<Self, ChainError> {
        let endpoints = network
            .rpc_urls
            .iter()
            .map(|url| connector.connect(url))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(network, endpoints, policy)
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.network.chain_id
    }

    /// Endpoint URLs with their current health.
    pub fn health(&self) -> Vec<(String, EndpointHealth)> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.endpoints
            .iter()
            .zip(state.health.iter())
            .map(|(rpc, health)| (rpc.url().to_string(), *health))
            .collect()
    }

    pub fn is_exhausted(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.health.iter().all(|h| *h == EndpointHealth::Exhausted)
    }

    fn current(&self) -> (usize, Arc<dyn ChainRpc>) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        (state.cursor, Arc::clone(&self.endpoints[state.cursor]))
    }

    fn record_success(&self, index: usize) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.health[index] = EndpointHealth::Healthy;
    }

    fn record_failure(&self, index: usize) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.health[index] = state.health[index].after_failure();

        // Only move the cursor if no concurrent call has already moved it
        if state.cursor != index {
            return;
        }
        let len = self.endpoints.len();
        let next = (1..=len)
            .map(|step| (index + step) % len)
            .find(|i| state.health[*i] != EndpointHealth::Exhausted)
            .unwrap_or((index + 1) % len);
        state.cursor = next;
    }

    /// Run `op` against the current endpoint, failing over on transport
    /// errors for at most `max_attempts` tries.
    pub async fn retry_with_failover<T, F, Fut>(
        &self,
        operation: &str,
        mut op: F,
    ) -> Result<T, ChainError>
    where
        F: FnMut(Arc<dyn ChainRpc>) -> Fut,
        Fut: Future<Output = Result<T, RpcFailure>>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let (index, rpc) = self.current();

            match op(Arc::clone(&rpc)).await {
                Ok(value) => {
                    self.record_success(index);
                    return Ok(value);
                }
                Err(RpcFailure::Rejected(message)) => {
                    self.record_success(index);
                    tracing::debug!(
                        network = %self.network.name,
                        operation,
                        error = %message,
                        "RPC call rejected"
                    );
                    return Err(ChainError::Rejected(message));
                }
                Err(RpcFailure::Transport(message)) => {
                    tracing::warn!(
                        network = %self.network.name,
                        endpoint = %rpc.url(),
                        operation,
                        attempt,
                        error = %message,
                        "RPC call failed"
                    );
                    self.record_failure(index);
                    last_error = message;

                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.backoff * attempt).await;
                    }
                }
            }
        }

        tracing::warn!(
            network = %self.network.name,
            chain_id = self.network.chain_id,
            operation,
            attempts = max_attempts,
            "All RPC attempts failed"
        );

        Err(ChainError::Network {
            chain_id: self.network.chain_id,
            attempts: max_attempts,
            message: last_error,
        })
    }
}
