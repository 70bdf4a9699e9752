// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory endpoint used by the chain tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::{
    primitives::{keccak256, Address, Bytes, TxHash, U256},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use tokio::sync::Notify;

use super::client::ChainError;
use super::rpc::{ChainRpc, RpcConnector, RpcFailure};
use super::types::ReceiptSummary;

pub const GWEI: u128 = 1_000_000_000;

struct SendGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

struct MockState {
    failing: bool,
    balances: HashMap<Address, U256>,
    base_fee: Option<u128>,
    gas_price: u128,
    priority_fee: Result<u128, RpcFailure>,
    gas_estimate: Result<u64, RpcFailure>,
    nonces: HashMap<Address, u64>,
    contract_calls: HashMap<(Address, [u8; 4]), Result<Bytes, RpcFailure>>,
    send_rejection: Option<String>,
    sent: Vec<Vec<u8>>,
    receipt: Option<ReceiptSummary>,
}

pub struct MockRpc {
    url: String,
    chain_id: u64,
    calls: AtomicUsize,
    state: Mutex<MockState>,
    gate: Mutex<Option<SendGate>>,
}

impl MockRpc {
    /// Healthy EIP-1559 endpoint: 10 gwei base fee, 2 gwei tip, 21k gas.
    pub fn new(url: &str, chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            chain_id,
            calls: AtomicUsize::new(0),
            state: Mutex::new(MockState {
                failing: false,
                balances: HashMap::new(),
                base_fee: Some(10 * GWEI),
                gas_price: 20 * GWEI,
                priority_fee: Ok(2 * GWEI),
                gas_estimate: Ok(21_000),
                nonces: HashMap::new(),
                contract_calls: HashMap::new(),
                send_rejection: None,
                sent: Vec::new(),
                receipt: None,
            }),
            gate: Mutex::new(None),
        })
    }

    pub fn failing(self: Arc<Self>) -> Arc<Self> {
        self.set_failing(true);
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_failing(&self, failing: bool) {
        self.with_state(|s| s.failing = failing);
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.with_state(|s| {
            s.balances.insert(address, balance);
        });
    }

    pub fn set_base_fee(&self, base_fee: Option<u128>) {
        self.with_state(|s| s.base_fee = base_fee);
    }

    pub fn set_gas_price(&self, gas_price: u128) {
        self.with_state(|s| s.gas_price = gas_price);
    }

    pub fn set_priority_fee(&self, fee: Result<u128, RpcFailure>) {
        self.with_state(|s| s.priority_fee = fee);
    }

    pub fn set_gas_estimate(&self, estimate: Result<u64, RpcFailure>) {
        self.with_state(|s| s.gas_estimate = estimate);
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.with_state(|s| {
            s.nonces.insert(address, nonce);
        });
    }

    /// Answer `eth_call`s to `contract` starting with `selector`.
    pub fn set_contract_call(
        &self,
        contract: Address,
        selector: [u8; 4],
        result: Result<Bytes, RpcFailure>,
    ) {
        self.with_state(|s| {
            s.contract_calls.insert((contract, selector), result);
        });
    }

    pub fn reject_sends(&self, message: &str) {
        self.with_state(|s| s.send_rejection = Some(message.to_string()));
    }

    /// Receipt returned for every hash once something was broadcast.
    pub fn set_receipt(&self, receipt: Option<ReceiptSummary>) {
        self.with_state(|s| s.receipt = receipt);
    }

    /// Block `send_raw` until `release` is notified; `entered` fires when a
    /// send reaches the gate.
    pub fn gate_sends(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(SendGate {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        });
        (entered, release)
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.with_state(|s| s.sent.clone())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), RpcFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.with_state(|s| s.failing) {
            Err(RpcFailure::Transport(format!("{} unreachable", self.url)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    fn url(&self) -> &str {
        &self.url
    }

    async fn chain_id(&self) -> Result<u64, RpcFailure> {
        self.enter()?;
        Ok(self.chain_id)
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcFailure> {
        self.enter()?;
        Ok(self.with_state(|s| s.balances.get(&address).copied().unwrap_or_default()))
    }

    async fn base_fee(&self) -> Result<Option<u128>, RpcFailure> {
        self.enter()?;
        Ok(self.with_state(|s| s.base_fee))
    }

    async fn gas_price(&self) -> Result<u128, RpcFailure> {
        self.enter()?;
        Ok(self.with_state(|s| s.gas_price))
    }

    async fn max_priority_fee(&self) -> Result<u128, RpcFailure> {
        self.enter()?;
        self.with_state(|s| s.priority_fee.clone())
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64, RpcFailure> {
        self.enter()?;
        self.with_state(|s| s.gas_estimate.clone())
    }

    async fn nonce(&self, address: Address) -> Result<u64, RpcFailure> {
        self.enter()?;
        Ok(self.with_state(|s| s.nonces.get(&address).copied().unwrap_or_default()))
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, RpcFailure> {
        self.enter()?;
        let contract = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();
        let mut selector = [0u8; 4];
        if input.len() >= 4 {
            selector.copy_from_slice(&input[..4]);
        }
        self.with_state(|s| {
            s.contract_calls
                .get(&(contract, selector))
                .cloned()
                .unwrap_or_else(|| Err(RpcFailure::Rejected("execution reverted".to_string())))
        })
    }

    async fn send_raw(&self, raw: &[u8]) -> Result<TxHash, RpcFailure> {
        self.enter()?;

        let gate = self
            .gate
            .lock()
            .unwrap()
            .as_ref()
            .map(|g| (Arc::clone(&g.entered), Arc::clone(&g.release)));
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }

        self.with_state(|s| {
            if let Some(message) = &s.send_rejection {
                return Err(RpcFailure::Rejected(message.clone()));
            }
            s.sent.push(raw.to_vec());
            Ok(keccak256(raw))
        })
    }

    async fn receipt(&self, _hash: TxHash) -> Result<Option<ReceiptSummary>, RpcFailure> {
        self.enter()?;
        Ok(self.with_state(|s| if s.sent.is_empty() { None } else { s.receipt }))
    }
}

/// Resolves URLs to pre-registered mocks.
#[derive(Default)]
pub struct MockConnector {
    endpoints: HashMap<String, Arc<MockRpc>>,
}

impl MockConnector {
    pub fn with(mocks: &[&Arc<MockRpc>]) -> Arc<Self> {
        Arc::new(Self {
            endpoints: mocks
                .iter()
                .map(|m| (m.url.clone(), Arc::clone(m)))
                .collect(),
        })
    }
}

impl RpcConnector for MockConnector {
    fn connect(&self, url: &str) -> Result<Arc<dyn ChainRpc>, ChainError> {
        self.endpoints
            .get(url)
            .map(|m| Arc::clone(m) as Arc<dyn ChainRpc>)
            .ok_or_else(|| ChainError::InvalidRpcUrl(format!("no mock for {url}")))
    }
}
