// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::origin::OriginPolicy;
use crate::blockchain::{ChainClient, ChainError, HttpConnector};
use crate::config::WalletConfig;
use crate::storage::{AccountRegistry, FileStore, StorageError, StoragePaths};
use crate::vault::{KeyVault, SessionManager};
use crate::wallet::WalletService;

#[derive(Clone)]
pub struct AppState {
    pub wallet: Arc<WalletService>,
    /// Store root, reported by the health check
    pub data_dir: Option<PathBuf>,
    /// Browser origins allowed to call the API
    pub origins: OriginPolicy,
}

impl AppState {
    pub fn new(wallet: WalletService) -> Self {
        Self {
            wallet: Arc::new(wallet),
            data_dir: None,
            origins: OriginPolicy::default(),
        }
    }

    /// Wire the file-backed store, the vault and HTTP endpoints from `config`.
    pub fn from_config(config: &WalletConfig) -> Result<Self, StateError> {
        let store = FileStore::open(StoragePaths::new(&config.data_dir))?;
        let registry = Arc::new(AccountRegistry::new(Arc::new(store)));
        let chain = ChainClient::new(
            config.networks.clone(),
            config.default_chain_id,
            Arc::new(HttpConnector),
            config.chain,
        )?;
        let wallet = WalletService::new(
            Arc::new(KeyVault::new(registry)),
            chain,
            SessionManager::new(config.session_ttl),
        );

        Ok(Self {
            wallet: Arc::new(wallet),
            data_dir: Some(config.data_dir.clone()),
            origins: OriginPolicy::new(&config.allowed_origins),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Chain client initialization failed: {0}")]
    Chain(#[from] ChainError),
}
