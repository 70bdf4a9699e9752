// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Wallet Core - Self-Custodial Key Vault and EVM Chain Client
//!
//! Keys are generated and imported locally, encrypted under a user password
//! and only decrypted for the duration of a single signing call. Chain access
//! goes through an ordered pool of RPC endpoints per network with automatic
//! failover.
//!
//! ## Modules
//!
//! - `vault` - Mnemonics, HD derivation, encrypted vault entries, sessions
//! - `blockchain` - EVM client: balances, fees, sending, ERC-20, failover
//! - `storage` - Key/value stores and the account registry
//! - `wallet` - Service facade combining vault, chain client and session
//! - `api` - Local HTTP daemon handlers (Axum)

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod vault;
pub mod wallet;
