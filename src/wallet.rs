// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet service: the operations a front-end calls.
//!
//! Ties the [`KeyVault`], the [`ChainClient`] and the unlock session together.
//! Vault work (PBKDF2 with hundreds of thousands of rounds) runs on the
//! blocking pool so chain I/O on the runtime is never starved.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash};
use zeroize::Zeroizing;

use crate::blockchain::transactions::{parse_address, parse_amount, token_transfer_request};
use crate::blockchain::{
    ChainClient, ChainError, NetworkConfig, NetworkQuote, NetworkStatus, PendingTransaction,
    TokenBalance, TokenInfo, TxRequest, TxStatus,
};
use crate::storage::AccountSummary;
use crate::vault::{
    DerivationScheme, KeyVault, MnemonicPhrase, SessionManager, SessionToken, VaultError,
};

/// Where an imported wallet comes from.
pub enum ImportSource {
    Mnemonic {
        phrase: Zeroizing<String>,
        scheme: DerivationScheme,
    },
    PrivateKey(Zeroizing<String>),
}

/// How an operation on an account's key is authorised.
pub enum AccountAuth {
    Password(Zeroizing<String>),
    /// Token from a prior [`WalletService::unlock`]
    Session(String),
}

/// Transfer parameters as entered by the user.
#[derive(Debug, Clone)]
pub struct TransferParams {
    pub to: String,
    /// Human-readable amount (e.g. "0.25")
    pub amount: String,
    /// ERC-20 contract; `None` sends the native asset
    pub token: Option<String>,
    /// Optional calldata for native sends
    pub data: Option<Bytes>,
}

enum Transfer {
    Native(TxRequest),
    Token { token: Address, to: Address },
}

/// A freshly generated wallet. `mnemonic` must be shown once, then dropped.
#[derive(Debug)]
pub struct CreatedWallet {
    pub mnemonic: MnemonicPhrase,
    pub account: AccountSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Session expired or not valid for this account")]
    SessionInvalid,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub struct WalletService {
    vault: Arc<KeyVault>,
    chain: ChainClient,
    sessions: SessionManager,
}

impl WalletService {
    pub fn new(vault: Arc<KeyVault>, chain: ChainClient, sessions: SessionManager) -> Self {
        Self {
            vault,
            chain,
            sessions,
        }
    }

    pub fn chain(&self) -> &ChainClient {
        &self.chain
    }

    async fn with_vault<T, F>(&self, f: F) -> Result<T, WalletError>
    where
        F: FnOnce(&KeyVault) -> Result<T, VaultError> + Send + 'static,
        T: Send + 'static,
    {
        let vault = Arc::clone(&self.vault);
        tokio::task::spawn_blocking(move || f(&vault))
            .await
            .map_err(|e| WalletError::Internal(format!("vault task failed: {e}")))?
            .map_err(WalletError::from)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn create_wallet(
        &self,
        name: String,
        password: Zeroizing<String>,
    ) -> Result<CreatedWallet, WalletError> {
        let generated = self
            .with_vault(move |vault| vault.generate(&name, &password))
            .await?;
        Ok(CreatedWallet {
            mnemonic: generated.mnemonic,
            account: generated.account,
        })
    }

    pub async fn import_wallet(
        &self,
        source: ImportSource,
        name: String,
        password: Zeroizing<String>,
    ) -> Result<AccountSummary, WalletError> {
        self.with_vault(move |vault| match source {
            ImportSource::Mnemonic { phrase, scheme } => {
                vault.import_from_mnemonic(&phrase, &name, &password, scheme)
            }
            ImportSource::PrivateKey(key) => vault.import_from_private_key(&key, &name, &password),
        })
        .await
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>, WalletError> {
        self.with_vault(|vault| vault.list_accounts()).await
    }

    /// Delete an account once `auth` proves control of it; an open session
    /// for it ends immediately.
    pub async fn remove_account(
        &self,
        account_id: String,
        auth: AccountAuth,
    ) -> Result<AccountSummary, WalletError> {
        let password = self.password_for(&account_id, auth)?;
        let removed = self
            .with_vault(move |vault| vault.remove_account(&account_id, &password))
            .await?;
        self.sessions.invalidate_account(&removed.id);
        Ok(removed)
    }

    pub async fn derive_next_account(
        &self,
        source_account_id: String,
        password: Zeroizing<String>,
        name: String,
    ) -> Result<AccountSummary, WalletError> {
        self.with_vault(move |vault| {
            vault.derive_next_account(&source_account_id, &password, &name)
        })
        .await
    }

    pub async fn change_password(
        &self,
        account_id: String,
        old_password: Zeroizing<String>,
        new_password: Zeroizing<String>,
    ) -> Result<(), WalletError> {
        let id = account_id.clone();
        self.with_vault(move |vault| vault.change_password(&id, &old_password, &new_password))
            .await?;
        self.sessions.invalidate_account(&account_id);
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Verify `password` and open a time-boxed signing session.
    pub async fn unlock(
        &self,
        account_id: String,
        password: Zeroizing<String>,
    ) -> Result<SessionToken, WalletError> {
        let checked = password.clone();
        let account = self
            .with_vault(move |vault| vault.verify_password(&account_id, &checked))
            .await?;
        Ok(self.sessions.open(&account.id, &password))
    }

    pub fn lock(&self) {
        self.sessions.invalidate();
    }

    fn password_for(
        &self,
        account_id: &str,
        auth: AccountAuth,
    ) -> Result<Zeroizing<String>, WalletError> {
        match auth {
            AccountAuth::Password(password) => Ok(password),
            AccountAuth::Session(token) => self
                .sessions
                .password_for(&token, account_id)
                .ok_or(WalletError::SessionInvalid),
        }
    }

    pub fn active_session_account(&self) -> Option<String> {
        self.sessions.active_account()
    }

    // =========================================================================
    // Chain reads
    // =========================================================================

    /// Native balance of `address`; `chain_id` defaults to the active network.
    pub async fn get_balance(
        &self,
        address: &str,
        chain_id: Option<u64>,
    ) -> Result<TokenBalance, WalletError> {
        let chain_id = match chain_id {
            Some(id) => id,
            None => self.chain.network().await.chain_id,
        };
        Ok(self.chain.get_native_balance(address, chain_id).await?)
    }

    pub async fn get_token_info(&self, token: &str) -> Result<TokenInfo, WalletError> {
        let token = parse_address(token, "token")?;
        Ok(self.chain.get_token_info(token).await?)
    }

    /// Balances for `tokens`; tokens whose reads fail are omitted.
    pub async fn token_balances(
        &self,
        owner: &str,
        tokens: &[String],
    ) -> Result<Vec<TokenBalance>, WalletError> {
        let owner = parse_address(owner, "owner")?;
        let tokens = tokens
            .iter()
            .map(|t| parse_address(t, "token"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.chain.get_multiple_token_balances(owner, &tokens).await)
    }

    pub async fn estimate_fee(
        &self,
        from: Option<&str>,
        params: &TransferParams,
    ) -> Result<NetworkQuote, WalletError> {
        let mut request = self.build_request(params).await?;
        if let Some(from) = from {
            request = request.with_from(parse_address(from, "sender")?);
        }
        Ok(self.chain.estimate_gas(&request).await?)
    }

    pub async fn transaction_status(&self, hash: &str) -> Result<TxStatus, WalletError> {
        let hash: TxHash = hash
            .trim()
            .parse()
            .map_err(|_| WalletError::InvalidInput(format!("Invalid transaction hash: {hash}")))?;
        Ok(self.chain.transaction_status(hash).await?)
    }

    async fn build_request(&self, params: &TransferParams) -> Result<TxRequest, WalletError> {
        let to = parse_address(&params.to, "recipient")?;
        match &params.token {
            Some(token) => {
                let token = parse_address(token, "token")?;
                let info = self.chain.get_token_info(token).await?;
                let amount = parse_amount(&params.amount, info.decimals)?;
                Ok(token_transfer_request(token, to, amount))
            }
            None => {
                let decimals = self.chain.network().await.native_decimals;
                let mut request = TxRequest::native(to, parse_amount(&params.amount, decimals)?);
                request.data = params.data.clone();
                Ok(request)
            }
        }
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Sign and broadcast a transfer from `account_id`.
    ///
    /// The transfer is bound to the network active when the call starts; a
    /// switch that lands while the key is being decrypted fails the send with
    /// `ChainError::NetworkChanged`. The decrypted key exists only for the
    /// duration of this call.
    pub async fn send(
        &self,
        account_id: String,
        auth: AccountAuth,
        params: TransferParams,
    ) -> Result<PendingTransaction, WalletError> {
        let chain_id = self.chain.network().await.chain_id;
        let password = self.password_for(&account_id, auth)?;

        // Validate inputs before paying for key derivation
        let transfer = match params.token.as_deref() {
            Some(token) => Transfer::Token {
                token: parse_address(token, "token")?,
                to: parse_address(&params.to, "recipient")?,
            },
            None => Transfer::Native(self.build_request(&params).await?),
        };

        let signer = self
            .with_vault(move |vault| vault.get_private_key_for_signing(&account_id, &password))
            .await?;

        let pending = match transfer {
            Transfer::Token { token, to } => {
                self.chain
                    .send_token_transfer(token, to, &params.amount, signer, Some(chain_id))
                    .await?
            }
            Transfer::Native(request) => {
                self.chain
                    .send_transaction(request, signer, Some(chain_id))
                    .await?
            }
        };
        Ok(pending)
    }

    // =========================================================================
    // Networks
    // =========================================================================

    pub fn networks(&self) -> Vec<NetworkConfig> {
        self.chain.networks()
    }

    pub async fn network_status(&self) -> NetworkStatus {
        self.chain.network_status().await
    }

    pub async fn switch_network(&self, chain_id: u64) -> Result<bool, WalletError> {
        Ok(self.chain.switch_network(chain_id).await?)
    }
}

/// Parse a list of token addresses, e.g. from a query string.
pub fn parse_token_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use alloy::primitives::U256;

    use super::*;
    use crate::blockchain::mock::{MockConnector, MockRpc};
    use crate::blockchain::{ChainClientSettings, ReceiptSummary, RetryPolicy};
    use crate::storage::{AccountRegistry, InMemoryStore};
    use crate::vault::VaultFormat;

    pub(crate) const PHRASE: &str = "test test test test test test test test test test test junk";
    pub(crate) const ADDRESS_0: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    pub(crate) const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    pub(crate) const PASSWORD: &str = "correct horse";

    pub(crate) fn secret(value: &str) -> Zeroizing<String> {
        Zeroizing::new(value.to_string())
    }

    /// Service over an in-memory store and a mock network (chain id 1111).
    pub(crate) fn service() -> (WalletService, Arc<MockRpc>) {
        let mock = MockRpc::new("http://mock", 1111);
        let service = service_on(
            vec![NetworkConfig::new(
                "Mocknet",
                1111,
                "ETH",
                &["http://mock"],
                "https://explorer.test",
            )],
            &[&mock],
        );
        (service, mock)
    }

    /// Service on 1111 ("http://old") with 2222 ("http://new") available.
    fn two_network_service() -> (WalletService, Arc<MockRpc>, Arc<MockRpc>) {
        let old = MockRpc::new("http://old", 1111);
        let new = MockRpc::new("http://new", 2222);
        let service = service_on(
            vec![
                NetworkConfig::new("Old", 1111, "ETH", &["http://old"], "https://old.test"),
                NetworkConfig::new("New", 2222, "ETH", &["http://new"], "https://new.test"),
            ],
            &[&old, &new],
        );
        (service, old, new)
    }

    fn service_on(networks: Vec<NetworkConfig>, mocks: &[&Arc<MockRpc>]) -> WalletService {
        let registry = Arc::new(AccountRegistry::new(Arc::new(InMemoryStore::new())));
        // Legacy iteration count keeps the tests quick
        let vault = Arc::new(KeyVault::with_format(registry, VaultFormat::V1));
        let chain = ChainClient::new(
            networks,
            1111,
            MockConnector::with(mocks),
            ChainClientSettings {
                retry: RetryPolicy {
                    max_attempts: 2,
                    backoff: Duration::from_millis(10),
                },
                confirmation_timeout: Duration::from_secs(10),
                poll_interval: Duration::from_millis(100),
            },
        )
        .unwrap();
        WalletService::new(vault, chain, SessionManager::default())
    }

    pub(crate) async fn import(service: &WalletService) -> AccountSummary {
        service
            .import_wallet(
                ImportSource::Mnemonic {
                    phrase: secret(PHRASE),
                    scheme: DerivationScheme::AddressIndex,
                },
                "Main".to_string(),
                secret(PASSWORD),
            )
            .await
            .unwrap()
    }

    fn transfer(amount: &str) -> TransferParams {
        TransferParams {
            to: RECIPIENT.to_string(),
            amount: amount.to_string(),
            token: None,
            data: None,
        }
    }

    fn fund(mock: &MockRpc) {
        mock.set_balance(ADDRESS_0.parse().unwrap(), U256::from(10u64).pow(U256::from(18u64)));
        mock.set_receipt(Some(ReceiptSummary {
            block_number: Some(7),
            gas_used: 21_000,
            success: true,
        }));
    }

    #[tokio::test]
    async fn create_and_list() {
        let (service, _) = service();
        let created = service
            .create_wallet("Fresh".to_string(), secret(PASSWORD))
            .await
            .unwrap();
        assert_eq!(created.mnemonic.word_count(), 12);

        let accounts = service.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, created.account.address);
    }

    #[tokio::test]
    async fn import_both_sources() {
        let (service, _) = service();
        let account = import(&service).await;
        assert_eq!(account.address, ADDRESS_0);

        let key = service
            .import_wallet(
                ImportSource::PrivateKey(secret(
                    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
                )),
                "Key".to_string(),
                secret(PASSWORD),
            )
            .await
            .unwrap();
        assert_eq!(key.address, RECIPIENT);
    }

    #[tokio::test]
    async fn send_with_password() {
        let (service, mock) = service();
        let account = import(&service).await;
        fund(&mock);

        let pending = service
            .send(account.id, AccountAuth::Password(secret(PASSWORD)), transfer("0.01"))
            .await
            .unwrap();
        assert_eq!(pending.status, TxStatus::Success);
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn switch_during_unlock_fails_the_send() {
        let (service, old, new) = two_network_service();
        let service = Arc::new(service);
        let account = import(&service).await;
        fund(&old);
        fund(&new);

        let sender = Arc::clone(&service);
        let send = tokio::spawn(async move {
            sender
                .send(account.id, AccountAuth::Password(secret(PASSWORD)), transfer("0.01"))
                .await
        });

        // Let the send bind its network and park on key decryption
        tokio::task::yield_now().await;
        assert!(service.switch_network(2222).await.unwrap());

        let result = send.await.unwrap();
        assert!(matches!(
            result,
            Err(WalletError::Chain(ChainError::NetworkChanged {
                expected: 1111,
                active: 2222
            }))
        ));
        assert!(old.sent().is_empty());
        assert!(new.sent().is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_uniform_failure() {
        let (service, mock) = service();
        let account = import(&service).await;
        fund(&mock);

        let result = service
            .send(
                account.id,
                AccountAuth::Password(secret("wrong password")),
                transfer("0.01"),
            )
            .await;
        assert!(matches!(
            result,
            Err(WalletError::Vault(VaultError::DecryptionFailed))
        ));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_before_unlock() {
        let (service, _) = service();
        let account = import(&service).await;

        let mut params = transfer("1");
        params.to = "0x1234".to_string();
        let result = service
            .send(account.id, AccountAuth::Password(secret("wrong password")), params)
            .await;
        assert!(matches!(
            result,
            Err(WalletError::Chain(ChainError::InvalidAddress(_)))
        ));
    }

    #[tokio::test]
    async fn session_authorises_sends_until_locked() {
        let (service, mock) = service();
        let account = import(&service).await;
        fund(&mock);

        let session = service
            .unlock(account.id.clone(), secret(PASSWORD))
            .await
            .unwrap();
        assert_eq!(service.active_session_account(), Some(account.id.clone()));

        service
            .send(
                account.id.clone(),
                AccountAuth::Session(session.token.clone()),
                transfer("0.01"),
            )
            .await
            .unwrap();

        service.lock();
        let result = service
            .send(account.id, AccountAuth::Session(session.token), transfer("0.01"))
            .await;
        assert!(matches!(result, Err(WalletError::SessionInvalid)));
    }

    #[tokio::test]
    async fn session_is_bound_to_its_account() {
        let (service, _) = service();
        let account = import(&service).await;
        let other = service
            .derive_next_account(account.id.clone(), secret(PASSWORD), "Second".to_string())
            .await
            .unwrap();
        assert_eq!(other.derivation_index, Some(1));
        assert_eq!(other.address, RECIPIENT);

        let session = service.unlock(account.id, secret(PASSWORD)).await.unwrap();
        let result = service
            .send(other.id, AccountAuth::Session(session.token), transfer("0.01"))
            .await;
        assert!(matches!(result, Err(WalletError::SessionInvalid)));
    }

    #[tokio::test]
    async fn unlock_with_wrong_password_opens_no_session() {
        let (service, _) = service();
        let account = import(&service).await;

        assert!(service
            .unlock(account.id, secret("not the password"))
            .await
            .is_err());
        assert_eq!(service.active_session_account(), None);
    }

    #[tokio::test]
    async fn password_change_and_removal_end_sessions() {
        let (service, _) = service();
        let account = import(&service).await;

        service
            .unlock(account.id.clone(), secret(PASSWORD))
            .await
            .unwrap();
        service
            .change_password(account.id.clone(), secret(PASSWORD), secret("battery staple"))
            .await
            .unwrap();
        assert_eq!(service.active_session_account(), None);

        assert!(matches!(
            service
                .remove_account(account.id.clone(), AccountAuth::Password(secret(PASSWORD)))
                .await,
            Err(WalletError::Vault(VaultError::DecryptionFailed))
        ));
        assert_eq!(service.list_accounts().await.unwrap().len(), 1);

        let session = service
            .unlock(account.id.clone(), secret("battery staple"))
            .await
            .unwrap();
        service
            .remove_account(account.id, AccountAuth::Session(session.token))
            .await
            .unwrap();
        assert_eq!(service.active_session_account(), None);
        assert!(service.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn balance_defaults_to_active_network() {
        let (service, mock) = service();
        fund(&mock);

        let balance = service.get_balance(ADDRESS_0, None).await.unwrap();
        assert_eq!(balance.balance_formatted, "1");
        assert_eq!(balance.symbol, "ETH");
        assert!(matches!(
            service.get_balance(ADDRESS_0, Some(77)).await,
            Err(WalletError::Chain(ChainError::UnknownNetwork(77)))
        ));
    }

    #[tokio::test]
    async fn estimate_fee_for_native_transfer() {
        let (service, _) = service();
        let quote = service
            .estimate_fee(Some(ADDRESS_0), &transfer("0.5"))
            .await
            .unwrap();
        assert_eq!(quote.quote.gas_limit, 21_000);
        assert_eq!(quote.network.chain_id, 1111);

        assert!(matches!(
            service.estimate_fee(None, &transfer("0")).await,
            Err(WalletError::Chain(ChainError::InvalidAmount(_)))
        ));
    }

    #[test]
    fn token_list_parsing() {
        assert_eq!(parse_token_list(" 0xa, ,0xb "), vec!["0xa", "0xb"]);
        assert!(parse_token_list("").is_empty());
    }
}
