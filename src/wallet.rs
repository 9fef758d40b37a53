//! Wallet facade
//!
//! Bundles a ledger client, a network and transaction options, and exposes
//! the account, trustline and signer helpers. Each helper builds an
//! operation, optionally brackets it with a reserve sponsorship and assembles
//! an unsigned transaction for the source account.

use crate::address::Address;
use crate::amount::Amount;
use crate::asset::Asset;
use crate::config::WalletConfig;
use crate::horizon::{HorizonClient, LedgerClient, SubmitResponse};
use crate::keypair::AccountKeypair;
use crate::network::Network;
use crate::operation::{self, Operation};
use crate::sponsorship::Sponsorship;
use crate::transaction::{assemble_transaction, SignedTransaction, Transaction, TransactionOptions};
use crate::Result;

pub struct Wallet<C: LedgerClient = HorizonClient> {
    client: C,
    network: Network,
    options: TransactionOptions,
}

impl Wallet<HorizonClient> {
    /// Connect to the Horizon endpoint named in `config`
    pub fn new(config: &WalletConfig) -> Result<Self> {
        let client = HorizonClient::new(&config.horizon_url)?;
        log::info!(
            "Wallet on '{}' via {}",
            config.network,
            client.base_url()
        );

        Ok(Self {
            client,
            network: config.network.clone(),
            options: TransactionOptions {
                timeout: config.tx_timeout,
            },
        })
    }
}

impl<C: LedgerClient> Wallet<C> {
    /// Use any ledger client, e.g. an in-process fake
    pub fn with_client(client: C, network: Network, options: TransactionOptions) -> Self {
        Self {
            client,
            network,
            options,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Generate a fresh keypair; nothing touches the ledger
    pub fn create(&self) -> AccountKeypair {
        AccountKeypair::random()
    }

    /// Create (activate) `destination`, paid by `source`
    ///
    /// Unsponsored accounts need a starting balance of at least 1. Sponsored
    /// accounts always start at 0; the sponsor covers the reserve.
    pub fn fund(
        &self,
        source: &Address,
        destination: &Address,
        starting_balance: &str,
        sponsorship: Sponsorship,
    ) -> Result<Transaction> {
        let create = if sponsorship.is_sponsored() {
            operation::create_account(source, destination, &Amount::ZERO.to_string())?
        } else {
            operation::create_unsponsored_account(source, destination, starting_balance)?
        };

        let operations = sponsorship.apply(destination, create);
        self.assemble(source, operations)
    }

    /// Add (or update) a trustline; `limit` defaults to the maximum amount
    pub fn add_asset_support(
        &self,
        source: &Address,
        asset: &Asset,
        limit: Option<&str>,
        sponsorship: Sponsorship,
    ) -> Result<Transaction> {
        let max_limit = Amount::MAX.to_string();
        let limit = limit.unwrap_or(&max_limit);
        let change_trust = operation::change_trust(source, asset, limit)?;

        let operations = sponsorship.apply(source, change_trust);
        self.assemble(source, operations)
    }

    /// Remove a trustline: a change-trust with limit 0
    pub fn remove_asset_support(&self, source: &Address, asset: &Asset) -> Result<Transaction> {
        self.add_asset_support(source, asset, Some("0"), Sponsorship::Unsponsored)
    }

    /// Add (or reweight) a signer on `source`
    pub fn add_account_signer(
        &self,
        source: &Address,
        signer: &Address,
        weight: u32,
        sponsorship: Sponsorship,
    ) -> Result<Transaction> {
        signer.public_key_bytes()?;
        let add_signer = operation::set_signer(source, signer, weight);

        let operations = sponsorship.apply(source, add_signer);
        self.assemble(source, operations)
    }

    /// Remove a signer: weight 0
    pub fn remove_account_signer(&self, source: &Address, signer: &Address) -> Result<Transaction> {
        self.add_account_signer(source, signer, 0, Sponsorship::Unsponsored)
    }

    /// Submit a signed transaction; no retries
    pub fn submit_transaction(&self, tx: &SignedTransaction) -> Result<SubmitResponse> {
        self.client.submit(tx)
    }

    fn assemble(&self, source: &Address, operations: Vec<Operation>) -> Result<Transaction> {
        assemble_transaction(&self.client, &self.network, source, operations, &self.options)
    }
}
