//! Common test utilities for wallet integration tests
//!
//! This module provides shared test infrastructure including:
//! - A Horizon mock server on an ephemeral port, backed by an in-memory ledger
//! - Deterministic account keypairs seeded on that ledger
//! - Test-side signing (the library itself never signs)

#![allow(dead_code)]

use ed25519_dalek::{Signer, SigningKey};
use horizon_mock::{spawn_background, MockLedger};
use std::sync::Arc;
use stellar_wallet::{
    AccountKeypair, DecoratedSignature, Network, SignatureHint, SignedTransaction, Transaction,
    Wallet, WalletConfig,
};

/// 10,000 units in stroops
pub const START_BALANCE: i64 = 100_000_000_000;

pub fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

/// Mock Horizon plus a wallet pointed at it
pub struct TestEnvironment {
    pub ledger: Arc<MockLedger>,
    pub horizon_url: String,
    pub network: Network,
    pub wallet: Wallet,
}

impl TestEnvironment {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(|config| config)
    }

    /// Mock on testnet; `adjust` may change the wallet's view (network, timeout)
    pub fn with_config(adjust: impl FnOnce(WalletConfig) -> WalletConfig) -> anyhow::Result<Self> {
        init_logging();

        let network = Network::testnet();
        let ledger = Arc::new(MockLedger::new(network.passphrase()));
        let addr = spawn_background(ledger.clone())?;
        let horizon_url = format!("http://{}", addr);
        log::info!("Mock Horizon: {}", horizon_url);

        let config = adjust(WalletConfig::new(horizon_url.clone(), network.clone()));
        let wallet = Wallet::new(&config)?;

        Ok(Self {
            ledger,
            horizon_url,
            network,
            wallet,
        })
    }

    /// Deterministic keypair seeded on the ledger with `balance` stroops
    pub fn account_with_balance(
        &self,
        seed: u8,
        balance: i64,
        sequence: i64,
    ) -> anyhow::Result<AccountKeypair> {
        let keypair = AccountKeypair::from_seed([seed; 32]);
        self.ledger
            .create_account(keypair.public_key.as_str(), balance, sequence)?;
        Ok(keypair)
    }

    pub fn funded_account(&self, seed: u8, sequence: i64) -> anyhow::Result<AccountKeypair> {
        self.account_with_balance(seed, START_BALANCE, sequence)
    }

    pub fn sequence_of(&self, keypair: &AccountKeypair) -> Option<i64> {
        self.ledger
            .account(keypair.public_key.as_str())
            .map(|account| account.sequence)
    }
}

/// Ed25519 signature over `hash`, decorated with the key hint
pub fn decorated_signature(
    keypair: &AccountKeypair,
    hash: &[u8; 32],
) -> anyhow::Result<DecoratedSignature> {
    let signing_key = SigningKey::from_bytes(&keypair.seed()?);
    let public_key = signing_key.verifying_key().to_bytes();
    let signature = signing_key.sign(hash).to_bytes();

    let mut hint = [0u8; 4];
    hint.copy_from_slice(&public_key[28..]);

    Ok(DecoratedSignature {
        hint: SignatureHint(hint),
        signature: stellar_wallet::Signature(signature.to_vec().try_into()?),
    })
}

/// Sign `tx` with every keypair given
pub fn sign(tx: &Transaction, signers: &[&AccountKeypair]) -> anyhow::Result<SignedTransaction> {
    let hash = tx.hash()?;
    let signatures = signers
        .iter()
        .map(|keypair| decorated_signature(keypair, &hash))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(tx.clone().into_signed(signatures)?)
}
