//! Stellar Wallet: account, trustline and signer transactions
//!
//! This crate builds unsigned Stellar transactions for the common wallet
//! chores (activating an account, adding or removing a trustline, adding or
//! removing a signer), optionally letting a third-party sponsor pay the
//! minimum-balance reserve, and submits externally signed envelopes to
//! Horizon.
//!
//! # Architecture
//!
//! - **Operation factory** ([`operation`]): typed parameters to operations
//! - **Sponsorship** ([`sponsorship`]): the begin/end reserve bracket
//! - **Assembler** ([`transaction`]): sequence number fetch and envelope
//! - **Horizon client** ([`horizon`]): account reads and submission
//!
//! # Example
//!
//! ```ignore
//! use stellar_wallet::{Address, Sponsorship, Wallet, WalletConfig};
//!
//! let wallet = Wallet::new(&WalletConfig::from_env())?;
//! let keys = wallet.create();
//!
//! let tx = wallet.fund(
//!     &Address::new("GSOURCE..."),
//!     &keys.public_key,
//!     "0",
//!     Sponsorship::sponsored_by("GSPONSOR..."),
//! )?;
//!
//! // Sign tx.hash()? with the source, sponsor and new account keys elsewhere
//! let signed = tx.into_signed(signatures)?;
//! wallet.submit_transaction(&signed)?;
//! ```

pub mod address;
pub mod amount;
pub mod asset;
pub mod config;
pub mod error;
pub mod horizon;
pub mod keypair;
pub mod network;
pub mod operation;
pub mod sponsorship;
pub mod transaction;
pub mod wallet;

// Re-exports for convenience
pub use address::Address;
pub use amount::{Amount, MIN_STARTING_BALANCE, STROOPS_PER_UNIT};
pub use asset::Asset;
pub use config::WalletConfig;
pub use error::WalletError;
pub use horizon::{HorizonClient, LedgerClient, SubmitResponse};
pub use keypair::AccountKeypair;
pub use network::Network;
pub use operation::{
    change_trust, create_account, create_unsponsored_account, set_signer, Operation, OperationBody,
};
pub use sponsorship::{wrap_with_sponsorship, Sponsorship};
pub use transaction::{
    assemble_transaction, SignedTransaction, TimeBounds, Transaction, TransactionOptions,
    BASE_FEE, MAX_OPERATIONS,
};
pub use wallet::Wallet;

// Re-export the wire types callers need for signatures
pub use stellar_xdr::curr::{DecoratedSignature, Signature, SignatureHint};

// Common result type
pub type Result<T> = std::result::Result<T, WalletError>;
