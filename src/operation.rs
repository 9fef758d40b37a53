//! Operations and the operation factory
//!
//! [`Operation`] mirrors the handful of ledger operations this crate builds.
//! The factory functions map typed parameters to an operation value; they do
//! no network access and keep no state.

use stellar_xdr::curr::{
    self as xdr, BeginSponsoringFutureReservesOp, ChangeTrustOp, CreateAccountOp,
    OperationBody as XdrOperationBody, SetOptionsOp, Signer, SignerKey, Uint256,
};

use crate::address::Address;
use crate::amount::{Amount, MIN_STARTING_BALANCE};
use crate::error::WalletError;
use crate::asset::Asset;
use crate::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationBody {
    CreateAccount {
        destination: Address,
        starting_balance: Amount,
    },
    ChangeTrust {
        asset: Asset,
        limit: Amount,
    },
    SetOptions {
        signer_key: Address,
        signer_weight: u32,
    },
    BeginSponsoringFutureReserves {
        sponsored_id: Address,
    },
    EndSponsoringFutureReserves,
}

/// A single operation with an optional source override
///
/// When `source` is `None` the operation runs as the transaction's source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub source: Option<Address>,
    pub body: OperationBody,
}

impl Operation {
    pub fn new(body: OperationBody) -> Self {
        Self { source: None, body }
    }

    pub fn with_source(mut self, source: Address) -> Self {
        self.source = Some(source);
        self
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self.body {
            OperationBody::CreateAccount { .. } => "create_account",
            OperationBody::ChangeTrust { .. } => "change_trust",
            OperationBody::SetOptions { .. } => "set_options",
            OperationBody::BeginSponsoringFutureReserves { .. } => "begin_sponsoring_future_reserves",
            OperationBody::EndSponsoringFutureReserves => "end_sponsoring_future_reserves",
        }
    }

    pub fn to_xdr(&self) -> Result<xdr::Operation> {
        let source_account = self
            .source
            .as_ref()
            .map(Address::to_muxed_account)
            .transpose()?;

        let body = match &self.body {
            OperationBody::CreateAccount {
                destination,
                starting_balance,
            } => XdrOperationBody::CreateAccount(CreateAccountOp {
                destination: destination.to_account_id()?,
                starting_balance: starting_balance.stroops(),
            }),
            OperationBody::ChangeTrust { asset, limit } => {
                XdrOperationBody::ChangeTrust(ChangeTrustOp {
                    line: asset.to_change_trust_asset()?,
                    limit: limit.stroops(),
                })
            }
            OperationBody::SetOptions {
                signer_key,
                signer_weight,
            } => XdrOperationBody::SetOptions(SetOptionsOp {
                inflation_dest: None,
                clear_flags: None,
                set_flags: None,
                master_weight: None,
                low_threshold: None,
                med_threshold: None,
                high_threshold: None,
                home_domain: None,
                signer: Some(Signer {
                    key: SignerKey::Ed25519(Uint256(signer_key.public_key_bytes()?)),
                    weight: *signer_weight,
                }),
            }),
            OperationBody::BeginSponsoringFutureReserves { sponsored_id } => {
                XdrOperationBody::BeginSponsoringFutureReserves(BeginSponsoringFutureReservesOp {
                    sponsored_id: sponsored_id.to_account_id()?,
                })
            }
            OperationBody::EndSponsoringFutureReserves => {
                XdrOperationBody::EndSponsoringFutureReserves
            }
        };

        Ok(xdr::Operation {
            source_account,
            body,
        })
    }
}

/// Build a create-account operation
///
/// Fails with `InvalidAmount` if `starting_balance` is not a non-negative
/// decimal. Any such balance is accepted, including the `"0"` a sponsored
/// account starts with; unsponsored accounts should go through
/// [`create_unsponsored_account`], which enforces the minimum.
pub fn create_account(
    source: &Address,
    destination: &Address,
    starting_balance: &str,
) -> Result<Operation> {
    let starting_balance = Amount::parse(starting_balance)?;
    Ok(Operation::new(OperationBody::CreateAccount {
        destination: destination.clone(),
        starting_balance,
    })
    .with_source(source.clone()))
}

/// Build a create-account operation for an account that pays its own reserve
///
/// Fails with `InvalidAmount` if `starting_balance` is below
/// [`MIN_STARTING_BALANCE`].
pub fn create_unsponsored_account(
    source: &Address,
    destination: &Address,
    starting_balance: &str,
) -> Result<Operation> {
    let balance = Amount::parse(starting_balance)?;
    if balance < MIN_STARTING_BALANCE {
        return Err(WalletError::InvalidAmount(format!(
            "starting balance must be at least {} for non-sponsored accounts, got {}",
            MIN_STARTING_BALANCE, balance
        )));
    }
    create_account(source, destination, starting_balance)
}

/// Build a change-trust operation; a zero limit removes the trustline
pub fn change_trust(source: &Address, asset: &Asset, limit: &str) -> Result<Operation> {
    let limit = Amount::parse(limit)?;
    Ok(Operation::new(OperationBody::ChangeTrust {
        asset: asset.clone(),
        limit,
    })
    .with_source(source.clone()))
}

/// Build a set-options operation adding a signer; weight 0 removes it
///
/// The 0-255 weight range is enforced by the network, not here.
pub fn set_signer(source: &Address, signer: &Address, weight: u32) -> Operation {
    Operation::new(OperationBody::SetOptions {
        signer_key: signer.clone(),
        signer_weight: weight,
    })
    .with_source(source.clone())
}
