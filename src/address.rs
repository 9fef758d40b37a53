//! Ledger account addresses
//!
//! An [`Address`] is carried around as the caller supplied it. It is only
//! decoded (as a `G...` strkey) when an operation is converted to XDR, which
//! happens before any network call.

use serde::{Deserialize, Serialize};
use std::fmt;
use stellar_xdr::curr::{AccountId, MuxedAccount, PublicKey, Uint256};

use crate::error::WalletError;
use crate::Result;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Encode raw ed25519 public key bytes as a `G...` address
    pub fn from_public_key(bytes: [u8; 32]) -> Self {
        Self(stellar_strkey::ed25519::PublicKey(bytes).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Decode into raw ed25519 public key bytes
    pub fn public_key_bytes(&self) -> Result<[u8; 32]> {
        stellar_strkey::ed25519::PublicKey::from_string(self.0.trim())
            .map(|key| key.0)
            .map_err(|_| WalletError::InvalidAddress(self.0.clone()))
    }

    pub fn to_account_id(&self) -> Result<AccountId> {
        let bytes = self.public_key_bytes()?;
        Ok(AccountId(PublicKey::PublicKeyTypeEd25519(Uint256(bytes))))
    }

    pub fn to_muxed_account(&self) -> Result<MuxedAccount> {
        Ok(MuxedAccount::Ed25519(Uint256(self.public_key_bytes()?)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
