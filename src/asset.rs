//! Credit assets

use serde::{Deserialize, Serialize};
use std::fmt;
use stellar_xdr::curr::{AlphaNum12, AlphaNum4, AssetCode12, AssetCode4, ChangeTrustAsset};

use crate::address::Address;
use crate::error::WalletError;
use crate::Result;

/// Non-native asset identified by code and issuing account
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub code: String,
    pub issuer: Address,
}

impl Asset {
    pub fn new(code: impl Into<String>, issuer: impl Into<Address>) -> Self {
        Self {
            code: code.into(),
            issuer: issuer.into(),
        }
    }

    /// Trustline asset: 1-4 character codes map to AlphaNum4, 5-12 to AlphaNum12
    pub fn to_change_trust_asset(&self) -> Result<ChangeTrustAsset> {
        let code = self.code.as_bytes();
        if code.is_empty() || code.len() > 12 {
            return Err(WalletError::InvalidAsset(format!(
                "asset code '{}' must be 1-12 characters",
                self.code
            )));
        }
        if !code.iter().all(u8::is_ascii_alphanumeric) {
            return Err(WalletError::InvalidAsset(format!(
                "asset code '{}' must be alphanumeric",
                self.code
            )));
        }

        let issuer = self
            .issuer
            .to_account_id()
            .map_err(|_| WalletError::InvalidAsset(format!("invalid issuer {}", self.issuer)))?;

        if code.len() <= 4 {
            let mut asset_code = [0u8; 4];
            asset_code[..code.len()].copy_from_slice(code);
            Ok(ChangeTrustAsset::CreditAlphanum4(AlphaNum4 {
                asset_code: AssetCode4(asset_code),
                issuer,
            }))
        } else {
            let mut asset_code = [0u8; 12];
            asset_code[..code.len()].copy_from_slice(code);
            Ok(ChangeTrustAsset::CreditAlphanum12(AlphaNum12 {
                asset_code: AssetCode12(asset_code),
                issuer,
            }))
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.issuer)
    }
}
