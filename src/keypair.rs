//! Account key generation

use ed25519_dalek::SigningKey;
use std::fmt;

use crate::address::Address;
use crate::error::WalletError;
use crate::Result;

/// Fresh ed25519 account keys in strkey form (`G...` / `S...`)
#[derive(Clone, PartialEq, Eq)]
pub struct AccountKeypair {
    pub public_key: Address,
    pub secret_key: String,
}

impl AccountKeypair {
    pub fn random() -> Self {
        let seed: [u8; 32] = rand::random();
        Self::from_seed(seed)
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = Address::from_public_key(signing_key.verifying_key().to_bytes());

        Self {
            public_key,
            secret_key: stellar_strkey::ed25519::PrivateKey(seed).to_string(),
        }
    }

    /// Restore from an `S...` secret seed
    pub fn from_secret(secret: &str) -> Result<Self> {
        let seed = stellar_strkey::ed25519::PrivateKey::from_string(secret.trim())
            .map_err(|_| WalletError::InvalidAddress("malformed secret seed".to_string()))?;
        Ok(Self::from_seed(seed.0))
    }

    /// Raw 32-byte seed, for handing to a signer
    pub fn seed(&self) -> Result<[u8; 32]> {
        stellar_strkey::ed25519::PrivateKey::from_string(&self.secret_key)
            .map(|key| key.0)
            .map_err(|_| WalletError::InvalidAddress("malformed secret seed".to_string()))
    }
}

impl fmt::Debug for AccountKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountKeypair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
