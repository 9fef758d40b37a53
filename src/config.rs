/// Wallet configuration from environment variables
///
/// Selects the network passphrase and Horizon endpoint. Defaults to testnet.

use std::env;
use std::time::Duration;

use crate::network::Network;

pub const TESTNET_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";
pub const PUBLIC_HORIZON_URL: &str = "https://horizon.stellar.org";
pub const FUTURENET_HORIZON_URL: &str = "https://horizon-futurenet.stellar.org";

#[derive(Clone, Debug)]
pub struct WalletConfig {
    /// Horizon base URL
    pub horizon_url: String,
    /// Network passphrase embedded in every transaction
    pub network: Network,
    /// Optional expiry applied to assembled transactions
    pub tx_timeout: Option<Duration>,
}

impl WalletConfig {
    pub fn new(horizon_url: impl Into<String>, network: Network) -> Self {
        Self {
            horizon_url: horizon_url.into(),
            network,
            tx_timeout: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `STELLAR_NETWORK`: "testnet" (default), "public"/"mainnet" or "futurenet"
    /// - `NETWORK_PASSPHRASE`: overrides the passphrase (private networks)
    /// - `HORIZON_URL`: Horizon endpoint (defaults per network)
    /// - `TX_TIMEOUT_SECS`: transaction expiry in seconds (optional, 0 = none)
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Local standalone network with the mock Horizon
    /// NETWORK_PASSPHRASE="Standalone Network ; February 2017" HORIZON_URL=http://localhost:8000 cargo test
    /// ```
    pub fn from_env() -> Self {
        let network_str = env::var("STELLAR_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .to_lowercase();

        let (mut network, default_url) = match network_str.as_str() {
            "public" | "mainnet" | "pubnet" => {
                log::info!("Using PUBLIC network");
                (Network::public(), PUBLIC_HORIZON_URL)
            }
            "futurenet" => {
                log::info!("Using FUTURENET network");
                (Network::futurenet(), FUTURENET_HORIZON_URL)
            }
            "testnet" | "" => {
                log::info!("Using TESTNET network");
                (Network::testnet(), TESTNET_HORIZON_URL)
            }
            other => {
                log::warn!("Unknown network '{}', defaulting to testnet", other);
                (Network::testnet(), TESTNET_HORIZON_URL)
            }
        };

        if let Ok(passphrase) = env::var("NETWORK_PASSPHRASE") {
            if !passphrase.trim().is_empty() {
                log::info!("Network passphrase override: {}", passphrase);
                network = Network::new(passphrase);
            }
        }

        let horizon_url = env::var("HORIZON_URL").unwrap_or_else(|_| default_url.to_string());
        log::info!("Horizon URL: {}", horizon_url);

        // 0 means no expiry
        let tx_timeout = match env::var("TX_TIMEOUT_SECS") {
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(0) => {
                    log::info!("TX_TIMEOUT_SECS=0, transactions do not expire");
                    None
                }
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    log::warn!("Ignoring invalid TX_TIMEOUT_SECS '{}'", value);
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            horizon_url,
            network,
            tx_timeout,
        }
    }

    /// A zero timeout clears the expiry
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = Some(timeout).filter(|timeout| !timeout.is_zero());
        self
    }
}

impl Default for WalletConfig {
    /// Default configuration (testnet)
    fn default() -> Self {
        Self::new(TESTNET_HORIZON_URL, Network::testnet())
    }
}
