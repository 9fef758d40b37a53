/// Horizon Mock Server
///
/// A lightweight mock server exposing the Horizon account and submission
/// endpoints over an in-memory ledger. Designed for local wallet development.

use anyhow::{Context, Result};
use horizon_mock::{run_server, MockLedger};
use std::env;
use std::sync::Arc;

const STANDALONE_PASSPHRASE: &str = "Standalone Network ; February 2017";

#[derive(Debug)]
struct Config {
    // Ledger
    network_passphrase: String,
    seed_accounts: Vec<String>,

    // Server
    server_host: String,
    server_port: u16,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let network_passphrase = env::var("NETWORK_PASSPHRASE")
            .unwrap_or_else(|_| STANDALONE_PASSPHRASE.to_string());

        // Comma separated G... addresses funded with 10,000 units at startup
        let seed_accounts = env::var("SEED_ACCOUNTS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let server_host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        Ok(Self {
            network_passphrase,
            seed_accounts,
            server_host,
            server_port,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    log::info!("Starting Horizon Mock Server...");

    // Load configuration
    let config = Config::from_env()
        .context("Failed to load configuration")?;

    log::info!("Network passphrase: {}", config.network_passphrase);
    log::info!("Server will listen on {}:{}", config.server_host, config.server_port);

    let ledger = Arc::new(MockLedger::new(&config.network_passphrase));
    for address in &config.seed_accounts {
        ledger
            .create_account(address, 100_000_000_000, 0)
            .with_context(|| format!("Failed to seed account {}", address))?;
    }

    // Run server
    run_server(ledger, config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
