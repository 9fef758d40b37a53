/// Horizon Mock Server Library
///
/// This crate provides both a standalone binary and library components
/// for mocking the Horizon API on top of an in-memory ledger.

pub mod handlers;
pub mod ledger;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use ledger::{AccountState, MockLedger, SubmitError};
pub use server::{create_router, run_server, spawn_background};
pub use types::*;
