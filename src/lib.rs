//! Trading Vault test client
//!
//! Drives the `trading_vault` program on a Solana cluster (normally a local
//! `solana-test-validator`): funds test actors, creates mints and associated
//! token accounts, and submits program instructions, confirming each one by
//! polling its signature against the blockhash's validity window.

pub mod config;
pub mod funding;
pub mod observability;
pub mod rpc;
pub mod scenarios;
pub mod structured_logging;
pub mod test_utils;
pub mod token;
pub mod tx_builder;
pub mod types;
pub mod vault;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
