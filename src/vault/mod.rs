//! Client for the `trading_vault` program
//!
//! - **pda**: seeds and derived addresses
//! - **instructions**: Anchor-encoded instructions with their account metas
//! - **state**: `Vault` and `User` account decoding
//! - **errors**: [`VaultClientError`]

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

pub mod errors;
pub mod instructions;
pub mod pda;
pub mod state;

pub use errors::VaultClientError;
pub use instructions::{
    ClosePositionAccounts, DepositAccounts, InitializeAccounts, WithdrawAccounts,
    MIN_INITIAL_DEPOSIT,
};
pub use state::{UserAccount, VaultAccount};

pub const TRADING_VAULT_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("4aeW1288H4t5oSmUhmrxmVfvuhFgYrtPSj6BGwCC4djv");

/// Metaplex token metadata program
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// `sha256("global:<name>")[..8]`
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator("global", name)
}

/// `sha256("account:<Name>")[..8]`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator("account", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}
