//! Ledger access
//!
//! Everything the helpers need from the cluster goes through [`LedgerClient`],
//! so the same code drives a live validator through [`RpcLedger`] or an
//! in-memory ledger in tests. Waiting goes through [`Clock`].

use async_trait::async_trait;
use solana_sdk::{
    account::Account, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};

use crate::types::{BlockhashWindow, SignatureStatus};

pub mod clock;
pub mod rpc_errors;
pub mod rpc_ledger;

pub use clock::{Clock, TokioClock};
pub use rpc_errors::{LedgerError, LedgerResult};
pub use rpc_ledger::RpcLedger;

/// Read and write access to a Solana-compatible ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Endpoint description used in logs
    fn endpoint(&self) -> String;

    /// Balance in lamports
    async fn get_balance(&self, pubkey: &Pubkey) -> LedgerResult<u64>;

    /// Ask the faucet to credit `lamports` to `pubkey`
    async fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64) -> LedgerResult<Signature>;

    /// Latest blockhash and its validity bound
    async fn get_latest_blockhash(&self) -> LedgerResult<BlockhashWindow>;

    /// Current block height
    async fn get_block_height(&self) -> LedgerResult<u64>;

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        skip_preflight: bool,
    ) -> LedgerResult<Signature>;

    /// `None` when the cluster has not seen the signature
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> LedgerResult<Option<SignatureStatus>>;

    /// `None` when the account does not exist
    async fn get_account(&self, pubkey: &Pubkey) -> LedgerResult<Option<Account>>;

    /// Token balance in base units
    async fn get_token_balance(&self, token_account: &Pubkey) -> LedgerResult<u64>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> LedgerResult<u64>;
}
