//! Account balance queries and faucet funding
//!
//! Airdrops are confirmed through the same poll loop as ordinary
//! submissions, so an airdrop whose blockhash window lapses is reported as
//! expired and the next attempt starts over with a fresh request.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::FundingConfig;
use crate::rpc::{LedgerClient, LedgerError};
use crate::tx_builder::{SubmissionOutcome, SubmitError, TxSubmitter};
use crate::types::{short_key, LAMPORTS_PER_SOL};

#[derive(Debug, Error)]
pub enum FundingError {
    #[error("Airdrop request failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Airdrop confirmation failed: {0}")]
    Submit(#[from] SubmitError),

    #[error("Balance of {account} still {balance} lamports after {attempts} airdrops (need {required})")]
    Exhausted {
        account: Pubkey,
        balance: u64,
        required: u64,
        attempts: u32,
    },
}

impl FundingError {
    /// Short label used in structured log fields
    pub fn category(&self) -> &'static str {
        match self {
            FundingError::Ledger(e) => e.category(),
            FundingError::Submit(e) => e.category(),
            FundingError::Exhausted { .. } => "exhausted",
        }
    }
}

/// How much to request and when to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingPolicy {
    pub airdrop_lamports: u64,
    pub min_balance_lamports: u64,
    pub max_attempts: u32,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self {
            airdrop_lamports: 10 * LAMPORTS_PER_SOL,
            min_balance_lamports: LAMPORTS_PER_SOL,
            max_attempts: 16,
        }
    }
}

impl From<&FundingConfig> for FundingPolicy {
    fn from(config: &FundingConfig) -> Self {
        Self {
            airdrop_lamports: config.airdrop_lamports(),
            min_balance_lamports: config.min_balance_lamports(),
            max_attempts: config.max_attempts,
        }
    }
}

impl FundingPolicy {
    pub fn with_min_sol(mut self, min_sol: u64) -> Self {
        self.min_balance_lamports = min_sol.saturating_mul(LAMPORTS_PER_SOL);
        self
    }
}

/// Balance in lamports; an unreachable cluster reads as an empty account
pub async fn get_sol_balance(ledger: &dyn LedgerClient, pubkey: &Pubkey) -> u64 {
    match ledger.get_balance(pubkey).await {
        Ok(lamports) => lamports,
        Err(e) => {
            debug!(account = %short_key(pubkey), error = %e, "Balance read failed, treating as 0");
            0
        }
    }
}

/// Airdrop until the balance reaches `policy.min_balance_lamports`
///
/// Returns the final balance. Errors are logged before they are returned.
pub async fn airdrop_sol(
    submitter: &TxSubmitter,
    pubkey: &Pubkey,
    policy: &FundingPolicy,
) -> Result<u64, FundingError> {
    let result = airdrop_loop(submitter, pubkey, policy).await;
    if let Err(e) = &result {
        error!(account = %pubkey, category = e.category(), error = %e, "Airdrop failed");
    }
    result
}

async fn airdrop_loop(
    submitter: &TxSubmitter,
    pubkey: &Pubkey,
    policy: &FundingPolicy,
) -> Result<u64, FundingError> {
    let ledger = submitter.ledger().as_ref();
    let mut balance = get_sol_balance(ledger, pubkey).await;
    let mut attempts = 0u32;

    while balance < policy.min_balance_lamports {
        if attempts >= policy.max_attempts {
            return Err(FundingError::Exhausted {
                account: *pubkey,
                balance,
                required: policy.min_balance_lamports,
                attempts,
            });
        }
        attempts += 1;

        let signature = ledger.request_airdrop(pubkey, policy.airdrop_lamports).await?;
        let window = ledger.get_latest_blockhash().await?;
        debug!(
            account = %short_key(pubkey),
            signature = %signature,
            attempt = attempts,
            "Airdrop requested"
        );

        match submitter.confirm_signature(signature, window).await? {
            SubmissionOutcome::Confirmed { .. } => {}
            SubmissionOutcome::Expired { .. } => {
                warn!(account = %short_key(pubkey), signature = %signature, "Airdrop expired");
            }
        }

        balance = get_sol_balance(ledger, pubkey).await;
    }

    info!(
        account = %short_key(pubkey),
        balance_sol = balance as f64 / LAMPORTS_PER_SOL as f64,
        attempts,
        "Account funded"
    );
    Ok(balance)
}

/// Check once, and airdrop only if the balance is below `min_sol`
pub async fn airdrop_if_balance_not_enough(
    submitter: &TxSubmitter,
    pubkey: &Pubkey,
    min_sol: u64,
    policy: &FundingPolicy,
) -> Result<u64, FundingError> {
    let policy = policy.with_min_sol(min_sol);
    let balance = get_sol_balance(submitter.ledger().as_ref(), pubkey).await;
    if balance >= policy.min_balance_lamports {
        debug!(account = %short_key(pubkey), balance, "Balance sufficient, skipping airdrop");
        return Ok(balance);
    }
    airdrop_sol(submitter, pubkey, &policy).await
}
