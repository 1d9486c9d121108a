//! Transaction submission and confirmation
//!
//! - **errors**: [`SubmitError`] taxonomy
//! - **builder**: v0 message compilation and signing against a blockhash window
//! - **output**: submission state machine and [`SubmissionOutcome`]
//! - **submitter**: [`TxSubmitter`], the send-then-poll loop
//!
//! ## Lifecycle
//!
//! ```text
//! CREATED --send--> SUBMITTED --status confirmed/finalized--> CONFIRMED
//!                       |
//!                       +--height > last_valid - margin----> EXPIRED
//! ```
//!
//! Expiry is reported as an outcome, not an error, and is never followed by
//! a resubmission; callers that want another attempt start a new submission
//! with a fresh blockhash.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use trading_vault_client::rpc::{RpcLedger, TokioClock};
//! # use trading_vault_client::tx_builder::{SubmitterConfig, TxSubmitter};
//! # use solana_sdk::{commitment_config::CommitmentConfig, signature::Keypair, signer::Signer, system_instruction};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(RpcLedger::new(
//!     "http://127.0.0.1:8899",
//!     CommitmentConfig::finalized(),
//!     CommitmentConfig::confirmed(),
//!     std::time::Duration::from_secs(30),
//! ));
//! let submitter = TxSubmitter::new(ledger, Arc::new(TokioClock), SubmitterConfig::default());
//!
//! let payer = Keypair::new();
//! let ix = system_instruction::transfer(&payer.pubkey(), &payer.pubkey(), 1);
//! let outcome = submitter.send_instruction_and_confirm(ix, &payer).await?;
//! println!("{} -> {}", outcome.signature(), outcome.status());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::SubmitError;

mod builder;
mod output;
mod submitter;

pub use builder::{build_signed_transaction, required_signers};
pub use output::{SubmissionOutcome, SubmissionState};
pub use submitter::{SubmitterConfig, TxSubmitter};
