//! Submission and confirmation polling
//!
//! A submission fetches a blockhash window, signs, sends once, then polls:
//! signature status first, then block height against the window's adjusted
//! bound, then sleeps. The loop ends on `confirmed`/`finalized` or on expiry.
//! Ledger errors abort the loop.

use solana_sdk::{
    instruction::Instruction, signature::Signature, signer::Signer,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::Duration;

use super::builder::build_signed_transaction;
use super::errors::SubmitError;
use super::output::{SubmissionOutcome, SubmissionState};
use crate::config::SubmissionConfig;
use crate::rpc::{Clock, LedgerClient};
use crate::structured_logging::SubmissionLogger;
use crate::types::{BlockhashWindow, ConfirmationStatus, DEFAULT_EXPIRY_MARGIN};

/// Polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitterConfig {
    pub poll_interval: Duration,
    /// Blocks subtracted from `last_valid_block_height`
    pub expiry_margin: u64,
    pub skip_preflight: bool,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2500),
            expiry_margin: DEFAULT_EXPIRY_MARGIN,
            skip_preflight: false,
        }
    }
}

impl From<&SubmissionConfig> for SubmitterConfig {
    fn from(config: &SubmissionConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            expiry_margin: config.expiry_margin,
            skip_preflight: config.skip_preflight,
        }
    }
}

/// Builds, signs, submits and confirms transactions against one ledger
#[derive(Clone)]
pub struct TxSubmitter {
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn Clock>,
    config: SubmitterConfig,
}

impl std::fmt::Debug for TxSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSubmitter")
            .field("endpoint", &self.ledger.endpoint())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TxSubmitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, clock: Arc<dyn Clock>, config: SubmitterConfig) -> Self {
        Self {
            ledger,
            clock,
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Submit a single instruction signed and paid by `signer`
    pub async fn send_instruction_and_confirm(
        &self,
        instruction: Instruction,
        signer: &dyn Signer,
    ) -> Result<SubmissionOutcome, SubmitError> {
        self.send_and_confirm(&[instruction], signer, &[]).await
    }

    /// Submit `instructions` paid by `payer` and co-signed by `signers`
    /// against a fresh blockhash
    pub async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &dyn Signer,
        signers: &[&dyn Signer],
    ) -> Result<SubmissionOutcome, SubmitError> {
        let window = self.ledger.get_latest_blockhash().await?;
        self.submit_with_window(instructions, payer, signers, window)
            .await
    }

    /// Submit against a caller-supplied window
    pub async fn submit_with_window(
        &self,
        instructions: &[Instruction],
        payer: &dyn Signer,
        signers: &[&dyn Signer],
        window: BlockhashWindow,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let logger = SubmissionLogger::default();
        let state = SubmissionState::Created;
        let tx = self.sign(instructions, payer, signers, &window)?;
        logger.log_created(&payer.pubkey(), instructions.len(), &window);

        let signature = self
            .ledger
            .send_transaction(&tx, self.config.skip_preflight)
            .await?;
        let state = state.transition(SubmissionState::Submitted)?;
        logger.log_submitted(&signature);

        self.poll_until_terminal(signature, state, &window, &logger, None)
            .await
    }

    /// Wait for a signature submitted elsewhere, e.g. an airdrop
    pub async fn confirm_signature(
        &self,
        signature: Signature,
        window: BlockhashWindow,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let logger = SubmissionLogger::default();
        self.poll_until_terminal(signature, SubmissionState::Submitted, &window, &logger, None)
            .await
    }

    /// Like [`send_and_confirm`](Self::send_and_confirm), but re-sends the
    /// same signed bytes with preflight skipped after every unsuccessful poll
    /// until the window expires. The transaction is never re-signed.
    pub async fn send_with_rebroadcast(
        &self,
        instructions: &[Instruction],
        payer: &dyn Signer,
        signers: &[&dyn Signer],
    ) -> Result<SubmissionOutcome, SubmitError> {
        let logger = SubmissionLogger::default();
        let state = SubmissionState::Created;
        let window = self.ledger.get_latest_blockhash().await?;
        let tx = self.sign(instructions, payer, signers, &window)?;
        logger.log_created(&payer.pubkey(), instructions.len(), &window);

        let signature = self.ledger.send_transaction(&tx, true).await?;
        let state = state.transition(SubmissionState::Submitted)?;
        logger.log_submitted(&signature);

        self.poll_until_terminal(signature, state, &window, &logger, Some(&tx))
            .await
    }

    fn sign(
        &self,
        instructions: &[Instruction],
        payer: &dyn Signer,
        signers: &[&dyn Signer],
        window: &BlockhashWindow,
    ) -> Result<VersionedTransaction, SubmitError> {
        let mut all: Vec<&dyn Signer> = Vec::with_capacity(signers.len() + 1);
        all.push(payer);
        all.extend_from_slice(signers);
        build_signed_transaction(&payer.pubkey(), instructions, &all, window)
    }

    /// Poll a `Submitted` signature until it lands or its window expires
    async fn poll_until_terminal(
        &self,
        signature: Signature,
        state: SubmissionState,
        window: &BlockhashWindow,
        logger: &SubmissionLogger,
        rebroadcast: Option<&VersionedTransaction>,
    ) -> Result<SubmissionOutcome, SubmitError> {
        let started = self.clock.now();
        let mut observed = ConfirmationStatus::Pending;
        let mut polls: u32 = 0;

        loop {
            polls += 1;

            let status = self.ledger.get_signature_status(&signature).await?;
            logger.log_poll(&signature, polls, status.as_ref().map(|s| s.status));

            let mut err = None;
            if let Some(status) = status {
                observed = observed.advance(status.status);
                err = status.err;
            }

            if observed.is_landed() {
                state.transition(SubmissionState::Confirmed)?;

                let elapsed = self.clock.now().saturating_duration_since(started);
                logger.log_confirmed(&signature, observed, elapsed);
                if let Some(err) = &err {
                    logger.log_failed_execution(&signature, err);
                }
                return Ok(SubmissionOutcome::Confirmed {
                    signature,
                    status: observed,
                    err,
                    polls,
                    elapsed,
                });
            }

            let height = self.ledger.get_block_height().await?;
            logger.log_height_check(height, window.expiry_height(self.config.expiry_margin));

            if window.is_expired_at(height, self.config.expiry_margin) {
                state.transition(SubmissionState::Expired)?;

                let elapsed = self.clock.now().saturating_duration_since(started);
                logger.log_expired(&signature, elapsed);
                return Ok(SubmissionOutcome::Expired {
                    signature,
                    polls,
                    elapsed,
                });
            }

            self.clock.sleep(self.config.poll_interval).await;

            if let Some(tx) = rebroadcast {
                self.ledger.send_transaction(tx, true).await?;
                logger.log_rebroadcast(&signature, polls);
            }
        }
    }
}
