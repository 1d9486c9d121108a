//! Structured log events for the submission lifecycle

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::time::Duration;

use crate::observability::CorrelationId;
use crate::types::{BlockhashWindow, ConfirmationStatus};

/// Emits one log line per submission state change, all tagged with the same
/// correlation id
#[derive(Debug, Clone)]
pub struct SubmissionLogger {
    correlation_id: CorrelationId,
}

impl SubmissionLogger {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn log_created(&self, payer: &Pubkey, instruction_count: usize, window: &BlockhashWindow) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            payer = %payer,
            instruction_count,
            blockhash = %window.blockhash,
            last_valid_block_height = window.last_valid_block_height,
            "Transaction created"
        );
    }

    pub fn log_submitted(&self, signature: &Signature) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            "Transaction submitted"
        );
    }

    pub fn log_poll(&self, signature: &Signature, attempt: u32, status: Option<ConfirmationStatus>) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            attempt,
            status = ?status,
            "Polled signature status"
        );
    }

    pub fn log_height_check(&self, current_height: u64, expiry_height: u64) {
        // Positive difference means the blockhash has expired
        let difference = current_height as i128 - expiry_height as i128;
        tracing::debug!(
            correlation_id = %self.correlation_id,
            current_height,
            expiry_height,
            difference = difference as i64,
            "Checked blockhash expiry"
        );
    }

    pub fn log_confirmed(&self, signature: &Signature, status: ConfirmationStatus, elapsed: Duration) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            status = %status,
            elapsed_secs = elapsed.as_secs_f64(),
            "Transaction success"
        );
    }

    pub fn log_failed_execution(&self, signature: &Signature, error: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            error = %error,
            "Transaction landed with an execution error"
        );
    }

    pub fn log_expired(&self, signature: &Signature, elapsed: Duration) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            elapsed_secs = elapsed.as_secs_f64(),
            "Blockhash has expired"
        );
    }

    pub fn log_rebroadcast(&self, signature: &Signature, attempt: u32) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            signature = %signature,
            attempt,
            "Rebroadcast transaction"
        );
    }
}

impl Default for SubmissionLogger {
    fn default() -> Self {
        Self::new(CorrelationId::new())
    }
}
