//! Submission state machine and its terminal outcomes

use solana_sdk::signature::Signature;
use std::time::Duration;

use super::errors::SubmitError;
use crate::types::ConfirmationStatus;

/// Lifecycle of one submission: `Created → Submitted → {Confirmed, Expired}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Created,
    Submitted,
    Confirmed,
    Expired,
}

impl SubmissionState {
    /// Move to `next`; any step out of lifecycle order is an error
    pub fn transition(self, next: SubmissionState) -> Result<SubmissionState, SubmitError> {
        use SubmissionState::*;
        match (self, next) {
            (Created, Submitted) | (Submitted, Confirmed) | (Submitted, Expired) => Ok(next),
            (from, to) => Err(SubmitError::InvalidTransition { from, to }),
        }
    }
}

/// How a submission ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Reached `confirmed` or `finalized` before the blockhash expired
    Confirmed {
        signature: Signature,
        status: ConfirmationStatus,
        /// Execution error reported for the landed transaction
        err: Option<String>,
        polls: u32,
        elapsed: Duration,
    },
    /// The adjusted validity bound passed first; the transaction was not
    /// resubmitted
    Expired {
        signature: Signature,
        polls: u32,
        elapsed: Duration,
    },
}

impl SubmissionOutcome {
    pub fn signature(&self) -> &Signature {
        match self {
            SubmissionOutcome::Confirmed { signature, .. } => signature,
            SubmissionOutcome::Expired { signature, .. } => signature,
        }
    }

    pub fn status(&self) -> ConfirmationStatus {
        match self {
            SubmissionOutcome::Confirmed { status, .. } => *status,
            SubmissionOutcome::Expired { .. } => ConfirmationStatus::Expired,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, SubmissionOutcome::Confirmed { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, SubmissionOutcome::Expired { .. })
    }

    pub fn polls(&self) -> u32 {
        match self {
            SubmissionOutcome::Confirmed { polls, .. } => *polls,
            SubmissionOutcome::Expired { polls, .. } => *polls,
        }
    }

    /// Signature of a successfully executed transaction, or an error for
    /// expiry and execution failure
    pub fn into_result(self) -> Result<Signature, SubmitError> {
        match self {
            SubmissionOutcome::Confirmed {
                signature,
                err: None,
                ..
            } => Ok(signature),
            SubmissionOutcome::Confirmed {
                signature,
                err: Some(error),
                ..
            } => Err(SubmitError::Failed { signature, error }),
            SubmissionOutcome::Expired { signature, .. } => Err(SubmitError::Expired { signature }),
        }
    }
}
