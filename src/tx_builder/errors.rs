//! Error types for transaction submission

use solana_sdk::signature::Signature;
use thiserror::Error;

use super::output::SubmissionState;
use crate::rpc::LedgerError;

/// Errors raised while building, signing or submitting a transaction
///
/// Blockhash expiry is not an error here: the poll loop reports it as
/// [`SubmissionOutcome::Expired`](super::SubmissionOutcome::Expired).
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Failed to compile the message from its instructions
    #[error("Message compile error: {0}")]
    Compile(String),

    /// Signers do not cover the message's required signatures
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Failed to build an instruction for a specific program
    #[error("Instruction build error (program={program}): {reason}")]
    InstructionBuild {
        /// The program ID that failed to build an instruction
        program: String,
        /// Detailed reason for the failure
        reason: String,
    },

    /// Ledger access failed; polling is aborted
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The transaction landed but its execution failed
    #[error("Transaction {signature} failed: {error}")]
    Failed { signature: Signature, error: String },

    /// The blockhash expired before the transaction landed
    #[error("Transaction {signature} expired before confirmation")]
    Expired { signature: Signature },

    /// A submission stepped out of `Created → Submitted → {Confirmed, Expired}`
    #[error("Invalid submission transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: SubmissionState,
        to: SubmissionState,
    },
}

impl SubmitError {
    /// Get the error category for log fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::Compile(_) => "compile",
            Self::Signing(_) => "signing",
            Self::InstructionBuild { .. } => "instruction",
            Self::Ledger(e) => e.category(),
            Self::Failed { .. } => "execution",
            Self::Expired { .. } => "expired",
            Self::InvalidTransition { .. } => "state",
        }
    }

    /// Create an instruction build error for a specific program
    pub fn instruction_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            program: program.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SubmitError::instruction_failed("spl_token", "invalid mint");
        assert_eq!(
            err.to_string(),
            "Instruction build error (program=spl_token): invalid mint"
        );

        let err = SubmitError::Signing("missing signer".to_string());
        assert_eq!(err.to_string(), "Signing failed: missing signer");
    }

    #[test]
    fn test_ledger_errors_convert() {
        let err: SubmitError = LedgerError::Timeout {
            endpoint: "http://127.0.0.1:8899".to_string(),
        }
        .into();
        assert!(matches!(err, SubmitError::Ledger(_)));
        assert_eq!(err.category(), "timeout");
    }

    #[test]
    fn test_error_categories() {
        let sig = Signature::default();
        assert_eq!(SubmitError::Expired { signature: sig }.category(), "expired");
        assert_eq!(
            SubmitError::Failed {
                signature: sig,
                error: "custom program error: 0x1770".to_string()
            }
            .category(),
            "execution"
        );
        assert_eq!(SubmitError::Compile("x".to_string()).category(), "compile");
    }
}
