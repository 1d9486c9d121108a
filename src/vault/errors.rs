use thiserror::Error;

/// Errors raised while encoding vault instructions or decoding vault accounts
#[derive(Debug, Error)]
pub enum VaultClientError {
    /// Mirrors the program's `InsufficientDeposit` check on `initialize`
    #[error("Initial deposit {amount} is below the minimum of {minimum}")]
    InsufficientDeposit { amount: u64, minimum: u64 },

    /// Account data does not start with the expected Anchor discriminator
    #[error("Account is not a {expected}: discriminator mismatch")]
    Discriminator { expected: &'static str },

    #[error("Failed to decode {account}: {reason}")]
    Decode {
        account: &'static str,
        reason: String,
    },

    #[error("Failed to encode instruction params: {0}")]
    Encode(#[from] std::io::Error),
}
