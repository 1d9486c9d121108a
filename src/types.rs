//! Common types used throughout the client

use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey};
use solana_transaction_status::TransactionConfirmationStatus;
use std::fmt;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Blocks subtracted from a blockhash's advertised validity bound before it
/// is treated as expired.
pub const DEFAULT_EXPIRY_MARGIN: u64 = 150;

/// Role a test actor plays against the vault program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Fee payer and mint authority for test mints
    Payer,
    /// Vault leader (first depositor)
    Leader,
    /// Regular depositor
    User,
    /// Backend wallet that pays for the vault's bond mint
    BackendWallet,
}

impl ActorRole {
    pub const ALL: [ActorRole; 4] = [
        ActorRole::Payer,
        ActorRole::Leader,
        ActorRole::User,
        ActorRole::BackendWallet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Payer => "payer",
            ActorRole::Leader => "leader",
            ActorRole::User => "user",
            ActorRole::BackendWallet => "backend_wallet",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmation status of a submitted transaction
///
/// Ordered by progress; `Expired` and `Finalized` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    /// Not yet seen, or only processed by the leader
    Pending,
    /// Voted on by a supermajority
    Confirmed,
    /// Rooted
    Finalized,
    /// The blockhash validity window passed without confirmation
    Expired,
}

impl ConfirmationStatus {
    /// Whether the transaction has landed at `confirmed` or stronger
    pub fn is_landed(&self) -> bool {
        matches!(self, ConfirmationStatus::Confirmed | ConfirmationStatus::Finalized)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConfirmationStatus::Finalized | ConfirmationStatus::Expired)
    }

    /// Apply an observed status, refusing to move backwards or out of a
    /// terminal state.
    pub fn advance(self, observed: ConfirmationStatus) -> ConfirmationStatus {
        if self.is_terminal() || observed < self {
            self
        } else {
            observed
        }
    }
}

impl From<TransactionConfirmationStatus> for ConfirmationStatus {
    fn from(status: TransactionConfirmationStatus) -> Self {
        match status {
            TransactionConfirmationStatus::Processed => ConfirmationStatus::Pending,
            TransactionConfirmationStatus::Confirmed => ConfirmationStatus::Confirmed,
            TransactionConfirmationStatus::Finalized => ConfirmationStatus::Finalized,
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfirmationStatus::Pending => "pending",
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::Finalized => "finalized",
            ConfirmationStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Status of a signature as reported by the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub status: ConfirmationStatus,
    /// Execution error, if the transaction landed but failed
    pub err: Option<String>,
}

/// A recent blockhash together with the last block height at which the
/// cluster still accepts transactions referencing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashWindow {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

impl BlockhashWindow {
    pub fn new(blockhash: Hash, last_valid_block_height: u64) -> Self {
        Self {
            blockhash,
            last_valid_block_height,
        }
    }

    /// Height after which the window is treated as expired
    pub fn expiry_height(&self, margin: u64) -> u64 {
        self.last_valid_block_height.saturating_sub(margin)
    }

    pub fn is_expired_at(&self, current_height: u64, margin: u64) -> bool {
        current_height > self.expiry_height(margin)
    }
}

/// Short display form of a pubkey for log lines
pub fn short_key(key: &Pubkey) -> String {
    let s = key.to_string();
    if s.len() <= 10 {
        s
    } else {
        format!("{}..{}", &s[..4], &s[s.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_status_is_monotonic() {
        let s = ConfirmationStatus::Pending.advance(ConfirmationStatus::Confirmed);
        assert_eq!(s, ConfirmationStatus::Confirmed);
        assert_eq!(s.advance(ConfirmationStatus::Pending), ConfirmationStatus::Confirmed);

        let fin = s.advance(ConfirmationStatus::Finalized);
        assert_eq!(fin.advance(ConfirmationStatus::Expired), ConfirmationStatus::Finalized);

        let expired = ConfirmationStatus::Pending.advance(ConfirmationStatus::Expired);
        assert_eq!(expired.advance(ConfirmationStatus::Finalized), ConfirmationStatus::Expired);
    }

    #[test]
    fn test_processed_maps_to_pending() {
        assert_eq!(
            ConfirmationStatus::from(TransactionConfirmationStatus::Processed),
            ConfirmationStatus::Pending
        );
        assert!(ConfirmationStatus::from(TransactionConfirmationStatus::Finalized).is_landed());
    }

    #[test]
    fn test_expiry_margin_saturates() {
        let window = BlockhashWindow::new(Hash::default(), 100);
        assert_eq!(window.expiry_height(DEFAULT_EXPIRY_MARGIN), 0);
        assert!(window.is_expired_at(1, DEFAULT_EXPIRY_MARGIN));
        assert!(!window.is_expired_at(0, DEFAULT_EXPIRY_MARGIN));
    }

    #[test]
    fn test_short_key() {
        let key = Pubkey::new_unique();
        let short = short_key(&key);
        assert!(short.contains(".."));
        assert_eq!(short.len(), 10);
    }

    proptest! {
        #[test]
        fn prop_expired_iff_past_adjusted_bound(
            last_valid in 0u64..1_000_000,
            height in 0u64..1_000_000,
            margin in 0u64..1_000,
        ) {
            let window = BlockhashWindow::new(Hash::default(), last_valid);
            let expected = height > last_valid.saturating_sub(margin);
            prop_assert_eq!(window.is_expired_at(height, margin), expected);
        }
    }
}
