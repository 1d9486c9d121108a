//! Message compilation and signing
//!
//! Transactions are always v0 messages with the payer first, bound to the
//! blockhash of a [`BlockhashWindow`].

use solana_sdk::{
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signer::Signer,
    transaction::VersionedTransaction,
};

use super::errors::SubmitError;
use crate::types::BlockhashWindow;

/// Compile `instructions` into a v0 message paid by `payer` and sign it
pub fn build_signed_transaction(
    payer: &Pubkey,
    instructions: &[Instruction],
    signers: &[&dyn Signer],
    window: &BlockhashWindow,
) -> Result<VersionedTransaction, SubmitError> {
    if instructions.is_empty() {
        return Err(SubmitError::Compile("no instructions".to_string()));
    }

    let message = MessageV0::try_compile(payer, instructions, &[], window.blockhash)
        .map_err(|e| SubmitError::Compile(e.to_string()))?;

    // The signer set must match the required signatures exactly
    let mut unique: Vec<&dyn Signer> = Vec::with_capacity(signers.len());
    for signer in signers {
        if !unique.iter().any(|s| s.pubkey() == signer.pubkey()) {
            unique.push(*signer);
        }
    }

    VersionedTransaction::try_new(VersionedMessage::V0(message), unique.as_slice())
        .map_err(|e| SubmitError::Signing(e.to_string()))
}

/// Accounts whose signatures the message requires, fee payer first
pub fn required_signers(tx: &VersionedTransaction) -> &[Pubkey] {
    let count = tx.message.header().num_required_signatures as usize;
    let keys = tx.message.static_account_keys();
    &keys[..count.min(keys.len())]
}
