//! Token mints, associated token accounts and balances
//!
//! An associated token account (ATA) is a deterministic function of
//! `(owner, mint)`; creation uses the idempotent instruction so resolving the
//! same pair twice never fails.

use solana_sdk::{
    instruction::Instruction,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::rpc::{LedgerClient, LedgerError};
use crate::tx_builder::{SubmitError, TxSubmitter};
use crate::types::short_key;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid token amount {ui_amount} at {decimals} decimals")]
    InvalidAmount { ui_amount: f64, decimals: u8 },
}

impl TokenError {
    pub fn category(&self) -> &'static str {
        match self {
            TokenError::Submit(e) => e.category(),
            TokenError::Ledger(e) => e.category(),
            TokenError::InvalidAmount { .. } => "amount",
        }
    }
}

/// Address of the ATA holding `mint` for `owner`
pub fn associated_token_address(mint: &Pubkey, owner: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// ATA address and the idempotent instruction that creates it
pub fn associated_token_account_instruction(
    payer: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
) -> (Pubkey, Instruction) {
    let address = associated_token_address(mint, owner);
    let ix = create_associated_token_account_idempotent(payer, owner, mint, &spl_token::id());
    (address, ix)
}

/// Return the ATA for `(mint, owner)`, creating it if it does not exist yet
pub async fn get_or_create_ata(
    submitter: &TxSubmitter,
    mint: &Pubkey,
    owner: &Pubkey,
    payer: &dyn Signer,
) -> Result<Pubkey, TokenError> {
    let (address, ix) = associated_token_account_instruction(&payer.pubkey(), mint, owner);

    if submitter.ledger().get_account(&address).await?.is_some() {
        debug!(ata = %short_key(&address), owner = %short_key(owner), "ATA exists");
        return Ok(address);
    }

    let signature = submitter
        .send_instruction_and_confirm(ix, payer)
        .await?
        .into_result()?;
    info!(
        ata = %address,
        owner = %short_key(owner),
        mint = %short_key(mint),
        signature = %signature,
        "ATA created"
    );
    Ok(address)
}

/// Create a mint with `payer` as mint authority and no freeze authority
pub async fn create_mint(
    submitter: &TxSubmitter,
    payer: &dyn Signer,
    mint: &Keypair,
    decimals: u8,
) -> Result<Pubkey, TokenError> {
    let mint_pubkey = mint.pubkey();
    let rent = submitter
        .ledger()
        .get_minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
        .await?;

    let create = system_instruction::create_account(
        &payer.pubkey(),
        &mint_pubkey,
        rent,
        spl_token::state::Mint::LEN as u64,
        &spl_token::id(),
    );
    let initialize = spl_token::instruction::initialize_mint2(
        &spl_token::id(),
        &mint_pubkey,
        &payer.pubkey(),
        None,
        decimals,
    )
    .map_err(|e| SubmitError::instruction_failed("spl_token", e.to_string()))?;

    let signature = submitter
        .send_and_confirm(&[create, initialize], payer, &[mint])
        .await?
        .into_result()?;
    info!(mint = %mint_pubkey, decimals, signature = %signature, "Mint created");
    Ok(mint_pubkey)
}

/// Mint `ui_amount` whole tokens into `destination`, checking `decimals`
/// against the mint
pub async fn mint_tokens(
    submitter: &TxSubmitter,
    authority: &dyn Signer,
    ui_amount: f64,
    decimals: u8,
    mint: &Pubkey,
    destination: &Pubkey,
) -> Result<Signature, TokenError> {
    let amount = to_token_amount(ui_amount, decimals)?;
    let ix = spl_token::instruction::mint_to_checked(
        &spl_token::id(),
        mint,
        destination,
        &authority.pubkey(),
        &[],
        amount,
        decimals,
    )
    .map_err(|e| SubmitError::instruction_failed("spl_token", e.to_string()))?;

    let signature = submitter
        .send_instruction_and_confirm(ix, authority)
        .await?
        .into_result()?;
    debug!(
        mint = %short_key(mint),
        destination = %short_key(destination),
        amount,
        "Tokens minted"
    );
    Ok(signature)
}

/// Token balance in base units; a missing or unreadable account reads as 0
pub async fn get_token_balance(ledger: &dyn LedgerClient, token_account: &Pubkey) -> u64 {
    match ledger.get_token_balance(token_account).await {
        Ok(amount) => amount,
        Err(e) => {
            debug!(account = %short_key(token_account), error = %e, "Token balance read failed, treating as 0");
            0
        }
    }
}

/// Whether `account` exists on the ledger
pub async fn check_account_validity(ledger: &dyn LedgerClient, account: &Pubkey) -> bool {
    matches!(ledger.get_account(account).await, Ok(Some(_)))
}

/// UI amount to base units
pub fn to_token_amount(ui_amount: f64, decimals: u8) -> Result<u64, TokenError> {
    if !ui_amount.is_finite() || ui_amount < 0.0 {
        return Err(TokenError::InvalidAmount { ui_amount, decimals });
    }
    let scaled = ui_amount * 10f64.powi(decimals as i32);
    if scaled >= u64::MAX as f64 {
        return Err(TokenError::InvalidAmount { ui_amount, decimals });
    }
    Ok(scaled.round() as u64)
}

/// Base units to UI amount
pub fn to_ui_amount(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(decimals as i32)
}
