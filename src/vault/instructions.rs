//! Instruction encoding for the trading vault program
//!
//! Instruction data is the 8-byte Anchor discriminator of the method name
//! followed by the borsh-encoded params struct. Account metas follow the
//! program's declared account order exactly; PDAs are derived here so
//! callers only supply the accounts they own.

use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use super::pda::{mint_address, metadata_address, user_address, vault_address, vault_authority_address};
use super::{instruction_discriminator, VaultClientError, TOKEN_METADATA_PROGRAM_ID};

/// Smallest initial deposit the program accepts: 10 pay-token units at 6
/// decimals
pub const MIN_INITIAL_DEPOSIT: u64 = 10 * 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize)]
pub struct InitializeParams {
    pub strategy_id: String,
    pub initial_deposit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct AmountParams {
    pub amount: u64,
}

/// Accounts `initialize` needs from the caller
///
/// The vault, user, vault authority, bond mint, metadata and the leader's
/// bond token account are derived.
#[derive(Debug, Clone, Copy)]
pub struct InitializeAccounts {
    /// Signs and pays for the vault and user accounts
    pub leader: Pubkey,
    /// Signs and pays for the bond mint and its metadata
    pub backend_wallet: Pubkey,
    /// Leader's account for the deposit (pay) token
    pub leader_pay_token_account: Pubkey,
}

#[derive(Debug, Clone, Copy)]
pub struct DepositAccounts {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub depositor_pay_token_account: Pubkey,
    pub vault_pay_token_account: Pubkey,
    pub depositor_token_account: Pubkey,
    pub vault_token_account: Pubkey,
}

#[derive(Debug, Clone, Copy)]
pub struct WithdrawAccounts {
    pub vault: Pubkey,
    pub depositor: Pubkey,
    pub depositor_pay_token_account: Pubkey,
    pub vault_pay_token_account: Pubkey,
    pub depositor_token_account: Pubkey,
}

#[derive(Debug, Clone, Copy)]
pub struct ClosePositionAccounts {
    pub vault: Pubkey,
    pub leader: Pubkey,
    pub depositor: Pubkey,
    pub vault_pay_token_account: Pubkey,
    pub depositor_pay_token_account: Pubkey,
    pub depositor_token_account: Pubkey,
}

/// Create the leader's vault, mint the bond token and record the initial
/// deposit
///
/// # Errors
///
/// [`VaultClientError::InsufficientDeposit`] when `initial_deposit` is below
/// [`MIN_INITIAL_DEPOSIT`]; the program would reject it anyway.
pub fn initialize(
    program_id: &Pubkey,
    accounts: &InitializeAccounts,
    strategy_id: impl Into<String>,
    initial_deposit: u64,
) -> Result<Instruction, VaultClientError> {
    if initial_deposit < MIN_INITIAL_DEPOSIT {
        return Err(VaultClientError::InsufficientDeposit {
            amount: initial_deposit,
            minimum: MIN_INITIAL_DEPOSIT,
        });
    }

    let (user, _) = user_address(program_id, &accounts.leader);
    let (vault, _) = vault_address(program_id, &accounts.leader);
    let (vault_authority, _) = vault_authority_address(program_id);
    let (mint, _) = mint_address(program_id);
    let (metadata, _) = metadata_address(&mint);
    let leader_token_account =
        spl_associated_token_account::get_associated_token_address(&accounts.leader, &mint);

    let metas = vec![
        AccountMeta::new(accounts.leader, true),
        AccountMeta::new(user, false),
        AccountMeta::new(accounts.backend_wallet, true),
        AccountMeta::new(vault, false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new(mint, false),
        AccountMeta::new(metadata, false),
        AccountMeta::new(accounts.leader_pay_token_account, false),
        AccountMeta::new(leader_token_account, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(TOKEN_METADATA_PROGRAM_ID, false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
    ];

    let params = InitializeParams {
        strategy_id: strategy_id.into(),
        initial_deposit,
    };
    encode(program_id, "initialize", &params, metas)
}

pub fn deposit(
    program_id: &Pubkey,
    accounts: &DepositAccounts,
    amount: u64,
) -> Result<Instruction, VaultClientError> {
    let (user, _) = user_address(program_id, &accounts.depositor);
    let metas = vec![
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new(accounts.depositor, true),
        AccountMeta::new(user, false),
        AccountMeta::new(accounts.depositor_pay_token_account, false),
        AccountMeta::new(accounts.vault_pay_token_account, false),
        AccountMeta::new(accounts.depositor_token_account, false),
        AccountMeta::new(accounts.vault_token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    encode(program_id, "deposit", &AmountParams { amount }, metas)
}

pub fn withdraw(
    program_id: &Pubkey,
    accounts: &WithdrawAccounts,
    amount: u64,
) -> Result<Instruction, VaultClientError> {
    let (vault_authority, _) = vault_authority_address(program_id);
    let (user, _) = user_address(program_id, &accounts.depositor);
    let (mint, _) = mint_address(program_id);
    let metas = vec![
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new(accounts.depositor, true),
        AccountMeta::new(user, false),
        AccountMeta::new(mint, false),
        AccountMeta::new(accounts.depositor_pay_token_account, false),
        AccountMeta::new(accounts.vault_pay_token_account, false),
        AccountMeta::new(accounts.depositor_token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    encode(program_id, "withdraw", &AmountParams { amount }, metas)
}

pub fn pause_trading(program_id: &Pubkey, vault: &Pubkey, leader: &Pubkey) -> Instruction {
    leader_only(program_id, "pause_trading", vault, leader)
}

pub fn terminate_vault(program_id: &Pubkey, vault: &Pubkey, leader: &Pubkey) -> Instruction {
    leader_only(program_id, "terminate_vault", vault, leader)
}

/// Settle a depositor's position; signed by the leader only
pub fn close_position(program_id: &Pubkey, accounts: &ClosePositionAccounts) -> Instruction {
    let (vault_authority, _) = vault_authority_address(program_id);
    let (user, _) = user_address(program_id, &accounts.depositor);
    let (mint, _) = mint_address(program_id);
    let metas = vec![
        AccountMeta::new(accounts.vault, false),
        AccountMeta::new_readonly(vault_authority, false),
        AccountMeta::new_readonly(accounts.leader, true),
        AccountMeta::new(accounts.depositor, false),
        AccountMeta::new_readonly(user, false),
        AccountMeta::new(accounts.vault_pay_token_account, false),
        AccountMeta::new(accounts.depositor_pay_token_account, false),
        AccountMeta::new(mint, false),
        AccountMeta::new(accounts.depositor_token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    Instruction {
        program_id: *program_id,
        accounts: metas,
        data: instruction_discriminator("close_position").to_vec(),
    }
}

fn leader_only(program_id: &Pubkey, name: &str, vault: &Pubkey, leader: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*vault, false),
            AccountMeta::new_readonly(*leader, true),
        ],
        data: instruction_discriminator(name).to_vec(),
    }
}

fn encode<P: BorshSerialize>(
    program_id: &Pubkey,
    name: &str,
    params: &P,
    accounts: Vec<AccountMeta>,
) -> Result<Instruction, VaultClientError> {
    let mut data = instruction_discriminator(name).to_vec();
    params.serialize(&mut data)?;
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::TRADING_VAULT_PROGRAM_ID;

    fn initialize_accounts() -> InitializeAccounts {
        InitializeAccounts {
            leader: Pubkey::new_unique(),
            backend_wallet: Pubkey::new_unique(),
            leader_pay_token_account: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_initialize_data_layout() {
        let accounts = initialize_accounts();
        let ix = initialize(&TRADING_VAULT_PROGRAM_ID, &accounts, "abc", 10_000_000).unwrap();

        assert_eq!(ix.program_id, TRADING_VAULT_PROGRAM_ID);
        assert_eq!(ix.data[..8], instruction_discriminator("initialize"));
        // u32 length prefix, string bytes, u64 deposit
        assert_eq!(ix.data[8..12], 3u32.to_le_bytes());
        assert_eq!(ix.data[12..15], *b"abc");
        assert_eq!(ix.data[15..], 10_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_initialize_signers_and_derived_accounts() {
        let accounts = initialize_accounts();
        let ix = initialize(&TRADING_VAULT_PROGRAM_ID, &accounts, "s", MIN_INITIAL_DEPOSIT).unwrap();

        let signers: Vec<Pubkey> = ix
            .accounts
            .iter()
            .filter(|m| m.is_signer)
            .map(|m| m.pubkey)
            .collect();
        assert_eq!(signers, vec![accounts.leader, accounts.backend_wallet]);

        assert_eq!(ix.accounts.len(), 14);
        assert_eq!(
            ix.accounts[3].pubkey,
            vault_address(&TRADING_VAULT_PROGRAM_ID, &accounts.leader).0
        );
        assert!(!ix.accounts[4].is_writable);
        assert_eq!(ix.accounts[11].pubkey, TOKEN_METADATA_PROGRAM_ID);
    }

    #[test]
    fn test_initialize_rejects_small_deposit() {
        let err = initialize(
            &TRADING_VAULT_PROGRAM_ID,
            &initialize_accounts(),
            "s",
            MIN_INITIAL_DEPOSIT - 1,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VaultClientError::InsufficientDeposit { amount: 9_999_999, .. }
        ));
    }

    #[test]
    fn test_amount_instructions() {
        let depositor = Pubkey::new_unique();
        let vault = Pubkey::new_unique();
        let deposit_ix = deposit(
            &TRADING_VAULT_PROGRAM_ID,
            &DepositAccounts {
                vault,
                depositor,
                depositor_pay_token_account: Pubkey::new_unique(),
                vault_pay_token_account: Pubkey::new_unique(),
                depositor_token_account: Pubkey::new_unique(),
                vault_token_account: Pubkey::new_unique(),
            },
            5,
        )
        .unwrap();
        assert_eq!(deposit_ix.data[..8], instruction_discriminator("deposit"));
        assert_eq!(deposit_ix.data[8..], 5u64.to_le_bytes());
        assert!(deposit_ix.accounts[1].is_signer);

        let withdraw_ix = withdraw(
            &TRADING_VAULT_PROGRAM_ID,
            &WithdrawAccounts {
                vault,
                depositor,
                depositor_pay_token_account: Pubkey::new_unique(),
                vault_pay_token_account: Pubkey::new_unique(),
                depositor_token_account: Pubkey::new_unique(),
            },
            7,
        )
        .unwrap();
        assert_eq!(withdraw_ix.data[..8], instruction_discriminator("withdraw"));
        assert_eq!(withdraw_ix.accounts[2].pubkey, depositor);
        assert_eq!(
            withdraw_ix.accounts[3].pubkey,
            user_address(&TRADING_VAULT_PROGRAM_ID, &depositor).0
        );
    }

    #[test]
    fn test_leader_instructions_carry_no_params() {
        let vault = Pubkey::new_unique();
        let leader = Pubkey::new_unique();

        let pause = pause_trading(&TRADING_VAULT_PROGRAM_ID, &vault, &leader);
        let terminate = terminate_vault(&TRADING_VAULT_PROGRAM_ID, &vault, &leader);
        assert_eq!(pause.data.len(), 8);
        assert_ne!(pause.data, terminate.data);
        assert!(pause.accounts[1].is_signer && !pause.accounts[1].is_writable);

        let close = close_position(
            &TRADING_VAULT_PROGRAM_ID,
            &ClosePositionAccounts {
                vault,
                leader,
                depositor: Pubkey::new_unique(),
                vault_pay_token_account: Pubkey::new_unique(),
                depositor_pay_token_account: Pubkey::new_unique(),
                depositor_token_account: Pubkey::new_unique(),
            },
        );
        assert_eq!(close.data, instruction_discriminator("close_position"));
        assert_eq!(close.accounts.iter().filter(|m| m.is_signer).count(), 1);
    }
}
