//! Program-derived addresses used by the trading vault

use solana_sdk::pubkey::Pubkey;

use super::TOKEN_METADATA_PROGRAM_ID;

pub const VAULT_SEED: &[u8] = b"vault";
pub const USER_SEED: &[u8] = b"user";
pub const VAULT_AUTHORITY_SEED: &[u8] = b"vault_authority";
pub const MINT_SEED: &[u8] = b"mint";
pub const METADATA_SEED: &[u8] = b"metadata";

/// Vault state account, one per leader
pub fn vault_address(program_id: &Pubkey, leader: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, leader.as_ref()], program_id)
}

/// Per-depositor user state account
pub fn user_address(program_id: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[USER_SEED, owner.as_ref()], program_id)
}

/// Authority over the vault's token accounts
pub fn vault_authority_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_AUTHORITY_SEED], program_id)
}

/// Bond token mint; also its own mint and freeze authority
pub fn mint_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MINT_SEED], program_id)
}

/// Metaplex metadata account of `mint`, derived under the metadata program
pub fn metadata_address(mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            METADATA_SEED,
            TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::TRADING_VAULT_PROGRAM_ID;

    #[test]
    fn test_vault_address_depends_on_leader() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let program = TRADING_VAULT_PROGRAM_ID;

        assert_eq!(vault_address(&program, &a), vault_address(&program, &a));
        assert_ne!(vault_address(&program, &a).0, vault_address(&program, &b).0);
        // Same seed owner, different prefix
        assert_ne!(vault_address(&program, &a).0, user_address(&program, &a).0);
    }

    #[test]
    fn test_addresses_are_off_curve() {
        let program = TRADING_VAULT_PROGRAM_ID;
        let (mint, _) = mint_address(&program);
        for address in [
            vault_address(&program, &Pubkey::new_unique()).0,
            vault_authority_address(&program).0,
            mint,
            metadata_address(&mint).0,
        ] {
            assert!(!address.is_on_curve());
        }
    }

    #[test]
    fn test_bump_recreates_address() {
        let program = TRADING_VAULT_PROGRAM_ID;
        let owner = Pubkey::new_unique();
        let (address, bump) = user_address(&program, &owner);
        let recreated =
            Pubkey::create_program_address(&[USER_SEED, owner.as_ref(), &[bump]], &program)
                .unwrap();
        assert_eq!(address, recreated);
    }
}
