//! Decoded mirrors of the program's `Vault` and `User` accounts
//!
//! Account data is an 8-byte Anchor discriminator followed by the borsh body.
//! Accounts are allocated larger than their body, so trailing bytes are
//! ignored.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use super::{account_discriminator, VaultClientError};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
struct VaultBody {
    strategy_id: String,
    bond_price: u64,
    bond_supply: u64,
    tvl: u64,
    deposit_value: u64,
    leader: [u8; 32],
    is_trading_paused: bool,
    backend_wallet: [u8; 32],
    vault_authority: [u8; 32],
    vault_authority_bump: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultAccount {
    pub strategy_id: String,
    pub bond_price: u64,
    pub bond_supply: u64,
    pub tvl: u64,
    pub deposit_value: u64,
    pub leader: Pubkey,
    pub is_trading_paused: bool,
    pub backend_wallet: Pubkey,
    pub vault_authority: Pubkey,
    pub vault_authority_bump: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UserAccount {
    pub bond_amount: u64,
    pub deposit_value: u64,
    pub deposit_time: i64,
}

impl VaultAccount {
    pub const NAME: &'static str = "Vault";

    pub fn decode(data: &[u8]) -> Result<Self, VaultClientError> {
        let body: VaultBody = decode_body(Self::NAME, data)?;
        Ok(Self {
            strategy_id: body.strategy_id,
            bond_price: body.bond_price,
            bond_supply: body.bond_supply,
            tvl: body.tvl,
            deposit_value: body.deposit_value,
            leader: Pubkey::new_from_array(body.leader),
            is_trading_paused: body.is_trading_paused,
            backend_wallet: Pubkey::new_from_array(body.backend_wallet),
            vault_authority: Pubkey::new_from_array(body.vault_authority),
            vault_authority_bump: body.vault_authority_bump,
        })
    }

    /// Account data as the program would write it, for seeding test ledgers
    pub fn encode(&self) -> Result<Vec<u8>, VaultClientError> {
        let body = VaultBody {
            strategy_id: self.strategy_id.clone(),
            bond_price: self.bond_price,
            bond_supply: self.bond_supply,
            tvl: self.tvl,
            deposit_value: self.deposit_value,
            leader: self.leader.to_bytes(),
            is_trading_paused: self.is_trading_paused,
            backend_wallet: self.backend_wallet.to_bytes(),
            vault_authority: self.vault_authority.to_bytes(),
            vault_authority_bump: self.vault_authority_bump,
        };
        encode_body(Self::NAME, &body)
    }
}

impl UserAccount {
    pub const NAME: &'static str = "User";

    pub fn decode(data: &[u8]) -> Result<Self, VaultClientError> {
        decode_body(Self::NAME, data)
    }

    pub fn encode(&self) -> Result<Vec<u8>, VaultClientError> {
        encode_body(Self::NAME, self)
    }
}

fn decode_body<T: BorshDeserialize>(name: &'static str, data: &[u8]) -> Result<T, VaultClientError> {
    let discriminator = account_discriminator(name);
    if data.len() < 8 || data[..8] != discriminator {
        return Err(VaultClientError::Discriminator { expected: name });
    }
    let mut body = &data[8..];
    T::deserialize(&mut body).map_err(|e| VaultClientError::Decode {
        account: name,
        reason: e.to_string(),
    })
}

fn encode_body<T: BorshSerialize>(name: &'static str, body: &T) -> Result<Vec<u8>, VaultClientError> {
    let mut data = account_discriminator(name).to_vec();
    body.serialize(&mut data)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> VaultAccount {
        VaultAccount {
            strategy_id: "strategy-localnet".to_string(),
            bond_price: 1,
            bond_supply: 0,
            tvl: 10_000_000,
            deposit_value: 0,
            leader: Pubkey::new_unique(),
            is_trading_paused: false,
            backend_wallet: Pubkey::new_unique(),
            vault_authority: Pubkey::new_unique(),
            vault_authority_bump: 254,
        }
    }

    #[test]
    fn test_vault_decode_ignores_trailing_space() {
        let expected = vault();
        let mut data = expected.encode().unwrap();
        data.resize(data.len() + 64, 0);

        assert_eq!(VaultAccount::decode(&data).unwrap(), expected);
    }

    #[test]
    fn test_discriminator_mismatch_rejected() {
        let user = UserAccount {
            bond_amount: 10,
            deposit_value: 10_000_000,
            deposit_time: 1_700_000_000,
        };
        let data = user.encode().unwrap();

        assert_eq!(UserAccount::decode(&data).unwrap(), user);
        assert!(matches!(
            VaultAccount::decode(&data),
            Err(VaultClientError::Discriminator { expected: "Vault" })
        ));
        assert!(matches!(
            UserAccount::decode(&[0u8; 4]),
            Err(VaultClientError::Discriminator { .. })
        ));
    }

    #[test]
    fn test_truncated_body_is_a_decode_error() {
        let data = vault().encode().unwrap();
        let err = VaultAccount::decode(&data[..20]).unwrap_err();
        assert!(matches!(err, VaultClientError::Decode { account: "Vault", .. }));
    }
}
