//! Test Utilities Module
//!
//! In-memory ledger and manual clock for deterministic tests of the funding,
//! token and submission helpers. Nothing here touches the network or sleeps.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    system_program,
    transaction::VersionedTransaction,
};
use spl_token::instruction::TokenInstruction;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::rpc::{Clock, LedgerClient, LedgerError, LedgerResult};
use crate::types::{BlockhashWindow, ConfirmationStatus, SignatureStatus};

const MOCK_ENDPOINT: &str = "mock://ledger";

/// Size of an SPL token account
const TOKEN_ACCOUNT_LEN: usize = 165;

#[derive(Debug)]
struct MockState {
    block_height: u64,
    height_step: u64,
    blockhash_lifetime: u64,
    balances: HashMap<Pubkey, u64>,
    accounts: HashMap<Pubkey, Account>,
    staged_accounts: HashMap<Pubkey, Account>,
    token_balances: HashMap<Pubkey, u64>,
    mint_decimals: HashMap<Pubkey, u8>,
    sent: Vec<VersionedTransaction>,
    poll_counts: HashMap<Signature, u32>,
    known_signatures: Vec<Signature>,
    created_accounts: Vec<Pubkey>,
    airdrops: Vec<(Pubkey, u64)>,
    signature_counter: u64,
    confirm_after_polls: Option<u32>,
    finalize: bool,
    execution_error: Option<String>,
    airdrop_credit: Option<u64>,
    fail_airdrops: bool,
    fail_status_polls: bool,
    fail_balance_reads: bool,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            block_height: 0,
            height_step: 1,
            blockhash_lifetime: 300,
            balances: HashMap::new(),
            accounts: HashMap::new(),
            staged_accounts: HashMap::new(),
            token_balances: HashMap::new(),
            mint_decimals: HashMap::new(),
            sent: Vec::new(),
            poll_counts: HashMap::new(),
            known_signatures: Vec::new(),
            created_accounts: Vec::new(),
            airdrops: Vec::new(),
            signature_counter: 0,
            confirm_after_polls: None,
            finalize: false,
            execution_error: None,
            airdrop_credit: None,
            fail_airdrops: false,
            fail_status_polls: false,
            fail_balance_reads: false,
        }
    }
}

impl MockState {
    fn next_signature(&mut self) -> Signature {
        self.signature_counter += 1;
        let mut bytes = [0xA5u8; 64];
        bytes[..8].copy_from_slice(&self.signature_counter.to_le_bytes());
        Signature::from(bytes)
    }

    fn apply(&mut self, tx: &VersionedTransaction) {
        let keys = tx.message.static_account_keys().to_vec();
        for key in &keys {
            if let Some(account) = self.staged_accounts.remove(key) {
                self.accounts.insert(*key, account);
            }
        }
        for ix in tx.message.instructions() {
            let program_id = keys[ix.program_id_index as usize];
            let accounts: Vec<Pubkey> = ix
                .accounts
                .iter()
                .map(|&i| keys[i as usize])
                .collect();

            if program_id == spl_associated_token_account::id() {
                // [funding, ata, wallet, mint, system, token]
                if let Some(ata) = accounts.get(1) {
                    self.create_account(*ata, spl_token::id(), TOKEN_ACCOUNT_LEN, 2_039_280);
                    self.token_balances.entry(*ata).or_insert(0);
                }
            } else if program_id == system_program::id() {
                self.apply_system(&ix.data, &accounts);
            } else if program_id == spl_token::id() {
                self.apply_token(&ix.data, &accounts);
            }
        }
    }

    fn apply_system(&mut self, data: &[u8], accounts: &[Pubkey]) {
        // CreateAccount: u32 tag, u64 lamports, u64 space, owner
        if data.len() >= 52 && data[..4] == [0, 0, 0, 0] {
            let lamports = u64::from_le_bytes(data[4..12].try_into().unwrap_or_default());
            let space = u64::from_le_bytes(data[12..20].try_into().unwrap_or_default());
            let owner = Pubkey::try_from(&data[20..52]).unwrap_or_default();
            if let (Some(from), Some(new)) = (accounts.first(), accounts.get(1)) {
                let balance = self.balances.entry(*from).or_insert(0);
                *balance = balance.saturating_sub(lamports);
                self.create_account(*new, owner, space as usize, lamports);
            }
        }
    }

    fn apply_token(&mut self, data: &[u8], accounts: &[Pubkey]) {
        match TokenInstruction::unpack(data) {
            Ok(TokenInstruction::InitializeMint2 { decimals, .. })
            | Ok(TokenInstruction::InitializeMint { decimals, .. }) => {
                if let Some(mint) = accounts.first() {
                    self.mint_decimals.insert(*mint, decimals);
                }
            }
            Ok(TokenInstruction::MintToChecked { amount, .. })
            | Ok(TokenInstruction::MintTo { amount }) => {
                if let Some(destination) = accounts.get(1) {
                    *self.token_balances.entry(*destination).or_insert(0) += amount;
                }
            }
            _ => {}
        }
    }

    fn create_account(&mut self, address: Pubkey, owner: Pubkey, space: usize, lamports: u64) {
        if self.accounts.contains_key(&address) {
            return;
        }
        self.accounts.insert(
            address,
            Account {
                lamports,
                data: vec![0; space],
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
        self.created_accounts.push(address);
    }
}

/// In-memory [`LedgerClient`]
///
/// Transactions take effect as soon as they are sent. Signatures report
/// `Pending` until they have been polled `confirm_after_polls` times; with no
/// threshold set they never land. Every `get_block_height` call advances the
/// height by the configured step.
///
/// Understood instructions: associated token account creation, system
/// `CreateAccount`, token `InitializeMint(2)` and `MintTo(Checked)`. Effects
/// of other programs can be simulated with [`MockLedger::stage_account`].
#[derive(Debug, Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn confirm_after_polls(&self, polls: u32) {
        self.state.lock().await.confirm_after_polls = Some(polls);
    }

    /// Report landed transactions as finalized rather than confirmed
    pub async fn finalize_landed(&self, finalize: bool) {
        self.state.lock().await.finalize = finalize;
    }

    pub async fn set_block_height(&self, height: u64) {
        self.state.lock().await.block_height = height;
    }

    pub async fn set_height_step(&self, step: u64) {
        self.state.lock().await.height_step = step;
    }

    pub async fn set_blockhash_lifetime(&self, blocks: u64) {
        self.state.lock().await.blockhash_lifetime = blocks;
    }

    pub async fn set_balance(&self, pubkey: Pubkey, lamports: u64) {
        self.state.lock().await.balances.insert(pubkey, lamports);
    }

    pub async fn set_account(&self, pubkey: Pubkey, account: Account) {
        self.state.lock().await.accounts.insert(pubkey, account);
    }

    /// Install `account` once a successful transaction references `pubkey`,
    /// standing in for a program we do not execute
    pub async fn stage_account(&self, pubkey: Pubkey, account: Account) {
        self.state.lock().await.staged_accounts.insert(pubkey, account);
    }

    pub async fn set_execution_error(&self, error: Option<String>) {
        self.state.lock().await.execution_error = error;
    }

    /// Credit each airdrop with `lamports` instead of the requested amount
    pub async fn set_airdrop_credit(&self, lamports: Option<u64>) {
        self.state.lock().await.airdrop_credit = lamports;
    }

    pub async fn fail_airdrops(&self, fail: bool) {
        self.state.lock().await.fail_airdrops = fail;
    }

    pub async fn fail_status_polls(&self, fail: bool) {
        self.state.lock().await.fail_status_polls = fail;
    }

    pub async fn fail_balance_reads(&self, fail: bool) {
        self.state.lock().await.fail_balance_reads = fail;
    }

    pub async fn sent_transactions(&self) -> Vec<VersionedTransaction> {
        self.state.lock().await.sent.clone()
    }

    /// Accounts created by transactions, in creation order
    pub async fn created_accounts(&self) -> Vec<Pubkey> {
        self.state.lock().await.created_accounts.clone()
    }

    pub async fn airdrops(&self) -> Vec<(Pubkey, u64)> {
        self.state.lock().await.airdrops.clone()
    }

    pub async fn mint_decimals(&self, mint: &Pubkey) -> Option<u8> {
        self.state.lock().await.mint_decimals.get(mint).copied()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    fn endpoint(&self) -> String {
        MOCK_ENDPOINT.to_string()
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> LedgerResult<u64> {
        let state = self.state.lock().await;
        if state.fail_balance_reads {
            return Err(LedgerError::Transport {
                endpoint: MOCK_ENDPOINT.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(state.balances.get(pubkey).copied().unwrap_or(0))
    }

    async fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64) -> LedgerResult<Signature> {
        let mut state = self.state.lock().await;
        if state.fail_airdrops {
            return Err(LedgerError::RateLimitExceeded {
                endpoint: MOCK_ENDPOINT.to_string(),
            });
        }
        let credit = state.airdrop_credit.unwrap_or(lamports);
        *state.balances.entry(*pubkey).or_insert(0) += credit;
        state.airdrops.push((*pubkey, lamports));

        let signature = state.next_signature();
        state.known_signatures.push(signature);
        Ok(signature)
    }

    async fn get_latest_blockhash(&self) -> LedgerResult<BlockhashWindow> {
        let state = self.state.lock().await;
        Ok(BlockhashWindow::new(
            Hash::new_unique(),
            state.block_height + state.blockhash_lifetime,
        ))
    }

    async fn get_block_height(&self) -> LedgerResult<u64> {
        let mut state = self.state.lock().await;
        state.block_height += state.height_step;
        Ok(state.block_height)
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        _skip_preflight: bool,
    ) -> LedgerResult<Signature> {
        let mut state = self.state.lock().await;
        let signature = transaction.signatures.first().copied().ok_or_else(|| {
            LedgerError::RpcResponse {
                endpoint: MOCK_ENDPOINT.to_string(),
                message: "transaction has no signatures".to_string(),
                code: Some(-32602),
            }
        })?;

        state.sent.push(transaction.clone());
        if !state.known_signatures.contains(&signature) {
            state.known_signatures.push(signature);
            if state.execution_error.is_none() {
                state.apply(transaction);
            }
        }
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> LedgerResult<Option<SignatureStatus>> {
        let mut state = self.state.lock().await;
        if state.fail_status_polls {
            return Err(LedgerError::Transport {
                endpoint: MOCK_ENDPOINT.to_string(),
                message: "connection reset".to_string(),
            });
        }
        if !state.known_signatures.contains(signature) {
            return Ok(None);
        }

        let polls = {
            let count = state.poll_counts.entry(*signature).or_insert(0);
            *count += 1;
            *count
        };
        let landed = state
            .confirm_after_polls
            .map(|threshold| polls >= threshold)
            .unwrap_or(false);

        let status = if !landed {
            ConfirmationStatus::Pending
        } else if state.finalize {
            ConfirmationStatus::Finalized
        } else {
            ConfirmationStatus::Confirmed
        };
        Ok(Some(SignatureStatus {
            status,
            err: if landed { state.execution_error.clone() } else { None },
        }))
    }

    async fn get_account(&self, pubkey: &Pubkey) -> LedgerResult<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(pubkey).cloned())
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> LedgerResult<u64> {
        self.state
            .lock()
            .await
            .token_balances
            .get(token_account)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound {
                account: token_account.to_string(),
                endpoint: MOCK_ENDPOINT.to_string(),
            })
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> LedgerResult<u64> {
        // (128 byte overhead + data) * 3480 lamports/byte-year * 2 years
        Ok((128 + data_len as u64) * 3480 * 2)
    }
}

/// Clock whose time only moves when something sleeps on it
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: StdMutex<Duration>,
    sleeps: AtomicU32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: StdMutex::new(Duration::ZERO),
            sleeps: AtomicU32::new(0),
        }
    }

    /// Number of completed sleeps
    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }

    /// Total simulated time
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|d| *d).unwrap_or_default()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += duration;
        }
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}
