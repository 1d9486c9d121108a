//! Scenario scripts run against a cluster
//!
//! Each scenario is a fixed sequence of awaited steps; the first failing
//! step ends the scenario with its error. [`run_all`] runs every scenario in
//! order and reports on each one, including those after a failure.

use anyhow::{anyhow, ensure, Context, Result};
use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, info_span, Instrument};

use crate::config::Config;
use crate::funding::{
    airdrop_if_balance_not_enough, airdrop_sol, get_sol_balance, FundingError, FundingPolicy,
};
use crate::rpc::LedgerError;
use crate::token::{
    check_account_validity, create_mint, get_or_create_ata, get_token_balance, mint_tokens,
    to_token_amount, TokenError,
};
use crate::tx_builder::{SubmitError, TxSubmitter};
use crate::types::{short_key, LAMPORTS_PER_SOL};
use crate::vault::{self, pda::vault_address, InitializeAccounts, VaultAccount, VaultClientError};
use crate::wallet::Actors;

/// Decimals of the mint created by the `mint` scenario
pub const MINT_SCENARIO_DECIMALS: u8 = 6;

/// UI amount minted by the `mint` scenario
pub const MINT_SCENARIO_UI_AMOUNT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Airdrop,
    Mint,
    Ata,
    Initialize,
}

impl Scenario {
    /// Execution order of [`run_all`]
    pub const ALL: [Scenario; 4] = [
        Scenario::Airdrop,
        Scenario::Mint,
        Scenario::Ata,
        Scenario::Initialize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Airdrop => "airdrop",
            Scenario::Mint => "mint",
            Scenario::Ata => "ata",
            Scenario::Initialize => "initialize",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s.to_ascii_lowercase())
            .ok_or_else(|| {
                let names: Vec<&str> = Scenario::ALL.iter().map(|s| s.name()).collect();
                format!("unknown scenario '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Result of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub passed: bool,
    /// What the scenario verified, or the error that ended it
    pub detail: String,
    /// Error category of a failed run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<&'static str>,
    pub elapsed_ms: u64,
}

/// Program parameters the vault scenarios use
#[derive(Debug, Clone)]
pub struct VaultSettings {
    pub program_id: Pubkey,
    pub strategy_id: String,
    pub initial_deposit_ui: u64,
    pub pay_token_decimals: u8,
}

/// Everything a scenario needs, built once per process
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub submitter: TxSubmitter,
    pub actors: Actors,
    pub funding: FundingPolicy,
    pub vault: VaultSettings,
}

impl ScenarioContext {
    pub fn new(submitter: TxSubmitter, actors: Actors, funding: FundingPolicy, vault: VaultSettings) -> Self {
        Self {
            submitter,
            actors,
            funding,
            vault,
        }
    }

    pub fn from_config(config: &Config, submitter: TxSubmitter, actors: Actors) -> Result<Self> {
        let vault = VaultSettings {
            program_id: config.vault.program_id()?,
            strategy_id: config.vault.strategy_id.clone(),
            initial_deposit_ui: config.vault.initial_deposit_ui,
            pay_token_decimals: config.vault.pay_token_decimals,
        };
        Ok(Self::new(
            submitter,
            actors,
            FundingPolicy::from(&config.funding),
            vault,
        ))
    }

    fn min_sol(&self) -> u64 {
        (self.funding.min_balance_lamports / LAMPORTS_PER_SOL).max(1)
    }

    /// Top up every signer of the given scenario
    async fn fund(&self, accounts: &[Pubkey]) -> Result<()> {
        for account in accounts {
            let balance = airdrop_if_balance_not_enough(
                &self.submitter,
                account,
                self.min_sol(),
                &self.funding,
            )
            .await
            .with_context(|| format!("Failed to fund {}", account))?;
            info!(account = %short_key(account), balance, "Balance");
        }
        Ok(())
    }
}

/// Run one scenario, returning a one-line summary of what it verified
pub async fn run(ctx: &ScenarioContext, scenario: Scenario) -> Result<String> {
    let span = info_span!("scenario", scenario = %scenario);
    async {
        info!("Scenario started");
        let summary = match scenario {
            Scenario::Airdrop => airdrop_scenario(ctx).await,
            Scenario::Mint => mint_scenario(ctx).await,
            Scenario::Ata => ata_scenario(ctx).await,
            Scenario::Initialize => initialize_scenario(ctx).await,
        }?;
        info!(summary = %summary, "Scenario passed");
        Ok::<_, anyhow::Error>(summary)
    }
    .instrument(span)
    .await
}

/// Run one scenario and turn its result into a report
pub async fn run_report(ctx: &ScenarioContext, scenario: Scenario) -> ScenarioReport {
    let clock = ctx.submitter.clock();
    let started = clock.now();
    let result = run(ctx, scenario).await;
    let elapsed: Duration = clock.now().saturating_duration_since(started);

    let (passed, detail, category) = match result {
        Ok(summary) => (true, summary, None),
        Err(e) => {
            let detail = format!("{e:#}");
            let category = error_category(&e);
            error!(scenario = %scenario, category, error = %detail, "Scenario failed");
            (false, detail, Some(category))
        }
    };
    ScenarioReport {
        scenario,
        passed,
        detail,
        category,
        elapsed_ms: elapsed.as_millis() as u64,
    }
}

/// Category of the first typed error in the chain; "check" for a failed
/// expectation
fn error_category(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<FundingError>() {
                Some(e.category())
            } else if let Some(e) = cause.downcast_ref::<TokenError>() {
                Some(e.category())
            } else if let Some(e) = cause.downcast_ref::<SubmitError>() {
                Some(e.category())
            } else if let Some(e) = cause.downcast_ref::<LedgerError>() {
                Some(e.category())
            } else if cause.downcast_ref::<VaultClientError>().is_some() {
                Some("vault")
            } else {
                None
            }
        })
        .unwrap_or("check")
}

/// Run every scenario in order
pub async fn run_all(ctx: &ScenarioContext) -> Vec<ScenarioReport> {
    let mut reports = Vec::with_capacity(Scenario::ALL.len());
    for scenario in Scenario::ALL {
        reports.push(run_report(ctx, scenario).await);
    }
    reports
}

/// A fresh account with nothing in it ends up holding at least 1 SOL
async fn airdrop_scenario(ctx: &ScenarioContext) -> Result<String> {
    let ledger = ctx.submitter.ledger().as_ref();
    let fresh = Keypair::new().pubkey();

    let before = get_sol_balance(ledger, &fresh).await;
    ensure!(before == 0, "fresh account {} already holds {} lamports", fresh, before);

    let policy = ctx.funding.with_min_sol(1);
    airdrop_sol(&ctx.submitter, &fresh, &policy).await?;

    let after = get_sol_balance(ledger, &fresh).await;
    info!(account = %short_key(&fresh), before, after, "Airdrop balance");
    ensure!(
        after >= LAMPORTS_PER_SOL,
        "balance {} lamports is below 1 SOL after airdrop",
        after
    );
    Ok(format!("{} funded with {} lamports", fresh, after))
}

/// A 6-decimal mint credited with 100 UI tokens holds exactly 100_000_000
async fn mint_scenario(ctx: &ScenarioContext) -> Result<String> {
    let payer = &ctx.actors.payer;
    let user = &ctx.actors.user;
    ctx.fund(&[payer.pubkey()]).await?;

    let mint = Keypair::new();
    create_mint(&ctx.submitter, payer.keypair(), &mint, MINT_SCENARIO_DECIMALS).await?;
    let ata = get_or_create_ata(&ctx.submitter, &mint.pubkey(), &user.pubkey(), payer.keypair()).await?;
    mint_tokens(
        &ctx.submitter,
        payer.keypair(),
        MINT_SCENARIO_UI_AMOUNT,
        MINT_SCENARIO_DECIMALS,
        &mint.pubkey(),
        &ata,
    )
    .await?;

    let expected = to_token_amount(MINT_SCENARIO_UI_AMOUNT, MINT_SCENARIO_DECIMALS)?;
    let balance = get_token_balance(ctx.submitter.ledger().as_ref(), &ata).await;
    info!(ata = %short_key(&ata), balance, expected, "Token balance");
    ensure!(
        balance == expected,
        "token balance {} does not match expected {}",
        balance,
        expected
    );
    Ok(format!("{} holds {} base units of {}", ata, balance, mint.pubkey()))
}

/// Resolving the same (mint, owner) twice yields one account
async fn ata_scenario(ctx: &ScenarioContext) -> Result<String> {
    let payer = &ctx.actors.payer;
    let user = &ctx.actors.user;
    ctx.fund(&[payer.pubkey()]).await?;

    let mint = Keypair::new();
    create_mint(&ctx.submitter, payer.keypair(), &mint, MINT_SCENARIO_DECIMALS).await?;

    let ledger = ctx.submitter.ledger().as_ref();

    let first = get_or_create_ata(&ctx.submitter, &mint.pubkey(), &user.pubkey(), payer.keypair()).await?;
    ensure!(
        check_account_validity(ledger, &first).await,
        "ATA {} does not exist after creation",
        first
    );
    let account_before = ledger.get_account(&first).await?;
    let payer_before = get_sol_balance(ledger, &payer.pubkey()).await;

    // The account exists now, so this resolution must not submit anything
    let second = get_or_create_ata(&ctx.submitter, &mint.pubkey(), &user.pubkey(), payer.keypair()).await?;
    ensure!(first == second, "ATA resolved to {} then {}", first, second);

    let account_after = ledger.get_account(&second).await?;
    let payer_after = get_sol_balance(ledger, &payer.pubkey()).await;
    ensure!(
        account_before == account_after,
        "ATA {} changed on the second resolution",
        second
    );
    ensure!(
        payer_before == payer_after,
        "payer paid {} lamports on the second resolution",
        payer_before.saturating_sub(payer_after)
    );
    Ok(format!("{} resolved twice, created once", first))
}

/// The leader opens a vault with the configured initial deposit
async fn initialize_scenario(ctx: &ScenarioContext) -> Result<String> {
    let payer = &ctx.actors.payer;
    let leader = &ctx.actors.leader;
    let backend = &ctx.actors.backend_wallet;
    let settings = &ctx.vault;
    ctx.fund(&[payer.pubkey(), leader.pubkey(), backend.pubkey()]).await?;

    let pay_mint = Keypair::new();
    create_mint(&ctx.submitter, payer.keypair(), &pay_mint, settings.pay_token_decimals).await?;
    let leader_pay = get_or_create_ata(
        &ctx.submitter,
        &pay_mint.pubkey(),
        &leader.pubkey(),
        payer.keypair(),
    )
    .await?;
    mint_tokens(
        &ctx.submitter,
        payer.keypair(),
        settings.initial_deposit_ui as f64,
        settings.pay_token_decimals,
        &pay_mint.pubkey(),
        &leader_pay,
    )
    .await?;

    let deposit = to_token_amount(settings.initial_deposit_ui as f64, settings.pay_token_decimals)?;
    let ix = vault::instructions::initialize(
        &settings.program_id,
        &InitializeAccounts {
            leader: leader.pubkey(),
            backend_wallet: backend.pubkey(),
            leader_pay_token_account: leader_pay,
        },
        settings.strategy_id.clone(),
        deposit,
    )?;
    let signature = ctx
        .submitter
        .send_and_confirm(&[ix], leader.keypair(), &[backend.keypair()])
        .await?
        .into_result()?;
    info!(signature = %signature, "Vault initialized");

    let (vault_key, _) = vault_address(&settings.program_id, &leader.pubkey());
    let account = ctx
        .submitter
        .ledger()
        .get_account(&vault_key)
        .await?
        .ok_or_else(|| anyhow!("vault account {} not found after initialize", vault_key))?;
    let state = VaultAccount::decode(&account.data)?;

    ensure!(state.leader == leader.pubkey(), "vault leader is {}", state.leader);
    ensure!(
        state.backend_wallet == backend.pubkey(),
        "vault backend wallet is {}",
        state.backend_wallet
    );
    ensure!(
        state.strategy_id == settings.strategy_id,
        "vault strategy is '{}'",
        state.strategy_id
    );
    ensure!(!state.is_trading_paused, "vault starts with trading paused");
    Ok(format!("vault {} initialized by {}", vault_key, leader.pubkey()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ManualClock, MockLedger};
    use crate::tx_builder::SubmitterConfig;
    use crate::vault::TRADING_VAULT_PROGRAM_ID;
    use crate::wallet::InMemoryKeySource;
    use std::sync::Arc;

    async fn context() -> (Arc<MockLedger>, ScenarioContext) {
        let ledger = Arc::new(MockLedger::new());
        ledger.confirm_after_polls(1).await;
        let submitter = TxSubmitter::new(
            ledger.clone(),
            Arc::new(ManualClock::new()),
            SubmitterConfig::default(),
        );
        let actors = Actors::load(&InMemoryKeySource::generated()).unwrap();
        let settings = VaultSettings {
            program_id: TRADING_VAULT_PROGRAM_ID,
            strategy_id: "strategy-test".to_string(),
            initial_deposit_ui: 10,
            pay_token_decimals: 6,
        };
        let ctx = ScenarioContext::new(submitter, actors, FundingPolicy::default(), settings);
        (ledger, ctx)
    }

    #[test]
    fn test_scenario_names_parse() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
        }
        assert_eq!("MINT".parse::<Scenario>().unwrap(), Scenario::Mint);
        assert!("deposit".parse::<Scenario>().unwrap_err().contains("airdrop, mint"));
    }

    #[tokio::test]
    async fn test_mint_scenario_passes() {
        let (ledger, ctx) = context().await;
        let summary = run(&ctx, Scenario::Mint).await.unwrap();
        assert!(summary.contains("100000000"));
        // payer funded once
        assert_eq!(ledger.airdrops().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_step_ends_scenario() {
        let (ledger, ctx) = context().await;
        ledger.fail_airdrops(true).await;

        let report = run_report(&ctx, Scenario::Airdrop).await;
        assert!(!report.passed);
        assert!(report.detail.contains("Rate limit"));
        assert_eq!(report.category, Some("rate_limit"));
        // No transaction was sent
        assert!(ledger.sent_transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_without_vault_account_fails() {
        let (_ledger, ctx) = context().await;
        let err = run(&ctx, Scenario::Initialize).await.unwrap_err();
        assert!(format!("{err:#}").contains("not found after initialize"));
        assert_eq!(error_category(&err), "check");
    }
}
