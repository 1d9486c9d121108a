//! Trading Vault test client CLI
//!
//! Runs scenario scripts against a cluster:
//!
//! ```text
//! vault-client run mint
//! vault-client run-all --json
//! vault-client balance <PUBKEY>
//! ```

#![warn(unused_imports)]
#![warn(unused_must_use)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use trading_vault_client::config::Config;
use trading_vault_client::funding::get_sol_balance;
use trading_vault_client::observability::init_logging;
use trading_vault_client::rpc::{RpcLedger, TokioClock};
use trading_vault_client::scenarios::{self, Scenario, ScenarioContext, ScenarioReport};
use trading_vault_client::tx_builder::{SubmitterConfig, TxSubmitter};
use trading_vault_client::types::LAMPORTS_PER_SOL;
use trading_vault_client::wallet::{Actors, FileKeySource};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "vault-client.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON log lines and JSON reports
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single scenario
    Run {
        /// airdrop, mint, ata or initialize
        scenario: Scenario,
    },
    /// Run every scenario in order
    RunAll,
    /// Print the SOL balance of an account
    Balance { pubkey: Pubkey },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    if args.json {
        config.logging.json = true;
    }
    init_logging(&config.logging, args.verbose)?;

    info!("🚀 Starting vault-client v{}", env!("CARGO_PKG_VERSION"));
    info!(
        rpc = %config.rpc.url,
        commitment = %config.rpc.commitment,
        read_commitment = %config.rpc.read_commitment,
        program_id = %config.vault.program_id,
        "📋 Configuration loaded"
    );

    let ledger = Arc::new(RpcLedger::from_config(&config.rpc)?);
    let submitter = TxSubmitter::new(
        ledger,
        Arc::new(TokioClock),
        SubmitterConfig::from(&config.submission),
    );

    match args.command {
        Command::Balance { pubkey } => {
            let lamports = get_sol_balance(submitter.ledger().as_ref(), &pubkey).await;
            println!(
                "{} {} lamports ({:.9} SOL)",
                pubkey,
                lamports,
                lamports as f64 / LAMPORTS_PER_SOL as f64
            );
            Ok(())
        }
        Command::Run { scenario } => {
            let ctx = scenario_context(&config, submitter)?;
            let report = scenarios::run_report(&ctx, scenario).await;
            finish(&[report], args.json)
        }
        Command::RunAll => {
            let ctx = scenario_context(&config, submitter)?;
            let reports = scenarios::run_all(&ctx).await;
            finish(&reports, args.json)
        }
    }
}

fn scenario_context(config: &Config, submitter: TxSubmitter) -> Result<ScenarioContext> {
    let source = FileKeySource::new(config.keys.paths());
    let actors = Actors::load(&source).context("Failed to load actor keys")?;
    for actor in actors.iter() {
        info!(role = %actor.role(), pubkey = %actor.pubkey(), "🔑 Actor loaded");
    }
    ScenarioContext::from_config(config, submitter, actors)
}

fn finish(reports: &[ScenarioReport], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        for report in reports {
            let mark = if report.passed { "PASS" } else { "FAIL" };
            println!(
                "{:<4} {:<10} {:>7}ms  {}",
                mark,
                report.scenario.name(),
                report.elapsed_ms,
                report.detail
            );
        }
    }

    let failed = reports.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        warn!(failed, total = reports.len(), "❌ Scenarios failed");
        bail!("{} of {} scenarios failed", failed, reports.len());
    }
    info!(total = reports.len(), "✅ All scenarios passed");
    Ok(())
}
