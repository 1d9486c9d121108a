//! Live tests against a local validator
//!
//! Start `solana-test-validator` first, then run with `--ignored`. The
//! endpoint defaults to `http://127.0.0.1:8899` and can be changed with
//! `VAULT_RPC_URL`.

use solana_sdk::{hash::Hash, signature::Keypair, signer::Signer};
use std::sync::Arc;
use std::time::Duration;
use trading_vault_client::config::RpcConfig;
use trading_vault_client::funding::{airdrop_sol, get_sol_balance, FundingPolicy};
use trading_vault_client::rpc::{LedgerClient, RpcLedger, TokioClock};
use trading_vault_client::token::{create_mint, get_or_create_ata, get_token_balance, mint_tokens};
use trading_vault_client::tx_builder::{SubmitterConfig, TxSubmitter};
use trading_vault_client::types::{BlockhashWindow, LAMPORTS_PER_SOL};

/// Default commitments, so read-after-confirm runs as the CLI runs it
fn submitter() -> TxSubmitter {
    let mut rpc = RpcConfig::default();
    if let Ok(url) = std::env::var("VAULT_RPC_URL") {
        rpc.url = url;
    }
    let ledger = Arc::new(RpcLedger::from_config(&rpc).unwrap());
    let config = SubmitterConfig {
        poll_interval: Duration::from_millis(500),
        ..SubmitterConfig::default()
    };
    TxSubmitter::new(ledger, Arc::new(TokioClock), config)
}

async fn funded(submitter: &TxSubmitter) -> Keypair {
    let keypair = Keypair::new();
    airdrop_sol(submitter, &keypair.pubkey(), &FundingPolicy::default())
        .await
        .unwrap();
    keypair
}

#[tokio::test]
#[ignore = "requires a running solana-test-validator"]
async fn test_fresh_actor_airdrop() {
    let submitter = submitter();
    let payer = funded(&submitter).await;

    let balance = get_sol_balance(submitter.ledger().as_ref(), &payer.pubkey()).await;
    assert!(balance >= LAMPORTS_PER_SOL);
}

#[tokio::test]
#[ignore = "requires a running solana-test-validator"]
async fn test_mint_100_tokens_at_6_decimals() {
    let submitter = submitter();
    let payer = funded(&submitter).await;
    let owner = Keypair::new().pubkey();
    let mint = Keypair::new();

    create_mint(&submitter, &payer, &mint, 6).await.unwrap();
    let ata = get_or_create_ata(&submitter, &mint.pubkey(), &owner, &payer)
        .await
        .unwrap();
    let again = get_or_create_ata(&submitter, &mint.pubkey(), &owner, &payer)
        .await
        .unwrap();
    assert_eq!(ata, again);

    mint_tokens(&submitter, &payer, 100.0, 6, &mint.pubkey(), &ata)
        .await
        .unwrap();
    assert_eq!(
        get_token_balance(submitter.ledger().as_ref(), &ata).await,
        100_000_000
    );
}

#[tokio::test]
#[ignore = "requires a running solana-test-validator"]
async fn test_already_expired_blockhash_expires() {
    let funder = submitter();
    let payer = funded(&funder).await;
    // Preflight would reject the unknown blockhash before it is sent
    let submitter = TxSubmitter::new(
        funder.ledger().clone(),
        Arc::new(TokioClock),
        SubmitterConfig {
            skip_preflight: true,
            ..*funder.config()
        },
    );

    let height = submitter.ledger().get_block_height().await.unwrap();
    let window = BlockhashWindow::new(Hash::new_unique(), height);

    let ix = solana_sdk::system_instruction::transfer(&payer.pubkey(), &payer.pubkey(), 1);
    let outcome = submitter
        .submit_with_window(&[ix], &payer, &[], window)
        .await
        .unwrap();
    assert!(outcome.is_expired());
}
