//! [`LedgerClient`] over the Solana JSON-RPC API

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, pubkey::Pubkey,
    signature::Signature, transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::{LedgerClient, LedgerError, LedgerResult};
use crate::config::RpcConfig;
use crate::types::{BlockhashWindow, ConfirmationStatus, SignatureStatus};

/// Cluster access through a single nonblocking RPC connection
///
/// Blockhash and block height queries use `window_commitment`; every other
/// read, and preflight simulation, uses `read_commitment`. The poll loop stops
/// at `confirmed`, so reads that follow a write must not lag behind it.
#[derive(Clone)]
pub struct RpcLedger {
    client: Arc<RpcClient>,
    url: String,
    window_commitment: CommitmentConfig,
    read_commitment: CommitmentConfig,
}

impl std::fmt::Debug for RpcLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcLedger")
            .field("url", &self.url)
            .field("window_commitment", &self.window_commitment.commitment)
            .field("read_commitment", &self.read_commitment.commitment)
            .finish_non_exhaustive()
    }
}

impl RpcLedger {
    pub fn new(
        url: impl Into<String>,
        window_commitment: CommitmentConfig,
        read_commitment: CommitmentConfig,
        timeout: Duration,
    ) -> Self {
        let url = url.into();
        let client =
            RpcClient::new_with_timeout_and_commitment(url.clone(), timeout, read_commitment);
        Self {
            client: Arc::new(client),
            url,
            window_commitment,
            read_commitment,
        }
    }

    pub fn from_config(config: &RpcConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.url.clone(),
            config.commitment_config()?,
            config.read_commitment_config()?,
            config.timeout(),
        ))
    }

    fn map_err(&self, err: solana_client::client_error::ClientError) -> LedgerError {
        LedgerError::from_client_error(err, &self.url)
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> LedgerResult<u64> {
        let response = self
            .client
            .get_balance_with_commitment(pubkey, self.read_commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        trace!(pubkey = %pubkey, lamports = response.value, "getBalance");
        Ok(response.value)
    }

    async fn request_airdrop(&self, pubkey: &Pubkey, lamports: u64) -> LedgerResult<Signature> {
        self.client
            .request_airdrop(pubkey, lamports)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn get_latest_blockhash(&self) -> LedgerResult<BlockhashWindow> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.window_commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        debug!(
            blockhash = %blockhash,
            last_valid_block_height,
            "Fetched latest blockhash"
        );
        Ok(BlockhashWindow::new(blockhash, last_valid_block_height))
    }

    async fn get_block_height(&self) -> LedgerResult<u64> {
        self.client
            .get_block_height_with_commitment(self.window_commitment)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
        skip_preflight: bool,
    ) -> LedgerResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            preflight_commitment: Some(self.read_commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> LedgerResult<Option<SignatureStatus>> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.value.into_iter().next().flatten();
        Ok(status.map(|status| SignatureStatus {
            status: ConfirmationStatus::from(status.confirmation_status()),
            err: status.err.map(|e| e.to_string()),
        }))
    }

    async fn get_account(&self, pubkey: &Pubkey) -> LedgerResult<Option<Account>> {
        let response = self
            .client
            .get_account_with_commitment(pubkey, self.read_commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(response.value)
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> LedgerResult<u64> {
        let response = self
            .client
            .get_token_account_balance_with_commitment(token_account, self.read_commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        response
            .value
            .amount
            .parse::<u64>()
            .map_err(|e| LedgerError::Malformed(format!("token amount: {}", e)))
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> LedgerResult<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| self.map_err(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use solana_sdk::{
        hash::Hash, signature::Keypair, signer::Signer, system_instruction,
        transaction::Transaction,
    };

    fn rpc_result(result: &str) -> String {
        format!(r#"{{"jsonrpc":"2.0","result":{},"id":1}}"#, result)
    }

    async fn ledger_for(server: &mockito::Server) -> RpcLedger {
        RpcLedger::new(
            server.url(),
            CommitmentConfig::finalized(),
            CommitmentConfig::confirmed(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_get_balance_parses_context_value() {
        let mut server = mockito::Server::new_async().await;
        let _version = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("getVersion".into()))
            .with_body(rpc_result(r#"{"solana-core":"2.3.0","feature-set":1}"#))
            .create_async()
            .await;
        let balance = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("getBalance".into()))
            .with_body(rpc_result(r#"{"context":{"slot":7},"value":4200000000}"#))
            .create_async()
            .await;

        let ledger = ledger_for(&server).await;
        let lamports = ledger.get_balance(&Pubkey::new_unique()).await.unwrap();
        assert_eq!(lamports, 4_200_000_000);
        balance.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_block_height() {
        let mut server = mockito::Server::new_async().await;
        let _version = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("getVersion".into()))
            .with_body(rpc_result(r#"{"solana-core":"2.3.0","feature-set":1}"#))
            .create_async()
            .await;
        let _height = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("getBlockHeight".into()))
            .with_body(rpc_result("1234"))
            .create_async()
            .await;

        let ledger = ledger_for(&server).await;
        assert_eq!(ledger.get_block_height().await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn test_rpc_error_is_classified() {
        let mut server = mockito::Server::new_async().await;
        let _version = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("getVersion".into()))
            .with_body(rpc_result(r#"{"solana-core":"2.3.0","feature-set":1}"#))
            .create_async()
            .await;
        let _airdrop = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("requestAirdrop".into()))
            .with_body(
                r#"{"jsonrpc":"2.0","error":{"code":429,"message":"Too many requests for a specific RPC call"},"id":1}"#,
            )
            .create_async()
            .await;

        let ledger = ledger_for(&server).await;
        let err = ledger
            .request_airdrop(&Pubkey::new_unique(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::RateLimitExceeded { .. }), "{err:?}");
        assert_eq!(err.endpoint(), Some(server.url().as_str()));
    }

    async fn mock_with_commitment(
        server: &mut mockito::Server,
        method: &str,
        commitment: &str,
        result: &str,
    ) -> mockito::Mock {
        server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(format!(r#""method":"{}""#, method)),
                Matcher::Regex(commitment.to_string()),
            ]))
            .with_body(rpc_result(result))
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_default_config_splits_window_and_read_commitments() {
        let mut server = mockito::Server::new_async().await;
        let _version = server
            .mock("POST", "/")
            .match_body(Matcher::Regex("getVersion".into()))
            .with_body(rpc_result(r#"{"solana-core":"2.3.0","feature-set":1}"#))
            .create_async()
            .await;

        let payer = Keypair::new();
        let tx = VersionedTransaction::from(Transaction::new_signed_with_payer(
            &[system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1)],
            Some(&payer.pubkey()),
            &[&payer],
            Hash::default(),
        ));
        let signature = tx.signatures[0];

        let finalized = r#""commitment":"finalized""#;
        let confirmed = r#""commitment":"confirmed""#;
        let mocks = vec![
            mock_with_commitment(
                &mut server,
                "getLatestBlockhash",
                finalized,
                &format!(
                    r#"{{"context":{{"slot":1}},"value":{{"blockhash":"{}","lastValidBlockHeight":300}}}}"#,
                    Hash::default()
                ),
            )
            .await,
            mock_with_commitment(&mut server, "getBlockHeight", finalized, "150").await,
            mock_with_commitment(
                &mut server,
                "getBalance",
                confirmed,
                r#"{"context":{"slot":1},"value":5}"#,
            )
            .await,
            mock_with_commitment(
                &mut server,
                "getAccountInfo",
                confirmed,
                r#"{"context":{"slot":1},"value":null}"#,
            )
            .await,
            mock_with_commitment(
                &mut server,
                "getTokenAccountBalance",
                confirmed,
                r#"{"context":{"slot":1},"value":{"amount":"100000000","decimals":6,"uiAmount":100.0,"uiAmountString":"100"}}"#,
            )
            .await,
            mock_with_commitment(
                &mut server,
                "sendTransaction",
                r#""preflightCommitment":"confirmed""#,
                &format!(r#""{}""#, signature),
            )
            .await,
        ];

        let mut config = RpcConfig::default();
        config.url = server.url();
        let ledger = RpcLedger::from_config(&config).unwrap();

        let window = ledger.get_latest_blockhash().await.unwrap();
        assert_eq!(window.last_valid_block_height, 300);
        assert_eq!(ledger.get_block_height().await.unwrap(), 150);
        assert_eq!(ledger.get_balance(&payer.pubkey()).await.unwrap(), 5);
        assert!(ledger.get_account(&Pubkey::new_unique()).await.unwrap().is_none());
        assert_eq!(
            ledger.get_token_balance(&Pubkey::new_unique()).await.unwrap(),
            100_000_000
        );
        assert_eq!(ledger.send_transaction(&tx, false).await.unwrap(), signature);

        for mock in mocks {
            mock.assert_async().await;
        }
    }
}
