//! Blockchain RPC client with timeout, failover and retry handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoints (primary + failovers)
//! - Query chain state (block number, full blocks, balances)
//! - Bound every call with a timeout and a maximum retry count
//! - Provide health check for blockchain connectivity

use alloy::consensus::Transaction as _;
use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionResponse as _;
use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Block;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainBlock, ChainConfig, ChainId, ChainTransaction,
};
use crate::resilience::backoff::calculate_backoff;

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    /// Configuration.
    config: ChainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Fails only if the primary URL cannot be parsed; an unreachable or
    /// mismatched endpoint is logged and tolerated.
    pub async fn new(config: ChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        // 1. Add primary provider
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        // 2. Add failover providers
        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "Blockchain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Blockchain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Run one RPC operation against every provider in order, retrying whole
    /// rounds with backoff until `max_retries` is spent.
    async fn call<T, E, F, Fut>(&self, operation: &'static str, f: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Display,
    {
        let attempts = self.config.max_retries + 1;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = calculate_backoff(
                    attempt,
                    self.config.retry_base_delay_ms,
                    self.config.retry_max_delay_ms,
                );
                tracing::debug!(operation, attempt, delay = ?delay, "Retrying RPC call");
                sleep(delay).await;
            }

            for (i, provider) in self.providers.iter().enumerate() {
                match timeout(self.timeout_duration, f(provider.clone())).await {
                    Ok(Ok(result)) => return Ok(result),
                    Ok(Err(e)) => {
                        tracing::warn!(operation, provider_idx = i, error = %e, "RPC error")
                    }
                    Err(_) => tracing::warn!(
                        operation,
                        provider_idx = i,
                        timeout_secs = self.config.rpc_timeout_secs,
                        "RPC timeout"
                    ),
                }
            }
        }

        Err(BlockchainError::RetriesExhausted { operation, attempts })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.call("get_chain_id", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.call("get_block_number", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get a block with full transaction bodies. `None` if the node does not know it.
    pub async fn get_block(&self, number: u64) -> BlockchainResult<Option<ChainBlock>> {
        let block = self
            .call("get_block", move |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Number(number))
                    .full()
                    .await
            })
            .await?;
        Ok(block.map(to_chain_block))
    }

    /// Get the balance of an address.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.call("get_balance", move |p| async move { p.get_balance(address).await })
            .await
    }

}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("providers", &self.providers.len())
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

fn to_chain_block(block: Block) -> ChainBlock {
    let transactions = block
        .transactions
        .as_transactions()
        .unwrap_or(&[])
        .iter()
        .map(|tx| ChainTransaction {
            hash: tx.tx_hash(),
            from: tx.from(),
            to: tx.to(),
            value: tx.value(),
            input: tx.input().clone(),
        })
        .collect();

    ChainBlock {
        number: block.header.number,
        timestamp: block.header.timestamp,
        transactions,
    }
}
