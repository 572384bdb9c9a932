//! Chain data source abstraction consumed by the block scanner.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainResult, ChainBlock};

/// Read-only view of the chain the scanner polls.
///
/// Implementations must bound their own calls (timeouts, retries); the
/// scanner treats every error as transient.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Current chain height.
    async fn height(&self) -> BlockchainResult<u64>;

    /// Block with full transaction bodies, or `None` if not (yet) available.
    async fn block(&self, number: u64) -> BlockchainResult<Option<ChainBlock>>;

    /// Native balance of an address at the latest block.
    async fn balance(&self, address: Address) -> BlockchainResult<U256>;
}

#[async_trait]
impl ChainSource for BlockchainClient {
    async fn height(&self) -> BlockchainResult<u64> {
        self.get_block_number().await
    }

    async fn block(&self, number: u64) -> BlockchainResult<Option<ChainBlock>> {
        self.get_block(number).await
    }

    async fn balance(&self, address: Address) -> BlockchainResult<U256> {
        self.get_balance(address).await
    }
}
