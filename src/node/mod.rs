mod client;

pub use client::EthNode;

use alloy::primitives::{Address, Bytes, FixedBytes, B256};
use async_trait::async_trait;

use crate::errors::NodeError;

/// A single event log as returned by `eth_getLogs`.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub address: Address,
    pub block_number: u64,
    pub tx_hash: B256,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// What the sync engine needs from an Ethereum full node.
///
/// `get_logs` results are in canonical chain order (block, then log index
/// within block); the engine's commit ordering depends on that.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Latest block number known to the node.
    async fn head_block(&self) -> Result<u64, NodeError>;

    /// All logs emitted by `addresses` in the inclusive block range.
    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        addresses: &[Address],
    ) -> Result<Vec<RawLog>, NodeError>;

    /// Read-only `symbol()` call against the standard string-returning ABI.
    async fn symbol_string(&self, token: Address) -> Result<String, NodeError>;

    /// Read-only `symbol()` call against the bytes32-returning ABI.
    async fn symbol_bytes32(&self, token: Address) -> Result<FixedBytes<32>, NodeError>;
}
