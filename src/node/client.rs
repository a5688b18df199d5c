use std::future::Future;
use std::time::Duration;

use alloy::{
    primitives::{Address, FixedBytes},
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    rpc::types::Filter,
};
use async_trait::async_trait;
use log::info;
use url::Url;

use crate::abis::{IERC20Bytes32, IERC20};
use crate::errors::NodeError;
use crate::node::{NodeClient, RawLog};

/// WebSocket-backed node client.
///
/// Every call carries a per-call deadline; a timeout is fatal to the
/// current sync cycle, the outer polling loop retries.
pub struct EthNode {
    provider: DynProvider,
    rpc_timeout: Duration,
}

impl EthNode {
    pub async fn connect(ws_url: &str, rpc_timeout: Duration) -> Result<Self, NodeError> {
        Url::parse(ws_url)
            .map_err(|e| NodeError::Transport(format!("invalid websocket url {ws_url}: {e}")))?;

        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(ws_url.to_string()))
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        info!("Connected to node at {}", ws_url);

        Ok(Self {
            provider: DynProvider::new(provider),
            rpc_timeout,
        })
    }

    async fn with_deadline<T, E, F>(&self, fut: F) -> Result<T, NodeError>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        tokio::time::timeout(self.rpc_timeout, fut)
            .await
            .map_err(|_| NodeError::Timeout(self.rpc_timeout))?
            .map_err(|e| NodeError::Transport(e.to_string()))
    }
}

#[async_trait]
impl NodeClient for EthNode {
    async fn head_block(&self) -> Result<u64, NodeError> {
        self.with_deadline(self.provider.get_block_number()).await
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        addresses: &[Address],
    ) -> Result<Vec<RawLog>, NodeError> {
        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .address(addresses.to_vec());

        let logs = self.with_deadline(self.provider.get_logs(&filter)).await?;

        Ok(logs
            .into_iter()
            .map(|l| RawLog {
                address: l.inner.address,
                block_number: l.block_number.unwrap_or_default(),
                tx_hash: l.transaction_hash.unwrap_or_default(),
                topics: l.inner.data.topics().to_vec(),
                data: l.inner.data.data.clone(),
            })
            .collect())
    }

    async fn symbol_string(&self, token: Address) -> Result<String, NodeError> {
        let contract = IERC20::new(token, &self.provider);
        tokio::time::timeout(self.rpc_timeout, contract.symbol().call())
            .await
            .map_err(|_| NodeError::Timeout(self.rpc_timeout))?
            .map_err(|e| NodeError::Call(e.to_string()))
    }

    async fn symbol_bytes32(&self, token: Address) -> Result<FixedBytes<32>, NodeError> {
        let contract = IERC20Bytes32::new(token, &self.provider);
        tokio::time::timeout(self.rpc_timeout, contract.symbol().call())
            .await
            .map_err(|_| NodeError::Timeout(self.rpc_timeout))?
            .map_err(|e| NodeError::Call(e.to_string()))
    }
}
