//! Shared test doubles: a scriptable node and a recording store.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, B256, FixedBytes};
use async_trait::async_trait;

use crate::db::{EventStore, FactoryPairRow, SqlValue};
use crate::errors::{NodeError, StoreError};
use crate::node::{NodeClient, RawLog};

pub(crate) fn raw_log(
    address: Address,
    block_number: u64,
    tx_hash: B256,
    topics: Vec<B256>,
    data: Vec<u8>,
) -> RawLog {
    RawLog {
        address,
        block_number,
        tx_hash,
        topics,
        data: data.into(),
    }
}

pub(crate) fn encode_words(words: &[[u8; 32]]) -> Vec<u8> {
    words.iter().flat_map(|w| w.iter().copied()).collect()
}

pub(crate) fn event_selector(abi: &JsonAbi, name: &str) -> B256 {
    abi.events().find(|e| e.name == name).unwrap().selector()
}

/// A node whose chain is a plain list of logs; `get_logs` filters by block
/// range and address set the way a real node does.
pub(crate) struct MockNode {
    head: Mutex<u64>,
    logs: Mutex<Vec<RawLog>>,
    symbols: Mutex<HashMap<Address, String>>,
    symbols_bytes32: Mutex<HashMap<Address, FixedBytes<32>>>,
}

impl MockNode {
    pub(crate) fn new(head: u64) -> Self {
        Self {
            head: Mutex::new(head),
            logs: Mutex::new(Vec::new()),
            symbols: Mutex::new(HashMap::new()),
            symbols_bytes32: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_head(&self, head: u64) {
        *self.head.lock().unwrap() = head;
    }

    pub(crate) fn push_log(&self, log: RawLog) {
        self.logs.lock().unwrap().push(log);
    }

    pub(crate) fn set_symbol(&self, token: Address, symbol: &str) {
        self.symbols
            .lock()
            .unwrap()
            .insert(token, symbol.to_string());
    }

    pub(crate) fn set_symbol_bytes32(&self, token: Address, raw: FixedBytes<32>) {
        self.symbols_bytes32.lock().unwrap().insert(token, raw);
    }
}

#[async_trait]
impl NodeClient for MockNode {
    async fn head_block(&self) -> Result<u64, NodeError> {
        Ok(*self.head.lock().unwrap())
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        addresses: &[Address],
    ) -> Result<Vec<RawLog>, NodeError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.block_number >= from_block
                    && l.block_number <= to_block
                    && addresses.contains(&l.address)
            })
            .cloned()
            .collect())
    }

    async fn symbol_string(&self, token: Address) -> Result<String, NodeError> {
        self.symbols
            .lock()
            .unwrap()
            .get(&token)
            .cloned()
            .ok_or_else(|| NodeError::Call("execution reverted".to_string()))
    }

    async fn symbol_bytes32(&self, token: Address) -> Result<FixedBytes<32>, NodeError> {
        self.symbols_bytes32
            .lock()
            .unwrap()
            .get(&token)
            .copied()
            .ok_or_else(|| NodeError::Call("execution reverted".to_string()))
    }
}

/// Records every executed statement in order and mirrors factory inserts
/// back into the readable factory-row state, so multi-cycle resume logic
/// can be exercised without a database.
pub(crate) struct MemStore {
    pub(crate) ops: Mutex<Vec<(String, Vec<SqlValue>)>>,
    factory_rows: Mutex<Vec<FactoryPairRow>>,
    tickers: Mutex<Vec<String>>,
}

impl MemStore {
    pub(crate) fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            factory_rows: Mutex::new(Vec::new()),
            tickers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push_ticker(&self, ticker: &str) {
        self.tickers.lock().unwrap().push(ticker.to_string());
    }

    pub(crate) fn push_factory_row(&self, ticker: &str, block: u64, pair_addr: Address) {
        self.push_ticker(ticker);
        self.factory_rows.lock().unwrap().push(FactoryPairRow {
            ticker: ticker.to_string(),
            block,
            pair_addr,
        });
    }

    pub(crate) fn inserted(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.ops.lock().unwrap().clone()
    }

    pub(crate) fn factory_row_count(&self) -> usize {
        self.factory_rows.lock().unwrap().len()
    }
}

#[async_trait]
impl EventStore for MemStore {
    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<u64, StoreError> {
        self.ops
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));

        if sql.contains("INSERT INTO us_factory") {
            let ticker = args[0].as_text().unwrap().to_string();
            let block = args[1].as_int().unwrap() as u64;
            let pair_addr = args[5].as_text().unwrap().parse().unwrap();
            self.tickers.lock().unwrap().push(ticker.clone());
            self.factory_rows.lock().unwrap().push(FactoryPairRow {
                ticker,
                block,
                pair_addr,
            });
        }

        Ok(1)
    }

    async fn query_max_block(
        &self,
        sql: &str,
        _args: &[SqlValue],
    ) -> Result<Option<u64>, StoreError> {
        if sql.contains("us_factory") {
            Ok(self
                .factory_rows
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.block)
                .max())
        } else {
            Ok(None)
        }
    }

    async fn query_tickers(
        &self,
        _sql: &str,
        args: &[SqlValue],
    ) -> Result<Vec<String>, StoreError> {
        let like = args[0].as_text().unwrap();
        let prefix = like.trim_end_matches('%');
        Ok(self
            .tickers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn factory_pairs(&self) -> Result<Vec<FactoryPairRow>, StoreError> {
        let mut rows = self.factory_rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.block.cmp(&a.block));
        Ok(rows)
    }
}

/// A store answering MAX(block) queries from a fixed per-table map.
pub(crate) struct BlockHeights {
    heights: Vec<(&'static str, u64)>,
}

impl BlockHeights {
    pub(crate) fn new(heights: &[(&'static str, u64)]) -> Self {
        Self {
            heights: heights.to_vec(),
        }
    }
}

#[async_trait]
impl EventStore for BlockHeights {
    async fn execute(&self, _sql: &str, _args: &[SqlValue]) -> Result<u64, StoreError> {
        Ok(0)
    }

    async fn query_max_block(
        &self,
        sql: &str,
        _args: &[SqlValue],
    ) -> Result<Option<u64>, StoreError> {
        Ok(self
            .heights
            .iter()
            .find(|(table, _)| sql.contains(table))
            .map(|(_, block)| *block))
    }

    async fn query_tickers(
        &self,
        _sql: &str,
        _args: &[SqlValue],
    ) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    async fn factory_pairs(&self) -> Result<Vec<FactoryPairRow>, StoreError> {
        Ok(Vec::new())
    }
}
