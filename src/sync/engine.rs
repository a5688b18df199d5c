//! The sync engine.
//!
//! One cycle reads the address set and resume cursor out of the factory
//! table, then walks fixed-size block windows up to the confirmed head.
//! Within a window the write order is the engine's commit contract:
//!
//!   1. pair-event rows for already-tracked addresses,
//!   2. pair-event rows for pairs discovered in this window (rescan),
//!   3. the factory rows that introduced those pairs.
//!
//! Because the cursor is the highest committed factory block, a crash at
//! any point leaves the database in a state the next cycle re-scans
//! without losing logs; duplicate re-inserts are absorbed by the schema's
//! uniqueness constraints.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use log::{error, info, warn};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;

use crate::abis::{FACTORY_ABI, PAIR_ABI};
use crate::config::SyncSettings;
use crate::db::{EventStore, SqlValue};
use crate::errors::SyncError;
use crate::node::NodeClient;
use crate::sync::abi;
use crate::sync::contract::ContractSync;
use crate::sync::parser::parse_log;
use crate::sync::symbols::SymbolResolver;

pub struct Engine {
    node: Arc<dyn NodeClient>,
    store: Arc<dyn EventStore>,
    symbols: SymbolResolver,
    factory_address: Address,
    factory_creation_block: u64,
    confirmation_depth: u64,
    window_size: u64,
    polling_interval: Duration,
    factory_abi: Arc<JsonAbi>,
    pair_abi: Arc<JsonAbi>,
}

impl Engine {
    pub fn new(
        node: Arc<dyn NodeClient>,
        store: Arc<dyn EventStore>,
        settings: &SyncSettings,
    ) -> Result<Self, SyncError> {
        let factory_address = settings.factory_address.parse().map_err(|e| {
            SyncError::Config(format!(
                "bad factory address {}: {e}",
                settings.factory_address
            ))
        })?;

        Ok(Self {
            node,
            store,
            symbols: SymbolResolver::new(),
            factory_address,
            factory_creation_block: settings.factory_creation_block,
            confirmation_depth: settings.confirmation_depth,
            window_size: settings.window_size,
            polling_interval: Duration::from_secs(settings.polling_interval_secs),
            factory_abi: Arc::new(abi::parse_abi(FACTORY_ABI)?),
            pair_abi: Arc::new(abi::parse_abi(PAIR_ABI)?),
        })
    }

    /// Run cycles until cancelled. Window-level failures (node timeouts,
    /// decode mismatches, transient store errors) are logged and retried on
    /// the next polling tick; fatal store or config errors propagate.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SyncError> {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.run_cycle(&cancel).await {
                Ok(()) => {},
                Err(e) if e.is_fatal() => {
                    error!("Fatal sync error: {e}");
                    return Err(e);
                },
                Err(e) => warn!("Sync cycle aborted, retrying next tick: {e}"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.polling_interval) => {},
            }
        }

        info!("Sync engine stopped");
        Ok(())
    }

    /// One full pass from the resume cursor to the confirmed head.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        let factory = ContractSync::factory(
            self.factory_address,
            self.factory_creation_block,
            self.factory_abi.clone(),
        );

        // Rebuild the tracked address set from committed factory rows.
        let mut pairs: FxHashMap<Address, ContractSync> = FxHashMap::default();
        let mut addresses = vec![self.factory_address];
        for row in self.store.factory_pairs().await? {
            addresses.push(row.pair_addr);
            pairs.insert(
                row.pair_addr,
                ContractSync::pair(row.pair_addr, row.block, row.ticker, self.pair_abi.clone()),
            );
        }

        // Any pair created at block B has its factory row committed after
        // all of B's pair logs, so the highest factory block is a safe
        // place to resume scanning from.
        let mut from_block = factory
            .last_committed_block(self.store.as_ref())
            .await?
            .unwrap_or(self.factory_creation_block);

        let head = self.node.head_block().await?;
        let max_block = head.saturating_sub(self.confirmation_depth);
        if from_block > max_block {
            info!(
                "Up to date: cursor {} past confirmed head {}",
                from_block, max_block
            );
            return Ok(());
        }

        info!(
            "Sync cycle starting at block {} ({} to go, {} pairs tracked)",
            from_block,
            max_block - from_block,
            pairs.len()
        );

        while from_block <= max_block {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let to_block = (from_block + self.window_size).min(max_block);
            self.sync_window(&factory, &mut pairs, &mut addresses, from_block, to_block, max_block)
                .await?;
            from_block = to_block + 1;
        }

        Ok(())
    }

    async fn sync_window(
        &self,
        factory: &ContractSync,
        pairs: &mut FxHashMap<Address, ContractSync>,
        addresses: &mut Vec<Address>,
        from_block: u64,
        to_block: u64,
        max_block: u64,
    ) -> Result<(), SyncError> {
        let started = Instant::now();
        let logs = self
            .node
            .get_logs(from_block, to_block, addresses)
            .await?;
        let mut rpc_ms = started.elapsed().as_millis();
        let log_count = logs.len();

        let (factory_logs, pair_logs): (Vec<_>, Vec<_>) =
            logs.into_iter().partition(|l| l.address == self.factory_address);

        let mut insert_ms = 0u128;

        for log in &pair_logs {
            let Some(desc) = pairs.get(&log.address) else {
                warn!("Dropping log from untracked address {}", log.address);
                continue;
            };
            let row = parse_log(desc, log)?;
            let timer = Instant::now();
            desc.insert(self.store.as_ref(), &row.event, &row.values)
                .await?;
            insert_ms += timer.elapsed().as_millis();
        }

        if !factory_logs.is_empty() {
            // Factory rows are parsed now but committed only after the
            // rescan below, so a restart never resumes past a pair whose
            // logs are missing.
            let mut discovered: Vec<(Vec<SqlValue>, String)> =
                Vec::with_capacity(factory_logs.len());
            let mut new_addresses = Vec::with_capacity(factory_logs.len());
            let mut window_tickers: Vec<String> = Vec::with_capacity(factory_logs.len());

            for log in &factory_logs {
                let row = parse_log(factory, log)?;
                let (token0, token1, pair_addr) = factory_row_parts(&row.values)?;
                if pairs.contains_key(&pair_addr) {
                    // Re-scanned creation of a pair we already track; its
                    // factory row is committed, nothing to do.
                    continue;
                }

                let ticker = self
                    .symbols
                    .make_unique_ticker(
                        self.node.as_ref(),
                        self.store.as_ref(),
                        token0,
                        token1,
                        &window_tickers,
                    )
                    .await?;

                info!(
                    "Discovered pair {} at {} (block {})",
                    ticker, pair_addr, log.block_number
                );

                pairs.insert(
                    pair_addr,
                    ContractSync::pair(
                        pair_addr,
                        log.block_number,
                        ticker.clone(),
                        self.pair_abi.clone(),
                    ),
                );
                addresses.push(pair_addr);
                new_addresses.push(pair_addr);
                window_tickers.push(ticker.clone());
                discovered.push((row.values, ticker));
            }

            if !new_addresses.is_empty() {
                // The window's first get_logs ran before these addresses
                // were tracked; rescan the same range for just them.
                let timer = Instant::now();
                let rescan = self
                    .node
                    .get_logs(from_block, to_block, &new_addresses)
                    .await?;
                rpc_ms += timer.elapsed().as_millis();

                for log in &rescan {
                    let Some(desc) = pairs.get(&log.address) else {
                        continue;
                    };
                    let row = parse_log(desc, log)?;
                    let timer = Instant::now();
                    desc.insert(self.store.as_ref(), &row.event, &row.values)
                        .await?;
                    insert_ms += timer.elapsed().as_millis();
                }

                for (values, ticker) in discovered {
                    let mut full = Vec::with_capacity(values.len() + 1);
                    full.push(SqlValue::Text(ticker));
                    full.extend(values);
                    let timer = Instant::now();
                    factory
                        .insert(self.store.as_ref(), "PairCreated", &full)
                        .await?;
                    insert_ms += timer.elapsed().as_millis();
                }
            }
        }

        info!(
            "Synced {}..{} ({} blocks left, {} addrs, {} logs, rpc {} ms, insert {} ms)",
            from_block,
            to_block,
            max_block - to_block,
            addresses.len(),
            log_count,
            rpc_ms,
            insert_ms
        );

        Ok(())
    }
}

/// Pull the token and pair addresses back out of a parsed PairCreated row
/// (layout: block, tx_hash, token0, token1, pair, pair_id).
fn factory_row_parts(values: &[SqlValue]) -> Result<(Address, Address, Address), SyncError> {
    let text = |i: usize| {
        values
            .get(i)
            .and_then(SqlValue::as_text)
            .ok_or_else(|| SyncError::DecodeMismatch(format!("factory row missing field {i}")))
    };
    let addr = |s: &str| {
        s.parse::<Address>()
            .map_err(|e| SyncError::DecodeMismatch(format!("bad address {s}: {e}")))
    };

    Ok((addr(text(2)?)?, addr(text(3)?)?, addr(text(4)?)?))
}
