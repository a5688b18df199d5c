//! Token symbol resolution and unique pair tickers.
//!
//! Most tokens answer the standard `symbol() -> string` call. Old
//! DSToken-style contracts return a right-padded bytes32 instead, and a
//! handful predate symbols entirely; those live in a small exception
//! table. Anything still unresolved falls back to a slice of the address.

use alloy::primitives::Address;
use log::warn;
use moka::future::Cache;

use crate::db::{EventStore, SqlValue};
use crate::errors::SyncError;
use crate::node::NodeClient;

/// Tokens whose contracts answer neither symbol ABI.
const SYMBOL_EXCEPTIONS: &[(&str, &str)] = &[
    ("0xe0b7927c4af23765cb51314a0e0521a9645f0e2a", "DGD"),
];

const SYMBOL_CACHE_CAPACITY: u64 = 100_000;

pub struct SymbolResolver {
    cache: Cache<Address, String>,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self {
            cache: Cache::new(SYMBOL_CACHE_CAPACITY),
        }
    }

    /// Resolve a token's display symbol; never fails, falling back through
    /// the bytes32 ABI, the exception table and finally the address itself.
    pub async fn symbol_of(&self, node: &dyn NodeClient, token: Address) -> String {
        if let Some(symbol) = self.cache.get(&token).await {
            return symbol;
        }

        let symbol = sanitize_symbol(&self.resolve(node, token).await);
        self.cache.insert(token, symbol.clone()).await;
        symbol
    }

    async fn resolve(&self, node: &dyn NodeClient, token: Address) -> String {
        match node.symbol_string(token).await {
            Ok(s) if !s.trim().is_empty() => return s,
            Ok(_) | Err(_) => {},
        }

        if let Ok(raw) = node.symbol_bytes32(token).await {
            let symbol = trim_bytes32(raw.as_slice());
            if !symbol.is_empty() {
                warn!("Token {} uses a bytes32 symbol: {}", token, symbol);
                return symbol;
            }
        }

        let checksummed = token.to_checksum(None);
        let lower = checksummed.to_lowercase();
        if let Some((_, symbol)) = SYMBOL_EXCEPTIONS.iter().find(|(addr, _)| *addr == lower) {
            warn!("Token {} resolved from the exception table: {}", token, symbol);
            return symbol.to_string();
        }

        let fallback = checksummed[2..5].to_string();
        warn!(
            "Token {} has no readable symbol, falling back to {}",
            token, fallback
        );
        fallback
    }

    /// Build a pair ticker that is unique across all factory rows.
    ///
    /// The base `SYM0-SYM1` gets a numeric suffix counting the committed
    /// tickers sharing that prefix plus any assigned earlier in the current
    /// window (those are not yet in the database by design).
    pub async fn make_unique_ticker(
        &self,
        node: &dyn NodeClient,
        store: &dyn EventStore,
        token0: Address,
        token1: Address,
        uncommitted: &[String],
    ) -> Result<String, SyncError> {
        let base = format!(
            "{}-{}",
            self.symbol_of(node, token0).await,
            self.symbol_of(node, token1).await
        );

        let committed = store
            .query_tickers(
                "SELECT pair FROM us_factory WHERE pair LIKE $1",
                &[SqlValue::Text(format!("{base}%"))],
            )
            .await?;
        let pending = uncommitted.iter().filter(|t| t.starts_with(&base)).count();

        Ok(format!("{}-{}", base, committed.len() + pending))
    }
}

/// Decode a right-padded bytes32 symbol, stopping at the first NUL.
fn trim_bytes32(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

/// Strip characters that would corrupt embedded SQL literals or LIKE
/// prefix patterns built from the symbol.
fn sanitize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace() && !matches!(c, '\'' | '%' | '_'))
        .collect()
}
