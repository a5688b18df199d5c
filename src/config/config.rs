use config::{Config, ConfigError, File};
use serde::Deserialize;

/// Ethereum node connection configuration.
///
/// The indexer talks to a full node over WebSocket for `eth_getLogs`,
/// head-block polling and read-only `symbol()` calls.
#[derive(Debug, Deserialize, Clone)]
pub struct NodeSettings {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Per-call deadline for every RPC request, in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:13516".to_string()
}

fn default_rpc_timeout_secs() -> u64 {
    240
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
        }
    }
}

/// PostgreSQL database connection configuration.
///
/// Used for storing factory rows, per-event pair tables and for the
/// resume cursor derived from them.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    #[serde(default = "default_pg_host")]
    pub host: String,
    #[serde(default = "default_pg_port")]
    pub port: u16,
    #[serde(default = "default_pg_user")]
    pub user: String,
    #[serde(default = "default_pg_password")]
    pub password: String,
    #[serde(default = "default_pg_database")]
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pg_host() -> String {
    "127.0.0.1".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_pg_user() -> String {
    "pairscan".to_string()
}

fn default_pg_password() -> String {
    "pairscan".to_string()
}

fn default_pg_database() -> String {
    "pairscan".to_string()
}

fn default_pool_size() -> usize {
    6
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            host: default_pg_host(),
            port: default_pg_port(),
            user: default_pg_user(),
            password: default_pg_password(),
            database: default_pg_database(),
            pool_size: default_pool_size(),
        }
    }
}

/// Sync engine tuning.
///
/// The window is deliberately small: it bounds single `eth_getLogs`
/// latency and the cost of the same-window rescan after a pair discovery.
#[derive(Debug, Deserialize, Clone)]
pub struct SyncSettings {
    /// Uniswap V2 factory on mainnet.
    #[serde(default = "default_factory_address")]
    pub factory_address: String,
    /// Block the factory contract was deployed in.
    #[serde(default = "default_factory_creation_block")]
    pub factory_creation_block: u64,
    /// Blocks subtracted from the node head to stay clear of reorgs.
    #[serde(default = "default_confirmation_depth")]
    pub confirmation_depth: u64,
    /// Blocks per `eth_getLogs` window.
    #[serde(default = "default_window_size")]
    pub window_size: u64,
    /// Sleep between sync cycles, in seconds.
    #[serde(default = "default_polling_interval_secs")]
    pub polling_interval_secs: u64,
}

fn default_factory_address() -> String {
    "0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f".to_string()
}

fn default_factory_creation_block() -> u64 {
    10_000_835
}

fn default_confirmation_depth() -> u64 {
    15
}

fn default_window_size() -> u64 {
    32
}

fn default_polling_interval_secs() -> u64 {
    300
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            factory_address: default_factory_address(),
            factory_creation_block: default_factory_creation_block(),
            confirmation_depth: default_confirmation_depth(),
            window_size: default_window_size(),
            polling_interval_secs: default_polling_interval_secs(),
        }
    }
}

/// Root application configuration.
///
/// Loaded from `config.yaml` when present; every field has a compiled-in
/// default so the binary runs with no config file and no flags.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub node: NodeSettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.node.ws_url, "ws://127.0.0.1:13516");
        assert_eq!(s.node.rpc_timeout_secs, 240);
        assert_eq!(s.postgres.pool_size, 6);
        assert_eq!(s.sync.confirmation_depth, 15);
        assert_eq!(s.sync.window_size, 32);
        assert_eq!(s.sync.polling_interval_secs, 300);
        assert_eq!(s.sync.factory_creation_block, 10_000_835);
    }
}
