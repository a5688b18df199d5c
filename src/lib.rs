pub mod abis;
pub mod config;
pub mod db;
pub mod errors;
pub mod node;
pub mod sync;

pub use config::Settings;
pub use db::{EventStore, PostgresClient, SqlValue};
pub use errors::{NodeError, StoreError, SyncError};
pub use node::{EthNode, NodeClient, RawLog};
pub use sync::Engine;
