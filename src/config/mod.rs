mod config;

pub use config::{NodeSettings, PostgresSettings, Settings, SyncSettings};
