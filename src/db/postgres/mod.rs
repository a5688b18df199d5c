mod client;
mod store;

pub use client::PostgresClient;
