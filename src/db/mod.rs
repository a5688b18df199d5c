pub mod models;
pub mod postgres;

pub use models::FactoryPairRow;
pub use postgres::PostgresClient;

use async_trait::async_trait;
use tokio_postgres::types::ToSql;

use crate::errors::StoreError;

/// A value bound to a SQL insert or query parameter.
///
/// Rows travel through the engine as positional lists of these. 256-bit
/// amounts are carried as decimal `Text` and cast to numeric in the SQL;
/// they never pass through floating point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

impl SqlValue {
    pub fn as_pg(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlValue::Int(v) => v,
            SqlValue::Text(v) => v,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            SqlValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Text(_) => None,
        }
    }
}

/// What the sync core needs from the relational store.
///
/// Descriptors own their SQL; the store only executes it. Every operation
/// acquires one pooled connection and auto-commits, so rows written before
/// a crash survive it.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Execute an insert, returning the number of rows written.
    /// Duplicate rows are absorbed by ON CONFLICT clauses and return 0.
    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<u64, StoreError>;

    /// Run a `SELECT MAX(block) ...` query; None when the table is empty.
    async fn query_max_block(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<Option<u64>, StoreError>;

    /// Run a query returning a single text column of pair tickers.
    async fn query_tickers(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<String>, StoreError>;

    /// All committed factory rows, newest block first.
    async fn factory_pairs(&self) -> Result<Vec<FactoryPairRow>, StoreError>;
}
