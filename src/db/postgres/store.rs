use async_trait::async_trait;
use deadpool_postgres::PoolError;
use tokio_postgres::types::ToSql;

use crate::db::{EventStore, FactoryPairRow, SqlValue};
use crate::db::postgres::PostgresClient;
use crate::errors::StoreError;

fn pool_error(e: PoolError) -> StoreError {
    StoreError::Transient(e.to_string())
}

/// Connection loss is transient (the cycle retries); anything the server
/// rejected outright (missing table, bad SQL) needs operator intervention.
fn db_error(e: tokio_postgres::Error) -> StoreError {
    if e.is_closed() {
        StoreError::Transient(e.to_string())
    } else {
        StoreError::Fatal(e.to_string())
    }
}

fn bind(args: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|a| a.as_pg()).collect()
}

#[async_trait]
impl EventStore for PostgresClient {
    async fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<u64, StoreError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        client.execute(sql, &bind(args)).await.map_err(db_error)
    }

    async fn query_max_block(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<Option<u64>, StoreError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let row = client.query_one(sql, &bind(args)).await.map_err(db_error)?;
        let block: Option<i64> = row.get(0);
        Ok(block.map(|b| b as u64))
    }

    async fn query_tickers(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<String>, StoreError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let rows = client.query(sql, &bind(args)).await.map_err(db_error)?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn factory_pairs(&self) -> Result<Vec<FactoryPairRow>, StoreError> {
        let client = self.pool.get().await.map_err(pool_error)?;
        let rows = client
            .query(
                "SELECT pair, block, pair_addr FROM us_factory ORDER BY block DESC",
                &[],
            )
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                let ticker: String = row.get(0);
                let block: i64 = row.get(1);
                let addr: String = row.get(2);
                let pair_addr = addr.parse().map_err(|e| {
                    StoreError::Fatal(format!("malformed pair_addr {addr} in us_factory: {e}"))
                })?;
                Ok(FactoryPairRow {
                    ticker,
                    block: block as u64,
                    pair_addr,
                })
            })
            .collect()
    }
}
