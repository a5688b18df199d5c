//! Per-contract sync descriptors.
//!
//! The set is closed (a factory and its pairs), so this is a tagged enum
//! rather than trait objects. A descriptor knows its contract identity,
//! how to resolve an event name from topics, the field schema per event,
//! and the SQL that persists and resumes its rows.

use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, B256};

use crate::db::{EventStore, SqlValue};
use crate::errors::SyncError;
use crate::sync::abi;

/// Coarse type tag for a non-indexed data field.
///
/// `SmallUint` is reserved for counters known to fit 64 bits (the factory's
/// pair counter); every AMM amount is `BigUint` and travels as decimal text
/// so 256-bit precision survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Address,
    SmallUint,
    BigUint,
}

/// Ordered field layout of one event: indexed topic column names, then
/// (name, kind) for each decoded data column.
#[derive(Debug)]
pub struct FieldSchema {
    pub topics: &'static [&'static str],
    pub data: &'static [(&'static str, FieldKind)],
}

const FACTORY_PAIR_CREATED: FieldSchema = FieldSchema {
    topics: &["token0", "token1"],
    data: &[("pair", FieldKind::Address), ("pair_id", FieldKind::SmallUint)],
};

const PAIR_MINT: FieldSchema = FieldSchema {
    topics: &["sender"],
    data: &[("amount0", FieldKind::BigUint), ("amount1", FieldKind::BigUint)],
};

const PAIR_BURN: FieldSchema = FieldSchema {
    topics: &["sender", "dest"],
    data: &[("amount0", FieldKind::BigUint), ("amount1", FieldKind::BigUint)],
};

const PAIR_SWAP: FieldSchema = FieldSchema {
    topics: &["sender", "dest"],
    data: &[
        ("amount0In", FieldKind::BigUint),
        ("amount1In", FieldKind::BigUint),
        ("amount0Out", FieldKind::BigUint),
        ("amount1Out", FieldKind::BigUint),
    ],
};

const PAIR_SYNC: FieldSchema = FieldSchema {
    topics: &[],
    data: &[("reserve0", FieldKind::BigUint), ("reserve1", FieldKind::BigUint)],
};

const PAIR_APPROVAL: FieldSchema = FieldSchema {
    topics: &["owner", "spender"],
    data: &[("value", FieldKind::BigUint)],
};

const PAIR_TRANSFER: FieldSchema = FieldSchema {
    topics: &["sender", "dest"],
    data: &[("value", FieldKind::BigUint)],
};

const PAIR_EVENT_TABLES: [&str; 6] = ["mint", "burn", "swap", "sync", "approval", "transfer"];

pub struct FactorySync {
    address: Address,
    creation_block: u64,
    abi: Arc<JsonAbi>,
}

pub struct PairSync {
    address: Address,
    creation_block: u64,
    ticker: String,
    abi: Arc<JsonAbi>,
}

pub enum ContractSync {
    Factory(FactorySync),
    Pair(PairSync),
}

impl ContractSync {
    pub fn factory(address: Address, creation_block: u64, abi: Arc<JsonAbi>) -> Self {
        ContractSync::Factory(FactorySync {
            address,
            creation_block,
            abi,
        })
    }

    pub fn pair(address: Address, creation_block: u64, ticker: String, abi: Arc<JsonAbi>) -> Self {
        ContractSync::Pair(PairSync {
            address,
            creation_block,
            ticker,
            abi,
        })
    }

    pub fn name(&self) -> String {
        match self {
            ContractSync::Factory(_) => "USV2Factory".to_string(),
            ContractSync::Pair(p) => format!("USV2Pair_{}", p.ticker),
        }
    }

    pub fn address(&self) -> Address {
        match self {
            ContractSync::Factory(f) => f.address,
            ContractSync::Pair(p) => p.address,
        }
    }

    pub fn creation_block(&self) -> u64 {
        match self {
            ContractSync::Factory(f) => f.creation_block,
            ContractSync::Pair(p) => p.creation_block,
        }
    }

    pub fn abi(&self) -> &JsonAbi {
        match self {
            ContractSync::Factory(f) => &f.abi,
            ContractSync::Pair(p) => &p.abi,
        }
    }

    pub fn ticker(&self) -> Option<&str> {
        match self {
            ContractSync::Factory(_) => None,
            ContractSync::Pair(p) => Some(&p.ticker),
        }
    }

    /// Resolve the event a log belongs to from its topic list.
    ///
    /// The factory emits exactly one event. For pairs, Sync is the only
    /// event without indexed inputs, so an empty topic list identifies it;
    /// otherwise topic0 does.
    pub fn event_name(&self, topics: &[B256]) -> Result<String, SyncError> {
        match self {
            ContractSync::Factory(_) => Ok("PairCreated".to_string()),
            ContractSync::Pair(p) => {
                if topics.is_empty() {
                    Ok("Sync".to_string())
                } else {
                    abi::event_by_topic0(&p.abi, topics[0])
                        .map(|e| e.name.clone())
                        .ok_or_else(|| SyncError::UnknownEvent(topics[0].to_string()))
                }
            },
        }
    }

    pub fn field_schema(&self, event: &str) -> Result<&'static FieldSchema, SyncError> {
        let schema = match (self, event) {
            (ContractSync::Factory(_), "PairCreated") => &FACTORY_PAIR_CREATED,
            (ContractSync::Pair(_), "Mint") => &PAIR_MINT,
            (ContractSync::Pair(_), "Burn") => &PAIR_BURN,
            (ContractSync::Pair(_), "Swap") => &PAIR_SWAP,
            (ContractSync::Pair(_), "Sync") => &PAIR_SYNC,
            (ContractSync::Pair(_), "Approval") => &PAIR_APPROVAL,
            (ContractSync::Pair(_), "Transfer") => &PAIR_TRANSFER,
            _ => return Err(SyncError::UnknownEvent(event.to_string())),
        };
        Ok(schema)
    }

    /// Highest block already persisted for this descriptor.
    ///
    /// The factory reads its single table; a pair takes the maximum across
    /// its six event tables, filtered to its own ticker.
    pub async fn last_committed_block(
        &self,
        store: &dyn EventStore,
    ) -> Result<Option<u64>, SyncError> {
        match self {
            ContractSync::Factory(_) => Ok(store
                .query_max_block("SELECT MAX(block) FROM us_factory", &[])
                .await?),
            ContractSync::Pair(p) => {
                let mut last = None;
                for table in PAIR_EVENT_TABLES {
                    let sql = format!("SELECT MAX(block) FROM us_pair_{table} WHERE pair = $1");
                    let block = store
                        .query_max_block(&sql, &[SqlValue::Text(p.ticker.clone())])
                        .await?;
                    last = last.max(block);
                }
                Ok(last)
            },
        }
    }

    /// Write one fully-parsed row into the event's table.
    ///
    /// For pairs the ticker is embedded as a literal since it is constant
    /// per descriptor; for the factory it arrives as the first parameter.
    /// ON CONFLICT DO NOTHING makes window re-scans after a restart safe.
    pub async fn insert(
        &self,
        store: &dyn EventStore,
        event: &str,
        values: &[SqlValue],
    ) -> Result<(), SyncError> {
        let sql = self.insert_sql(event)?;
        store.execute(&sql, values).await?;
        Ok(())
    }

    pub(crate) fn insert_sql(&self, event: &str) -> Result<String, SyncError> {
        match self {
            ContractSync::Factory(_) => {
                if event != "PairCreated" {
                    return Err(SyncError::UnknownEvent(event.to_string()));
                }
                Ok("INSERT INTO us_factory \
                    (pair, block, tx_hash, token0, token1, pair_addr, pair_id) \
                    VALUES ($1, $2, $3, $4, $5, $6, $7) \
                    ON CONFLICT DO NOTHING"
                    .to_string())
            },
            ContractSync::Pair(p) => {
                let t = &p.ticker;
                let sql = match event {
                    "Mint" => format!(
                        "INSERT INTO us_pair_mint \
                         (pair, block, tx_hash, sender, amount0, amount1) \
                         VALUES ('{t}', $1, $2, $3, $4::numeric, $5::numeric) \
                         ON CONFLICT DO NOTHING"
                    ),
                    "Burn" => format!(
                        "INSERT INTO us_pair_burn \
                         (pair, block, tx_hash, sender, dest, amount0, amount1) \
                         VALUES ('{t}', $1, $2, $3, $4, $5::numeric, $6::numeric) \
                         ON CONFLICT DO NOTHING"
                    ),
                    "Swap" => format!(
                        "INSERT INTO us_pair_swap \
                         (pair, block, tx_hash, sender, dest, amount0In, amount1In, amount0Out, amount1Out) \
                         VALUES ('{t}', $1, $2, $3, $4, $5::numeric, $6::numeric, $7::numeric, $8::numeric) \
                         ON CONFLICT DO NOTHING"
                    ),
                    "Sync" => format!(
                        "INSERT INTO us_pair_sync \
                         (pair, block, tx_hash, reserve0, reserve1) \
                         VALUES ('{t}', $1, $2, $3::numeric, $4::numeric) \
                         ON CONFLICT DO NOTHING"
                    ),
                    "Approval" => format!(
                        "INSERT INTO us_pair_approval \
                         (pair, block, tx_hash, owner, spender, value) \
                         VALUES ('{t}', $1, $2, $3, $4, $5::numeric) \
                         ON CONFLICT DO NOTHING"
                    ),
                    "Transfer" => format!(
                        "INSERT INTO us_pair_transfer \
                         (pair, block, tx_hash, sender, dest, value) \
                         VALUES ('{t}', $1, $2, $3, $4, $5::numeric) \
                         ON CONFLICT DO NOTHING"
                    ),
                    _ => return Err(SyncError::UnknownEvent(event.to_string())),
                };
                Ok(sql)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abis::{FACTORY_ABI, PAIR_ABI};
    use crate::sync::testutil::BlockHeights;

    fn pair_desc(ticker: &str) -> ContractSync {
        let abi = Arc::new(abi::parse_abi(PAIR_ABI).unwrap());
        ContractSync::pair(Address::repeat_byte(0xCC), 1020, ticker.to_string(), abi)
    }

    fn factory_desc() -> ContractSync {
        let abi = Arc::new(abi::parse_abi(FACTORY_ABI).unwrap());
        ContractSync::factory(Address::repeat_byte(0xFF), 1000, abi)
    }

    #[test]
    fn descriptors_report_their_identity() {
        let factory = factory_desc();
        assert_eq!(factory.name(), "USV2Factory");
        assert_eq!(factory.creation_block(), 1000);
        assert_eq!(factory.ticker(), None);

        let pair = pair_desc("AAA-BBB-0");
        assert_eq!(pair.name(), "USV2Pair_AAA-BBB-0");
        assert_eq!(pair.address(), Address::repeat_byte(0xCC));
        assert_eq!(pair.ticker(), Some("AAA-BBB-0"));
    }

    #[test]
    fn factory_event_name_is_unconditional() {
        let desc = factory_desc();
        assert_eq!(desc.event_name(&[]).unwrap(), "PairCreated");
        assert_eq!(
            desc.event_name(&[B256::repeat_byte(0x42)]).unwrap(),
            "PairCreated"
        );
    }

    #[test]
    fn empty_topics_resolve_to_sync() {
        let desc = pair_desc("AAA-BBB-0");
        assert_eq!(desc.event_name(&[]).unwrap(), "Sync");
    }

    #[test]
    fn unknown_topic0_is_an_error() {
        let desc = pair_desc("AAA-BBB-0");
        let err = desc.event_name(&[B256::repeat_byte(0x42)]).unwrap_err();
        assert!(matches!(err, SyncError::UnknownEvent(_)));
    }

    #[test]
    fn swap_insert_sql_embeds_ticker_and_columns() {
        let sql = pair_desc("AAA-BBB-0").insert_sql("Swap").unwrap();
        assert!(sql.contains("us_pair_swap"));
        assert!(sql.contains("'AAA-BBB-0'"));
        assert!(sql.contains("amount0In, amount1In, amount0Out, amount1Out"));
        assert!(sql.contains("ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn factory_insert_sql_takes_ticker_as_parameter() {
        let sql = factory_desc().insert_sql("PairCreated").unwrap();
        assert!(sql.contains("us_factory"));
        assert!(sql.contains("$7"));
        assert!(!sql.contains('\''));
    }

    #[test]
    fn pair_has_no_pair_created_insert() {
        let err = pair_desc("AAA-BBB-0").insert_sql("PairCreated").unwrap_err();
        assert!(matches!(err, SyncError::UnknownEvent(_)));
    }

    #[tokio::test]
    async fn pair_last_block_is_max_across_event_tables() {
        let store = BlockHeights::new(&[("us_pair_mint", 1025), ("us_pair_swap", 1040)]);
        let last = pair_desc("AAA-BBB-0")
            .last_committed_block(&store)
            .await
            .unwrap();
        assert_eq!(last, Some(1040));
    }

    #[tokio::test]
    async fn pair_last_block_is_none_when_unseen() {
        let store = BlockHeights::new(&[]);
        let last = pair_desc("AAA-BBB-0")
            .last_committed_block(&store)
            .await
            .unwrap();
        assert_eq!(last, None);
    }
}
