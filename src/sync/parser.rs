//! Turns a raw log into the positional row a descriptor persists.

use alloy::primitives::Address;

use crate::db::SqlValue;
use crate::errors::SyncError;
use crate::node::RawLog;
use crate::sync::abi::{self, DecodedValue};
use crate::sync::contract::{ContractSync, FieldKind};

/// A parsed log: the resolved event name plus the ordered column values
/// the descriptor's insert SQL expects (block, tx hash, indexed addresses,
/// decoded data fields).
#[derive(Debug)]
pub struct ParsedRow {
    pub event: String,
    pub values: Vec<SqlValue>,
}

pub fn parse_log(desc: &ContractSync, log: &RawLog) -> Result<ParsedRow, SyncError> {
    let event = desc.event_name(&log.topics)?;
    let schema = desc.field_schema(&event)?;

    let mut values = Vec::with_capacity(2 + schema.topics.len() + schema.data.len());
    values.push(SqlValue::Int(log.block_number as i64));
    values.push(SqlValue::Text(log.tx_hash.to_string()));

    // topic0 is the event id; indexed values start at topic1
    for (i, name) in schema.topics.iter().enumerate() {
        let topic = log.topics.get(i + 1).ok_or_else(|| {
            SyncError::DecodeMismatch(format!("{event}: missing indexed topic for {name}"))
        })?;
        values.push(SqlValue::Text(Address::from_word(*topic).to_checksum(None)));
    }

    let fields = abi::decode_data(desc.abi(), &event, &log.data)?;
    for (name, kind) in schema.data {
        let value = fields.get(*name).ok_or_else(|| {
            SyncError::DecodeMismatch(format!("{event}: decoded data has no field {name}"))
        })?;
        values.push(coerce(&event, name, *kind, value)?);
    }

    Ok(ParsedRow { event, values })
}

fn coerce(
    event: &str,
    name: &str,
    kind: FieldKind,
    value: &DecodedValue,
) -> Result<SqlValue, SyncError> {
    match (kind, value) {
        (FieldKind::Address, DecodedValue::Address(a)) => {
            Ok(SqlValue::Text(a.to_checksum(None)))
        },
        (FieldKind::BigUint, DecodedValue::Uint(u)) => Ok(SqlValue::Text(u.to_string())),
        (FieldKind::SmallUint, DecodedValue::Uint(u)) => {
            let small = u64::try_from(*u)
                .ok()
                .and_then(|v| i64::try_from(v).ok())
                .ok_or_else(|| {
                    SyncError::DecodeMismatch(format!("{event}.{name}: {u} exceeds 64 bits"))
                })?;
            Ok(SqlValue::Int(small))
        },
        _ => Err(SyncError::DecodeMismatch(format!(
            "{event}.{name}: value does not match declared kind"
        ))),
    }
}
