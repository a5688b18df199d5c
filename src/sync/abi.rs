//! Dynamic JSON-ABI event decoding.
//!
//! The descriptors carry parsed ABIs rather than generated bindings; events
//! are resolved by topic0 at runtime and the non-indexed data words are
//! decoded into a named field map.

use std::collections::HashMap;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi::{Event, JsonAbi},
    primitives::{Address, B256, U256},
};

use crate::errors::SyncError;

/// A decoded non-indexed event field. The pair and factory events only
/// ever carry addresses and unsigned integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Address(Address),
    Uint(U256),
}

pub fn parse_abi(json: &str) -> Result<JsonAbi, SyncError> {
    serde_json::from_str(json).map_err(|e| SyncError::InvalidAbi(e.to_string()))
}

/// Resolve an event by the keccak hash of its signature.
pub fn event_by_topic0(abi: &JsonAbi, topic0: B256) -> Option<&Event> {
    abi.events().find(|e| e.selector() == topic0)
}

/// Decode a log's data section against the named event.
///
/// Only the non-indexed inputs are decoded here; indexed values live in the
/// topic list and are extracted by the log parser.
pub fn decode_data(
    abi: &JsonAbi,
    event_name: &str,
    data: &[u8],
) -> Result<HashMap<String, DecodedValue>, SyncError> {
    let event = abi
        .events()
        .find(|e| e.name == event_name)
        .ok_or_else(|| SyncError::UnknownEvent(event_name.to_string()))?;

    let body: Vec<_> = event.inputs.iter().filter(|p| !p.indexed).collect();
    let types = body
        .iter()
        .map(|p| p.resolve())
        .collect::<Result<Vec<DynSolType>, _>>()
        .map_err(|e| SyncError::InvalidAbi(e.to_string()))?;

    let decoded = DynSolType::Tuple(types)
        .abi_decode_sequence(data)
        .map_err(|e| SyncError::DecodeMismatch(format!("{event_name}: {e}")))?;

    let DynSolValue::Tuple(values) = decoded else {
        return Err(SyncError::DecodeMismatch(format!(
            "{event_name}: data did not decode to a sequence"
        )));
    };

    let mut fields = HashMap::with_capacity(values.len());
    for (param, value) in body.iter().zip(values) {
        let value = match value {
            DynSolValue::Address(a) => DecodedValue::Address(a),
            DynSolValue::Uint(u, _) => DecodedValue::Uint(u),
            other => {
                return Err(SyncError::DecodeMismatch(format!(
                    "{event_name}.{}: unsupported value {other:?}",
                    param.name
                )))
            },
        };
        fields.insert(param.name.clone(), value);
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abis::{FACTORY_ABI, PAIR_ABI};

    fn encode_words(words: &[[u8; 32]]) -> Vec<u8> {
        words.iter().flat_map(|w| w.iter().copied()).collect()
    }

    #[test]
    fn rejects_malformed_abi() {
        let err = parse_abi("not json").unwrap_err();
        assert!(matches!(err, SyncError::InvalidAbi(_)));
    }

    #[test]
    fn resolves_events_by_topic0() {
        let abi = parse_abi(PAIR_ABI).unwrap();
        let swap = abi.events().find(|e| e.name == "Swap").unwrap();
        let found = event_by_topic0(&abi, swap.selector()).unwrap();
        assert_eq!(found.name, "Swap");

        assert!(event_by_topic0(&abi, B256::repeat_byte(0x11)).is_none());
    }

    #[test]
    fn decodes_pair_created_data() {
        let abi = parse_abi(FACTORY_ABI).unwrap();
        let pair = Address::repeat_byte(0xCC);
        let data = encode_words(&[pair.into_word().0, U256::from(7u64).to_be_bytes::<32>()]);

        let fields = decode_data(&abi, "PairCreated", &data).unwrap();
        assert_eq!(fields["pair"], DecodedValue::Address(pair));
        assert_eq!(fields["pair_id"], DecodedValue::Uint(U256::from(7u64)));
    }

    #[test]
    fn preserves_full_uint_precision() {
        let abi = parse_abi(PAIR_ABI).unwrap();
        let reserve0 = U256::from(10u64).pow(U256::from(18u64));
        let reserve1 = U256::from(2_500_000_000u64);
        let data = encode_words(&[reserve0.to_be_bytes::<32>(), reserve1.to_be_bytes::<32>()]);

        let fields = decode_data(&abi, "Sync", &data).unwrap();
        let DecodedValue::Uint(r0) = &fields["reserve0"] else {
            panic!("reserve0 should be a uint");
        };
        assert_eq!(r0.to_string(), "1000000000000000000");
        assert_eq!(fields["reserve1"], DecodedValue::Uint(reserve1));
    }

    #[test]
    fn unknown_event_name_is_an_error() {
        let abi = parse_abi(PAIR_ABI).unwrap();
        let err = decode_data(&abi, "Collect", &[]).unwrap_err();
        assert!(matches!(err, SyncError::UnknownEvent(_)));
    }

    #[test]
    fn truncated_data_is_a_decode_mismatch() {
        let abi = parse_abi(PAIR_ABI).unwrap();
        let err = decode_data(&abi, "Swap", &[0u8; 32]).unwrap_err();
        assert!(matches!(err, SyncError::DecodeMismatch(_)));
    }
}
