use alloy::primitives::Address;

/// A committed `us_factory` row, as read back at engine start.
///
/// Each one becomes a pair descriptor; the highest block among them is the
/// resume cursor.
#[derive(Debug, Clone)]
pub struct FactoryPairRow {
    pub ticker: String,
    pub block: u64,
    pub pair_addr: Address,
}
