/// Uniswap V2 factory ABI, events only.
///
/// The trailing unnamed uint of PairCreated is the factory's pair counter;
/// it is named here so decoded field maps have a stable key.
pub const FACTORY_ABI: &str = r#"[
  {
    "anonymous": false,
    "inputs": [
      {"indexed": true,  "internalType": "address", "name": "token0",  "type": "address"},
      {"indexed": true,  "internalType": "address", "name": "token1",  "type": "address"},
      {"indexed": false, "internalType": "address", "name": "pair",    "type": "address"},
      {"indexed": false, "internalType": "uint256", "name": "pair_id", "type": "uint256"}
    ],
    "name": "PairCreated",
    "type": "event"
  }
]"#;
