//! The sync core: ABI decoding, contract descriptors, log parsing, symbol
//! resolution and the window-driven engine that ties them together.

pub mod abi;
pub mod contract;
pub mod engine;
pub mod parser;
pub mod symbols;

#[cfg(test)]
pub(crate) mod testutil;

pub use contract::{ContractSync, FieldKind, FieldSchema};
pub use engine::Engine;
pub use parser::{parse_log, ParsedRow};
pub use symbols::SymbolResolver;
