pub mod erc20;
pub mod factory;
pub mod pair;

pub use erc20::{IERC20, IERC20Bytes32};
pub use factory::FACTORY_ABI;
pub use pair::PAIR_ABI;
