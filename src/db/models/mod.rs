mod factory_pair;

pub use factory_pair::FactoryPairRow;
