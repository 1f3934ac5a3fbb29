//! DB-first, on-chain-fallback, write-through caches (spec §4.2).

pub mod factory;
pub mod pool;
pub mod token;

pub use factory::FactoryCache;
pub use pool::PoolCache;
pub use token::TokenCache;
