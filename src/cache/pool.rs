//! Pool address cache (spec §4.2 `getPools`): resolves `(tokenA, tokenB,
//! router, family, fee?)` to the on-chain pool address, DB-first with
//! on-chain fallback and a 15s timeout, falling back again to a DB search by
//! `(token0, token1, family)` if the chain call times out.

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

use crate::contracts::{IUniswapV2Factory, IUniswapV3Factory};
use crate::db::Database;
use crate::rpc::{RpcPool, POOL_LOOKUP_TIMEOUT};
use crate::types::{PoolRecord, RouterFamily};

const DEFAULT_V3_FEE: &str = "2500";

#[derive(Clone)]
pub struct PoolCache {
    memory: Arc<DashMap<PoolKey, Option<PoolRecord>>>,
    db: Database,
    rpc: RpcPool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    chain_id: i64,
    token_lo: String,
    token_hi: String,
    family: RouterFamily,
    fee: Option<String>,
}

impl PoolCache {
    pub fn new(db: Database, rpc: RpcPool) -> Self {
        Self {
            memory: Arc::new(DashMap::new()),
            db,
            rpc,
        }
    }

    /// Resolve the pool for a swap leg. `factory_address` must already be
    /// the resolved DEX factory (see `RouterRegistry::resolve_for_pool_lookup`
    /// plus `FactoryCache::get_factory`). Returns `None` when the pool is
    /// absent or the lookup degrades to "unknown" after a timeout.
    pub async fn get_pool(
        &self,
        chain_id: i64,
        token_a: &str,
        token_b: &str,
        factory_address: &str,
        family: RouterFamily,
        fee: Option<String>,
    ) -> Result<Option<PoolRecord>> {
        let (token_lo, token_hi) = sorted_pair(token_a, token_b);
        let key = PoolKey {
            chain_id,
            token_lo: token_lo.clone(),
            token_hi: token_hi.clone(),
            family,
            fee: fee.clone(),
        };

        if let Some(hit) = self.memory.get(&key) {
            return Ok(hit.clone());
        }

        if let Some(record) = self.db.find_pool_by_tokens(chain_id, &token_lo, &token_hi, family).await? {
            if !record.exists || crate::addressing::is_zero(&record.pool_address) {
                self.memory.insert(key, None);
                return Ok(None);
            }
            self.memory.insert(key, Some(record.clone()));
            return Ok(Some(record));
        }

        match self
            .lookup_on_chain(chain_id, &token_lo, &token_hi, factory_address, family, fee)
            .await
        {
            Ok(Some(record)) => {
                self.db.upsert_pool(&record).await?;
                self.memory.insert(key, Some(record.clone()));
                Ok(Some(record))
            }
            Ok(None) => {
                // Zero-address result: pool genuinely absent. Memoized
                // in-process only — never persisted (spec §4.2).
                self.memory.insert(key, None);
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "pool lookup timed out, degrading to absent");
                Ok(None)
            }
        }
    }

    async fn lookup_on_chain(
        &self,
        chain_id: i64,
        token_lo: &str,
        token_hi: &str,
        factory_address: &str,
        family: RouterFamily,
        fee: Option<String>,
    ) -> Result<Option<PoolRecord>> {
        let factory: alloy::primitives::Address = factory_address.parse()?;
        let token_a: alloy::primitives::Address = token_lo.parse()?;
        let token_b: alloy::primitives::Address = token_hi.parse()?;

        let pool_address = match family {
            RouterFamily::V2 => {
                self.rpc
                    .call(POOL_LOOKUP_TIMEOUT, |p| async move {
                        Ok(IUniswapV2Factory::new(factory, p).getPair(token_a, token_b).call().await?)
                    })
                    .await?
            }
            RouterFamily::V3 => {
                let fee_value: u32 = fee
                    .as_deref()
                    .unwrap_or(DEFAULT_V3_FEE)
                    .parse()
                    .unwrap_or(2500);
                self.rpc
                    .call(POOL_LOOKUP_TIMEOUT, |p| async move {
                        Ok(IUniswapV3Factory::new(factory, p)
                            .getPool(token_a, token_b, fee_value)
                            .call()
                            .await?)
                    })
                    .await?
            }
        };

        if crate::addressing::is_zero(&crate::types::lower(pool_address)) {
            return Ok(None);
        }

        Ok(Some(PoolRecord {
            chain_id,
            pool_address: crate::types::lower(pool_address),
            token0: token_lo.to_string(),
            token1: token_hi.to_string(),
            exists: true,
            router_family: family,
            fee: fee.unwrap_or_else(|| DEFAULT_V3_FEE.to_string()),
        }))
    }
}

fn sorted_pair(a: &str, b: &str) -> (String, String) {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_pair_is_order_independent() {
        assert_eq!(
            sorted_pair("0xbbb0000000000000000000000000000000000b", "0xaaa0000000000000000000000000000000000a"),
            sorted_pair("0xaaa0000000000000000000000000000000000a", "0xbbb0000000000000000000000000000000000b")
        );
    }
}
