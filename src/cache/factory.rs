//! Factory/router metadata cache (spec §4.2): resolves a router address to
//! its DEX factory and wrapped-native token, DB-first with on-chain fallback.

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;

use crate::contracts::{IUniswapV2Router02, IUniswapV3Router};
use crate::db::Database;
use crate::rpc::{RpcPool, CALL_TIMEOUT};
use crate::types::{FactoryRecord, RouterFamily};

#[derive(Clone)]
pub struct FactoryCache {
    memory: Arc<DashMap<(i64, String), FactoryRecord>>,
    db: Database,
    rpc: RpcPool,
}

impl FactoryCache {
    pub fn new(db: Database, rpc: RpcPool) -> Self {
        Self {
            memory: Arc::new(DashMap::new()),
            db,
            rpc,
        }
    }

    pub async fn get_factory(
        &self,
        chain_id: i64,
        router: &str,
        family: RouterFamily,
    ) -> Result<FactoryRecord> {
        let router = router.to_lowercase();
        let key = (chain_id, router.clone());

        if let Some(hit) = self.memory.get(&key) {
            return Ok(hit.clone());
        }

        if let Some(record) = self.db.get_factory(chain_id, &router).await? {
            self.memory.insert(key, record.clone());
            return Ok(record);
        }

        let record = self.fetch_on_chain(chain_id, &router, family).await?;
        self.db.upsert_factory(&record).await?;
        self.memory.insert(key, record.clone());
        Ok(record)
    }

    async fn fetch_on_chain(
        &self,
        chain_id: i64,
        router: &str,
        family: RouterFamily,
    ) -> Result<FactoryRecord> {
        let addr: alloy::primitives::Address = router.parse()?;
        let (factory_address, wrapped_native_address) = match family {
            RouterFamily::V2 => {
                let factory = self
                    .rpc
                    .call(CALL_TIMEOUT, |p| async move {
                        Ok(IUniswapV2Router02::new(addr, p).factory().call().await?)
                    })
                    .await?;
                let weth = self
                    .rpc
                    .call(CALL_TIMEOUT, |p| async move {
                        Ok(IUniswapV2Router02::new(addr, p).WETH().call().await?)
                    })
                    .await?;
                (factory, weth)
            }
            RouterFamily::V3 => {
                let factory = self
                    .rpc
                    .call(CALL_TIMEOUT, |p| async move {
                        Ok(IUniswapV3Router::new(addr, p).factory().call().await?)
                    })
                    .await?;
                let weth = self
                    .rpc
                    .call(CALL_TIMEOUT, |p| async move {
                        Ok(IUniswapV3Router::new(addr, p).WETH9().call().await?)
                    })
                    .await?;
                (factory, weth)
            }
        };

        Ok(FactoryRecord {
            chain_id,
            router: router.to_string(),
            factory_address: crate::types::lower(factory_address),
            wrapped_native_address: crate::types::lower(wrapped_native_address),
            router_family: family,
        })
    }
}
