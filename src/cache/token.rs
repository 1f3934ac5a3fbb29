//! ERC-20 metadata cache: DashMap in-process layer, DB-first, on-chain
//! fallback, write-through upsert (spec §4.2).
//!
//! Grounded in the teacher's `pool::state::PoolStateManager` (`Arc<DashMap<..>>`
//! wrapped in a small struct with a cheap `Clone`).

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;

use crate::contracts::IERC20Metadata;
use crate::db::Database;
use crate::rpc::{RpcPool, CALL_TIMEOUT};
use crate::types::TokenRecord;

#[derive(Clone)]
pub struct TokenCache {
    memory: Arc<DashMap<(i64, String), TokenRecord>>,
    db: Database,
    rpc: RpcPool,
}

impl TokenCache {
    pub fn new(db: Database, rpc: RpcPool) -> Self {
        Self {
            memory: Arc::new(DashMap::new()),
            db,
            rpc,
        }
    }

    pub async fn get_token(&self, chain_id: i64, address: &str) -> Result<TokenRecord> {
        let address = address.to_lowercase();
        let key = (chain_id, address.clone());

        if let Some(hit) = self.memory.get(&key) {
            return Ok(hit.clone());
        }

        if let Some(record) = self.db.get_token(chain_id, &address).await? {
            self.memory.insert(key, record.clone());
            return Ok(record);
        }

        let record = self.fetch_on_chain(chain_id, &address).await?;
        self.db.upsert_token(&record).await?;
        self.memory.insert(key, record.clone());
        Ok(record)
    }

    async fn fetch_on_chain(&self, chain_id: i64, address: &str) -> Result<TokenRecord> {
        let addr: alloy::primitives::Address = address.parse()?;

        let name_fut = self.rpc.call(CALL_TIMEOUT, |p| async move {
            Ok(IERC20Metadata::new(addr, p).name().call().await?)
        });
        let symbol_fut = self.rpc.call(CALL_TIMEOUT, |p| async move {
            Ok(IERC20Metadata::new(addr, p).symbol().call().await?)
        });
        let decimals_fut = self.rpc.call(CALL_TIMEOUT, |p| async move {
            Ok(IERC20Metadata::new(addr, p).decimals().call().await?)
        });
        let (name, symbol, decimals): (Result<String>, Result<String>, Result<u8>) =
            tokio::join!(name_fut, symbol_fut, decimals_fut);

        Ok(TokenRecord {
            chain_id,
            token_address: address.to_string(),
            name: name.unwrap_or_else(|_| "Unknown".to_string()),
            symbol: symbol.unwrap_or_else(|_| "UNKNOWN".to_string()),
            decimals: decimals.unwrap_or(18) as i16,
        })
    }
}
