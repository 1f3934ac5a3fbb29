//! Persistence layer.
//!
//! Hand-written SQL over `sqlx::PgPool`, no ORM — grounded in
//! cowprotocol-services' `crates/database` (plain query functions, SQL kept
//! as string constants, typed row structs via `sqlx::FromRow`).
//!
//! Schema summary (spec §6): `tokens(chainId, tokenAddress)` unique,
//! `pools(chainId, poolAddress)` unique, `factory_addresses(chainId, router)`
//! unique, `opportunities(chainId, txHash)` unique. Migrations are out of
//! scope for this crate (spec §1); the `schema.sql` in this directory
//! documents the expected shape for operators provisioning a database.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use crate::types::{
    FactoryRecord, Opportunity, OpportunityMetadata, OpportunityStatus, PoolRecord, RouterFamily,
    TokenRecord,
};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("failed to connect to database")?;
        Ok(Self { pool })
    }

    /// Part of the §5 shutdown sequence: close the connection pool after the
    /// bus producer/consumer have been closed.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ── Token cache backing store ────────────────────────────────────

    pub async fn get_token(&self, chain_id: i64, address: &str) -> Result<Option<TokenRecord>> {
        const QUERY: &str = "SELECT chain_id, token_address, name, symbol, decimals \
             FROM tokens WHERE chain_id = $1 AND token_address = $2";
        let row: Option<TokenRow> = sqlx::query_as(QUERY)
            .bind(chain_id)
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn upsert_token(&self, record: &TokenRecord) -> Result<()> {
        const QUERY: &str = "\
            INSERT INTO tokens (chain_id, token_address, name, symbol, decimals) \
            VALUES ($1, $2, $3, $4, $5) \
            ON CONFLICT (chain_id, token_address) DO UPDATE SET \
                name = EXCLUDED.name, symbol = EXCLUDED.symbol, decimals = EXCLUDED.decimals";
        sqlx::query(QUERY)
            .bind(record.chain_id)
            .bind(&record.token_address)
            .bind(&record.name)
            .bind(&record.symbol)
            .bind(record.decimals)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Factory cache backing store ──────────────────────────────────

    pub async fn get_factory(&self, chain_id: i64, router: &str) -> Result<Option<FactoryRecord>> {
        const QUERY: &str = "SELECT chain_id, router, factory_address, wrapped_native_address, router_family \
             FROM factory_addresses WHERE chain_id = $1 AND router = $2";
        let row: Option<FactoryRow> = sqlx::query_as(QUERY)
            .bind(chain_id)
            .bind(router)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn upsert_factory(&self, record: &FactoryRecord) -> Result<()> {
        const QUERY: &str = "\
            INSERT INTO factory_addresses (chain_id, router, factory_address, wrapped_native_address, router_family) \
            VALUES ($1, $2, $3, $4, $5) \
            ON CONFLICT (chain_id, router) DO UPDATE SET \
                factory_address = EXCLUDED.factory_address, \
                wrapped_native_address = EXCLUDED.wrapped_native_address, \
                router_family = EXCLUDED.router_family";
        sqlx::query(QUERY)
            .bind(record.chain_id)
            .bind(&record.router)
            .bind(&record.factory_address)
            .bind(&record.wrapped_native_address)
            .bind(record.router_family.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Pool cache backing store ─────────────────────────────────────

    /// Look up a pool by its on-chain address (exact-key cache hit).
    pub async fn get_pool_by_address(
        &self,
        chain_id: i64,
        pool_address: &str,
    ) -> Result<Option<PoolRecord>> {
        const QUERY: &str = "SELECT chain_id, pool_address, token0, token1, exists, router_family, fee \
             FROM pools WHERE chain_id = $1 AND pool_address = $2";
        let row: Option<PoolRow> = sqlx::query_as(QUERY)
            .bind(chain_id)
            .bind(pool_address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// DB-search fallback keyed by `(token0, token1, family)` — used when the
    /// on-chain factory lookup has timed out (spec §4.2). Order-independent:
    /// matches either token ordering.
    pub async fn find_pool_by_tokens(
        &self,
        chain_id: i64,
        token_a: &str,
        token_b: &str,
        family: RouterFamily,
    ) -> Result<Option<PoolRecord>> {
        const QUERY: &str = "\
            SELECT chain_id, pool_address, token0, token1, exists, router_family, fee \
            FROM pools \
            WHERE chain_id = $1 AND router_family = $2 \
              AND ((token0 = $3 AND token1 = $4) OR (token0 = $4 AND token1 = $3)) \
            LIMIT 1";
        let row: Option<PoolRow> = sqlx::query_as(QUERY)
            .bind(chain_id)
            .bind(family.to_string())
            .bind(token_a)
            .bind(token_b)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn upsert_pool(&self, record: &PoolRecord) -> Result<()> {
        const QUERY: &str = "\
            INSERT INTO pools (chain_id, pool_address, token0, token1, exists, router_family, fee) \
            VALUES ($1, $2, $3, $4, $5, $6, $7) \
            ON CONFLICT (chain_id, pool_address) DO UPDATE SET \
                token0 = EXCLUDED.token0, token1 = EXCLUDED.token1, \
                exists = EXCLUDED.exists, router_family = EXCLUDED.router_family, fee = EXCLUDED.fee";
        sqlx::query(QUERY)
            .bind(record.chain_id)
            .bind(&record.pool_address)
            .bind(&record.token0)
            .bind(&record.token1)
            .bind(record.exists)
            .bind(record.router_family.to_string())
            .bind(&record.fee)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ── Opportunities ─────────────────────────────────────────────────

    pub async fn upsert_opportunity(&self, opp: &Opportunity) -> Result<()> {
        const QUERY: &str = "\
            INSERT INTO opportunities (
                chain_id, tx_hash, router, router_family, token_in, token_out,
                amount_in, amount_out, fee, pool_address, method, recipient,
                deadline, block_number, status, detected_at, processed_at, metadata
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18) \
            ON CONFLICT (chain_id, tx_hash) DO UPDATE SET \
                router = EXCLUDED.router, router_family = EXCLUDED.router_family, \
                token_in = EXCLUDED.token_in, token_out = EXCLUDED.token_out, \
                amount_in = EXCLUDED.amount_in, amount_out = EXCLUDED.amount_out, \
                fee = EXCLUDED.fee, pool_address = EXCLUDED.pool_address, \
                method = EXCLUDED.method, recipient = EXCLUDED.recipient, \
                deadline = EXCLUDED.deadline, block_number = EXCLUDED.block_number, \
                status = EXCLUDED.status, processed_at = EXCLUDED.processed_at, \
                metadata = EXCLUDED.metadata";
        let metadata = serde_json::to_value(&opp.metadata).context("serialize opportunity metadata")?;
        sqlx::query(QUERY)
            .bind(opp.chain_id)
            .bind(&opp.tx_hash)
            .bind(&opp.router)
            .bind(opp.router_family.to_string())
            .bind(&opp.token_in)
            .bind(&opp.token_out)
            .bind(&opp.amount_in)
            .bind(&opp.amount_out)
            .bind(&opp.fee)
            .bind(&opp.pool_address)
            .bind(&opp.method)
            .bind(&opp.recipient)
            .bind(&opp.deadline)
            .bind(opp.block_number)
            .bind(opp.status.to_string())
            .bind(opp.detected_at)
            .bind(opp.processed_at.unwrap_or_else(Utc::now))
            .bind(metadata)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_opportunities(
        &self,
        chain_id: i64,
        status: Option<OpportunityStatus>,
        limit: i64,
    ) -> Result<Vec<Opportunity>> {
        let rows: Vec<OpportunityRow> = if let Some(status) = status {
            const QUERY: &str = "\
                SELECT chain_id, tx_hash, router, router_family, token_in, token_out,
                       amount_in, amount_out, fee, pool_address, method, recipient,
                       deadline, block_number, status, detected_at, processed_at, metadata
                FROM opportunities WHERE chain_id = $1 AND status = $2
                ORDER BY detected_at DESC LIMIT $3";
            sqlx::query_as(QUERY)
                .bind(chain_id)
                .bind(status.to_string())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        } else {
            const QUERY: &str = "\
                SELECT chain_id, tx_hash, router, router_family, token_in, token_out,
                       amount_in, amount_out, fee, pool_address, method, recipient,
                       deadline, block_number, status, detected_at, processed_at, metadata
                FROM opportunities WHERE chain_id = $1
                ORDER BY detected_at DESC LIMIT $2";
            sqlx::query_as(QUERY)
                .bind(chain_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }

    // ── Cleanup loop (spec §4.8) ──────────────────────────────────────

    pub async fn delete_by_status(&self, status: OpportunityStatus) -> Result<u64> {
        const QUERY: &str = "DELETE FROM opportunities WHERE status = $1";
        let result = sqlx::query(QUERY)
            .bind(status.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete `detected` rows whose metadata explicitly marks `isExpired`.
    pub async fn delete_detected_marked_expired(&self) -> Result<u64> {
        const QUERY: &str = "\
            DELETE FROM opportunities \
            WHERE status = 'detected' AND (metadata->>'is_expired')::boolean IS TRUE";
        let result = sqlx::query(QUERY).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Remaining `detected` rows, for the in-process deadline re-check
    /// (spec §4.8 step 3 — JSON-numeric comparison in the store is
    /// unreliable, so the comparison happens in Rust, not SQL).
    pub async fn list_detected(&self) -> Result<Vec<Opportunity>> {
        const QUERY: &str = "\
            SELECT chain_id, tx_hash, router, router_family, token_in, token_out,
                   amount_in, amount_out, fee, pool_address, method, recipient,
                   deadline, block_number, status, detected_at, processed_at, metadata
            FROM opportunities WHERE status = 'detected'";
        let rows: Vec<OpportunityRow> = sqlx::query_as(QUERY).fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn delete_opportunity(&self, chain_id: i64, tx_hash: &str) -> Result<()> {
        const QUERY: &str = "DELETE FROM opportunities WHERE chain_id = $1 AND tx_hash = $2";
        sqlx::query(QUERY)
            .bind(chain_id)
            .bind(tx_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ── Row mapping ───────────────────────────────────────────────────────

#[derive(FromRow)]
struct TokenRow {
    chain_id: i64,
    token_address: String,
    name: String,
    symbol: String,
    decimals: i16,
}

impl From<TokenRow> for TokenRecord {
    fn from(r: TokenRow) -> Self {
        TokenRecord {
            chain_id: r.chain_id,
            token_address: r.token_address,
            name: r.name,
            symbol: r.symbol,
            decimals: r.decimals,
        }
    }
}

#[derive(FromRow)]
struct FactoryRow {
    chain_id: i64,
    router: String,
    factory_address: String,
    wrapped_native_address: String,
    router_family: String,
}

impl From<FactoryRow> for FactoryRecord {
    fn from(r: FactoryRow) -> Self {
        FactoryRecord {
            chain_id: r.chain_id,
            router: r.router,
            factory_address: r.factory_address,
            wrapped_native_address: r.wrapped_native_address,
            router_family: r.router_family.parse().unwrap_or(RouterFamily::V2),
        }
    }
}

#[derive(FromRow)]
struct PoolRow {
    chain_id: i64,
    pool_address: String,
    token0: String,
    token1: String,
    exists: bool,
    router_family: String,
    fee: String,
}

impl From<PoolRow> for PoolRecord {
    fn from(r: PoolRow) -> Self {
        PoolRecord {
            chain_id: r.chain_id,
            pool_address: r.pool_address,
            token0: r.token0,
            token1: r.token1,
            exists: r.exists,
            router_family: r.router_family.parse().unwrap_or(RouterFamily::V2),
            fee: r.fee,
        }
    }
}

#[derive(FromRow)]
struct OpportunityRow {
    chain_id: i64,
    tx_hash: String,
    router: String,
    router_family: String,
    token_in: String,
    token_out: String,
    amount_in: String,
    amount_out: String,
    fee: String,
    pool_address: String,
    method: String,
    recipient: String,
    deadline: String,
    block_number: Option<i64>,
    status: String,
    detected_at: chrono::DateTime<Utc>,
    processed_at: Option<chrono::DateTime<Utc>>,
    metadata: serde_json::Value,
}

impl TryFrom<OpportunityRow> for Opportunity {
    type Error = anyhow::Error;

    fn try_from(r: OpportunityRow) -> Result<Self> {
        let metadata: OpportunityMetadata =
            serde_json::from_value(r.metadata).context("deserialize opportunity metadata")?;
        Ok(Opportunity {
            chain_id: r.chain_id,
            tx_hash: r.tx_hash,
            router: r.router,
            router_family: r.router_family.parse().unwrap_or(RouterFamily::V2),
            token_in: r.token_in,
            token_out: r.token_out,
            amount_in: r.amount_in,
            amount_out: r.amount_out,
            fee: r.fee,
            pool_address: r.pool_address,
            method: r.method,
            recipient: r.recipient,
            deadline: r.deadline,
            block_number: r.block_number,
            status: r.status.parse()?,
            detected_at: r.detected_at,
            processed_at: r.processed_at,
            metadata,
        })
    }
}
