//! Process entry point (spec §5): load configuration, wire the cache/
//! evaluator/bus/RPC layers, then run the mempool tap, bus consumer,
//! cleanup loop, and read-only HTTP surface as independent long-lived
//! tasks until a shutdown signal arrives.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::Address;
use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mempool_detector::addressing::RouterRegistry;
use mempool_detector::bus::{producer, BusConsumer};
use mempool_detector::cache::{FactoryCache, PoolCache, TokenCache};
use mempool_detector::cleanup::CleanupLoop;
use mempool_detector::config::AppConfig;
use mempool_detector::db::Database;
use mempool_detector::evaluator::Evaluator;
use mempool_detector::mempool::MempoolTap;
use mempool_detector::rpc::RpcPool;
use mempool_detector::{http, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    info!(chain_id = config.chain_id, "mempool detector starting");

    let rpc = RpcPool::new(config.http_rpc_urls.clone())?;
    let db = Database::connect(&config.database_url).await?;

    let token_cache = TokenCache::new(db.clone(), rpc.clone());
    let factory_cache = FactoryCache::new(db.clone(), rpc.clone());
    let pool_cache = PoolCache::new(db.clone(), rpc.clone());

    let router_registry = RouterRegistry {
        universal: config.universal_allow_list(),
        v2: config.v2_allow_list(),
        v3: config.v3_allow_list(),
        canonical_v2: config.canonical_v2_router.clone(),
        canonical_v3: config.canonical_v3_router.clone(),
    };

    let v3_quoter = Address::from_str(&config.v3_quoter_address)
        .context("V3_QUOTER_ADDRESS is not a valid address")?;

    let evaluator = Evaluator {
        token_cache,
        factory_cache,
        pool_cache,
        rpc: rpc.clone(),
        router_registry: router_registry.clone(),
        v3_quoter,
    };

    producer::init(&config.kafka_brokers, &config.kafka_client_id)
        .context("failed to initialize Kafka producer")?;

    let bus_consumer = BusConsumer::new(
        &config.kafka_brokers,
        &config.kafka_group_id,
        &config.kafka_transactions_topic,
        db.clone(),
        evaluator,
        rpc.clone(),
        config.chain_id,
    )
    .context("failed to start bus consumer")?;

    let mempool_tap = MempoolTap {
        wss_url: config.wss_rpc_url.clone(),
        http_pool: rpc.clone(),
        routers: router_registry,
        transactions_topic: config.kafka_transactions_topic.clone(),
    };

    let cleanup_loop = CleanupLoop { db: db.clone() };

    let shutdown_rx = shutdown::install().context("failed to install signal handlers")?;

    let tap_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        async move { mempool_tap.run(rx).await }
    });
    let consumer_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        async move { bus_consumer.run(rx).await }
    });
    let cleanup_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        async move { cleanup_loop.run(rx).await }
    });
    let http_handle = tokio::spawn({
        let rx = shutdown_rx.clone();
        let db = db.clone();
        let listen_addr = config.http_listen_addr.clone();
        async move { http::serve(&listen_addr, db, rx).await }
    });

    let _ = tokio::join!(tap_handle, consumer_handle, cleanup_handle);
    if let Err(e) = http_handle.await {
        error!(error = %e, "http server task panicked");
    }

    shutdown::finalize(&db).await;
    info!("mempool detector stopped");
    Ok(())
}
