//! Process-wide Kafka producer (spec §5): "the bus producer is a
//! process-wide singleton, lazily initialized." Constructed once from
//! `main`, closed once on shutdown.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::debug;

use crate::types::TransactionEnvelope;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

static PRODUCER: OnceCell<FutureProducer> = OnceCell::new();

pub fn init(brokers: &str, client_id: &str) -> Result<()> {
    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("client.id", client_id)
        .set("message.timeout.ms", "5000")
        .create()
        .context("failed to create Kafka producer")?;
    PRODUCER
        .set(producer)
        .map_err(|_| anyhow::anyhow!("bus producer already initialized"))?;
    Ok(())
}

fn producer() -> Result<&'static FutureProducer> {
    PRODUCER.get().ok_or_else(|| anyhow::anyhow!("bus producer not initialized"))
}

/// Publish one decoded swap's envelope, keyed by `txHash` (spec §4.6 step 5,
/// §6 bus topic shape). Universal-router sub-actions share the same key so
/// the consumer sees them in command order within a partition.
pub async fn publish_transaction_envelope(topic: &str, envelope: &TransactionEnvelope) -> Result<()> {
    let payload = serde_json::to_vec(envelope).context("serialize transaction envelope")?;
    let record = FutureRecord::to(topic)
        .payload(&payload)
        .key(&envelope.tx_hash);

    producer()?
        .send(record, Timeout::After(SEND_TIMEOUT))
        .await
        .map_err(|(e, _)| anyhow::anyhow!("kafka send failed: {e}"))?;

    debug!(topic, tx_hash = %envelope.tx_hash, "published transaction envelope");
    Ok(())
}

/// Part of the §5 shutdown sequence: flush in-flight deliveries, best-effort.
pub fn close() {
    if let Some(p) = PRODUCER.get() {
        p.flush(Duration::from_secs(5)).ok();
    }
}
