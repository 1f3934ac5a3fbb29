//! Bus consumer and opportunity writer (spec §4.7).
//!
//! Subscribes with `auto.offset.reset = "latest"` (the `fromBeginning =
//! false` of the spec). A single malformed or failing message is logged and
//! skipped — never crashes the consumer (spec §7 propagation policy).

use anyhow::{Context, Result};
use chrono::Utc;
use futures::StreamExt;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use tracing::{debug, error, info, warn};

use crate::db::Database;
use crate::evaluator::Evaluator;
use crate::rpc::RpcPool;
use crate::types::{Opportunity, OpportunityMetadata, OpportunityStatus, TransactionEnvelope};

/// Drop messages older than this (spec §4.7 step 2).
const AGE_GATE_SECONDS: i64 = 10 * 60;

pub struct BusConsumer {
    consumer: StreamConsumer,
    db: Database,
    evaluator: Evaluator,
    rpc: RpcPool,
    chain_id: i64,
}

impl BusConsumer {
    pub fn new(
        brokers: &str,
        group_id: &str,
        topic: &str,
        db: Database,
        evaluator: Evaluator,
        rpc: RpcPool,
        chain_id: i64,
    ) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .create()
            .context("failed to create Kafka consumer")?;
        consumer
            .subscribe(&[topic])
            .context("failed to subscribe to the transactions topic")?;
        Ok(Self { consumer, db, evaluator, rpc, chain_id })
    }

    /// Runs until the stream ends or `shutdown` flips true (spec §5
    /// cancellation — in-flight messages complete best-effort).
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut stream = self.consumer.stream();
        let mut processed = 0u64;
        let mut dropped = 0u64;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(processed, dropped, "bus consumer shutting down");
                        break;
                    }
                }
                maybe_msg = stream.next() => {
                    match maybe_msg {
                        Some(Ok(msg)) => {
                            let broker_timestamp_ms = msg.timestamp().to_millis();
                            if let Some(payload) = msg.payload() {
                                match self.handle_payload(payload, broker_timestamp_ms).await {
                                    Ok(true) => processed += 1,
                                    Ok(false) => dropped += 1,
                                    Err(e) => {
                                        warn!(error = %e, "failed to process bus message, skipping");
                                        dropped += 1;
                                    }
                                }
                            }
                        }
                        Some(Err(e)) => warn!(error = %e, "bus consumer stream error"),
                        None => {
                            warn!("bus consumer stream ended");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Returns `Ok(true)` if an opportunity was persisted, `Ok(false)` if the
    /// message was legitimately dropped (age/already-mined/not-an-opportunity).
    async fn handle_payload(&self, payload: &[u8], broker_timestamp_ms: Option<i64>) -> Result<bool> {
        let envelope: TransactionEnvelope =
            serde_json::from_slice(payload).context("malformed transaction envelope")?;

        let now = Utc::now().timestamp();
        let event_timestamp = if envelope.timestamp > 0 {
            envelope.timestamp / 1000
        } else {
            broker_timestamp_ms.map(|ms| ms / 1000).unwrap_or(now)
        };
        if now - event_timestamp > AGE_GATE_SECONDS {
            debug!(tx_hash = %envelope.tx_hash, "dropping stale bus message");
            return Ok(false);
        }

        if envelope.block_number.is_some() {
            debug!(tx_hash = %envelope.tx_hash, "dropping already-mined transaction");
            return Ok(false);
        }

        let (verdict, current_block) = tokio::join!(
            self.evaluator.detect(
                &envelope.tx_hash,
                self.chain_id,
                &envelope.decoded_tx,
                &envelope.router_address,
                now,
            ),
            self.rpc.block_number(),
        );
        let verdict = verdict.context("evaluator failed")?;

        if !verdict.is_opportunity {
            return Ok(false);
        }

        let opportunity = Opportunity {
            chain_id: self.chain_id,
            tx_hash: envelope.tx_hash.to_lowercase(),
            router: envelope.router_address.to_lowercase(),
            router_family: envelope.decoded_tx.router_family,
            token_in: envelope.decoded_tx.token_in.to_lowercase(),
            token_out: envelope.decoded_tx.token_out.to_lowercase(),
            amount_in: envelope.decoded_tx.amount_in.clone(),
            amount_out: envelope.decoded_tx.amount_out.clone(),
            fee: envelope.decoded_tx.fee.clone(),
            pool_address: verdict.pool_address.clone().unwrap_or_default(),
            method: envelope.decoded_tx.method.clone(),
            recipient: envelope.decoded_tx.recipient.to_lowercase(),
            deadline: envelope.decoded_tx.deadline.clone(),
            block_number: current_block.ok().map(|b| b as i64),
            status: if verdict.is_expired {
                OpportunityStatus::Expired
            } else {
                OpportunityStatus::Detected
            },
            detected_at: Utc::now(),
            processed_at: None,
            metadata: OpportunityMetadata {
                decimals_in: verdict.decimals_in,
                decimals_out: verdict.decimals_out,
                decoded_swap: envelope.decoded_tx.clone(),
                expected_profit_formatted: verdict.expected_profit_formatted.clone(),
                price_impact: verdict.price_impact,
                reason: verdict.reason.clone(),
                time_to_submit_seconds: verdict.time_to_submit_seconds,
                deadline_timestamp: verdict.deadline_timestamp,
                is_expired: verdict.is_expired,
            },
        };

        match self.db.upsert_opportunity(&opportunity).await {
            Ok(()) => {
                info!(tx_hash = %envelope.tx_hash, status = %opportunity.status, "opportunity persisted");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, tx_hash = %envelope.tx_hash, "failed to persist opportunity");
                Ok(false)
            }
        }
    }
}
