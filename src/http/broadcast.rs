//! Opportunity broadcast sink (spec §1 Non-goals: no browser-facing WS
//! server). Downstream consumers that need push delivery implement this
//! trait; the detector itself only ships a log-only implementation.

use async_trait::async_trait;

use crate::types::Opportunity;

#[async_trait]
pub trait BroadcastSink: Send + Sync {
    async fn broadcast(&self, opportunity: &Opportunity);
}

/// Default sink: logs at INFO. Sufficient for the detector's own scope;
/// a real-time push layer is out of scope (spec §1).
pub struct LoggingBroadcastSink;

#[async_trait]
impl BroadcastSink for LoggingBroadcastSink {
    async fn broadcast(&self, opportunity: &Opportunity) {
        tracing::info!(
            tx_hash = %opportunity.tx_hash,
            chain_id = opportunity.chain_id,
            status = %opportunity.status,
            "opportunity broadcast"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecodedSwap, OpportunityMetadata, OpportunityStatus, RouterFamily};

    fn sample_opportunity() -> Opportunity {
        Opportunity {
            chain_id: 1,
            tx_hash: "0xabc".to_string(),
            router: "0xrouter".to_string(),
            router_family: RouterFamily::V2,
            token_in: "0xin".to_string(),
            token_out: "0xout".to_string(),
            amount_in: "1000".to_string(),
            amount_out: "2000".to_string(),
            fee: "0".to_string(),
            pool_address: "0xpool".to_string(),
            method: "swapExactTokensForTokens".to_string(),
            recipient: "0xrecipient".to_string(),
            deadline: "0".to_string(),
            block_number: None,
            status: OpportunityStatus::Detected,
            detected_at: chrono::Utc::now(),
            processed_at: None,
            metadata: OpportunityMetadata {
                decimals_in: 18,
                decimals_out: 18,
                decoded_swap: DecodedSwap {
                    router: "0xrouter".to_string(),
                    method: "swapExactTokensForTokens".to_string(),
                    router_family: RouterFamily::V2,
                    token_in: "0xin".to_string(),
                    token_out: "0xout".to_string(),
                    amount_in: "1000".to_string(),
                    amount_out: "2000".to_string(),
                    amount_out_min: "1900".to_string(),
                    amount_in_max: "".to_string(),
                    fee: "0".to_string(),
                    recipient: "0xrecipient".to_string(),
                    deadline: "0".to_string(),
                    payer_is_user: true,
                },
                expected_profit_formatted: Some("100".to_string()),
                price_impact: Some(0.01),
                reason: "ok".to_string(),
                time_to_submit_seconds: 0,
                deadline_timestamp: 0,
                is_expired: false,
            },
        }
    }

    #[tokio::test]
    async fn logging_sink_does_not_panic() {
        let sink = LoggingBroadcastSink;
        sink.broadcast(&sample_opportunity()).await;
    }
}
