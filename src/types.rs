//! Core data structures shared across the detection pipeline.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Router family — dictates which pool/impact engine applies downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterFamily {
    V2,
    V3,
}

impl fmt::Display for RouterFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouterFamily::V2 => write!(f, "v2"),
            RouterFamily::V3 => write!(f, "v3"),
        }
    }
}

/// Unified intermediate record produced by all three decoders (spec §3, §4.3).
///
/// Addresses are always lowercase. 256-bit amounts are carried as decimal
/// strings for bus/DB round-trip stability (spec §9 "BigInt on the wire").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSwap {
    pub router: String,
    pub method: String,
    pub router_family: RouterFamily,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub amount_out: String,
    pub amount_out_min: String,
    pub amount_in_max: String,
    pub fee: String,
    pub recipient: String,
    pub deadline: String,
    pub payer_is_user: bool,
}

/// Parse a decimal-string amount field into a `U256`, defaulting to zero on
/// an empty string (the common "not applicable for this method" case).
pub fn parse_amount(s: &str) -> U256 {
    if s.is_empty() {
        U256::ZERO
    } else {
        U256::from_str(s).unwrap_or(U256::ZERO)
    }
}

pub fn format_amount(v: U256) -> String {
    v.to_string()
}

pub fn lower(addr: Address) -> String {
    format!("{addr:#x}")
}

/// `(chainId, poolAddress)`-unique cached pool metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    pub chain_id: i64,
    pub pool_address: String,
    pub token0: String,
    pub token1: String,
    pub exists: bool,
    pub router_family: RouterFamily,
    pub fee: String,
}

/// `(chainId, tokenAddress)`-unique cached ERC-20 metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub chain_id: i64,
    pub token_address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: i16,
}

/// `(chainId, router)`-unique cached factory binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryRecord {
    pub chain_id: i64,
    pub router: String,
    pub factory_address: String,
    pub wrapped_native_address: String,
    pub router_family: RouterFamily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    Pending,
    Detected,
    Expired,
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpportunityStatus::Pending => write!(f, "pending"),
            OpportunityStatus::Detected => write!(f, "detected"),
            OpportunityStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for OpportunityStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OpportunityStatus::Pending),
            "detected" => Ok(OpportunityStatus::Detected),
            "expired" => Ok(OpportunityStatus::Expired),
            other => anyhow::bail!("unknown opportunity status: {other}"),
        }
    }
}

/// Free-form metadata bag persisted alongside an `Opportunity` row (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityMetadata {
    pub decimals_in: i16,
    pub decimals_out: i16,
    pub decoded_swap: DecodedSwap,
    pub expected_profit_formatted: Option<String>,
    pub price_impact: Option<f64>,
    pub reason: String,
    pub time_to_submit_seconds: u64,
    pub deadline_timestamp: i64,
    pub is_expired: bool,
}

/// `(chainId, txHash)`-unique persisted verdict (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub chain_id: i64,
    pub tx_hash: String,
    pub router: String,
    pub router_family: RouterFamily,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub amount_out: String,
    pub fee: String,
    pub pool_address: String,
    pub method: String,
    pub recipient: String,
    pub deadline: String,
    pub block_number: Option<i64>,
    pub status: OpportunityStatus,
    pub detected_at: chrono::DateTime<chrono::Utc>,
    pub processed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub metadata: OpportunityMetadata,
}

/// Bus envelope wrapping a `DecodedSwap` for the `transactions` topic (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTxSummary {
    pub hash: String,
    pub to: Option<String>,
    pub from: String,
    pub value: String,
    pub data: String,
    pub gas_price: String,
    pub gas_limit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub tx_hash: String,
    pub block_number: Option<i64>,
    pub decoded_tx: DecodedSwap,
    pub router_address: String,
    pub timestamp: i64,
    pub raw_tx: Option<RawTxSummary>,
}

/// Verdict returned by the opportunity evaluator (spec §4.5).
#[derive(Debug, Clone)]
pub struct Verdict {
    pub is_opportunity: bool,
    pub expected_profit_formatted: Option<String>,
    pub price_impact: Option<f64>,
    pub pool_address: Option<String>,
    pub decimals_in: i16,
    pub decimals_out: i16,
    pub reason: String,
    pub time_to_submit_seconds: u64,
    pub deadline_timestamp: i64,
    pub is_expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_amount_empty_is_zero() {
        assert_eq!(parse_amount(""), U256::ZERO);
    }

    #[test]
    fn parse_amount_round_trips() {
        let v = U256::from(123_456_789_u64);
        let s = format_amount(v);
        assert_eq!(parse_amount(&s), v);
    }

    #[test]
    fn lower_formats_checksummed_address_as_lowercase_hex() {
        let addr = Address::from_str("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174").unwrap();
        assert_eq!(lower(addr), "0x2791bca1f2de4661ed88a30c99a7a9449aa84174");
    }

    #[test]
    fn router_family_display_matches_wire_tags() {
        assert_eq!(RouterFamily::V2.to_string(), "v2");
        assert_eq!(RouterFamily::V3.to_string(), "v3");
    }

    #[test]
    fn opportunity_status_round_trips_through_str() {
        for s in ["pending", "detected", "expired"] {
            let parsed: OpportunityStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }
}
