//! Configuration management (spec §6).
//!
//! Load settings from the environment, following the teacher's
//! `config.rs` pattern: `dotenv::dotenv().ok()` then manual
//! `std::env::var(...).context(...)` parsing, no config-file layer.

use anyhow::{Context, Result};

use crate::addressing::RouterAllowList;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_rpc_urls: Vec<String>,
    pub wss_rpc_url: String,
    pub chain_id: i64,
    pub database_url: String,

    pub universal_router_allow_list: Vec<String>,
    pub v2_router_allow_list: Vec<String>,
    pub v3_router_allow_list: Vec<String>,
    pub canonical_v2_router: Option<String>,
    pub canonical_v3_router: Option<String>,
    pub v3_quoter_address: String,

    pub kafka_brokers: String,
    pub kafka_client_id: String,
    pub kafka_group_id: String,
    pub kafka_transactions_topic: String,
    pub kafka_opportunities_topic: String,

    pub http_listen_addr: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let http_rpc_urls: Vec<String> = env_var("HTTP_RPC_URL")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if http_rpc_urls.is_empty() {
            anyhow::bail!("HTTP_RPC_URL must contain at least one URL");
        }

        let universal_router_allow_list = env_list("UNIVERSAL_ROUTER")?;
        let v2_router_allow_list = env_list_optional("V2_ROUTER");
        let v3_router_allow_list = env_list_optional("V3_ROUTER");

        Ok(Self {
            http_rpc_urls,
            wss_rpc_url: env_var("WSS_RPC_URL")?,
            chain_id: env_var("CHAIN_ID")?.parse().context("CHAIN_ID must be an integer")?,
            database_url: env_var("DATABASE_URL")?,

            universal_router_allow_list,
            v2_router_allow_list,
            v3_router_allow_list,
            canonical_v2_router: std::env::var("CANONICAL_V2_ROUTER").ok(),
            canonical_v3_router: std::env::var("CANONICAL_V3_ROUTER").ok(),
            v3_quoter_address: env_var("V3_QUOTER_ADDRESS")?,

            kafka_brokers: env_var("KAFKA_BROKERS")?,
            kafka_client_id: env_var("KAFKA_CLIENT_ID")?,
            kafka_group_id: env_var("KAFKA_GROUP_ID")?,
            kafka_transactions_topic: env_var("KAFKA_TRANSACTIONS_TOPIC")?,
            kafka_opportunities_topic: env_var("KAFKA_OPPORTUNITIES_TOPIC")?,

            http_listen_addr: std::env::var("HTTP_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        })
    }

    pub fn universal_allow_list(&self) -> RouterAllowList {
        RouterAllowList::new(&self.universal_router_allow_list)
    }

    pub fn v2_allow_list(&self) -> RouterAllowList {
        RouterAllowList::new(&self.v2_router_allow_list)
    }

    pub fn v3_allow_list(&self) -> RouterAllowList {
        RouterAllowList::new(&self.v3_router_allow_list)
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} not set"))
}

fn env_list(name: &str) -> Result<Vec<String>> {
    Ok(env_var(name)?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn env_list_optional(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_list_optional_defaults_to_empty() {
        std::env::remove_var("NONEXISTENT_ROUTER_LIST_VAR");
        assert!(env_list_optional("NONEXISTENT_ROUTER_LIST_VAR").is_empty());
    }
}
