//! RPC provider pool (spec §4.1).
//!
//! A "provider" is allocated fresh per call by uniformly sampling the
//! configured HTTP URL list — cheap and stateless, so there is no shared
//! client to contend on. Each call is wrapped in a hard timeout and retried
//! on timeout-class errors only, with `500·2^(n-1)` ms exponential backoff.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use anyhow::{anyhow, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Hard per-call timeout for ordinary RPC calls.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Extended timeout for pool-lookup calls (spec §4.2 `getPools`).
pub const POOL_LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

const MAX_RETRIES: u32 = 3;

/// Load-balanced, timeout/retry-wrapped JSON-RPC access.
#[derive(Clone)]
pub struct RpcPool {
    http_urls: Vec<String>,
}

impl RpcPool {
    pub fn new(http_urls: Vec<String>) -> Result<Self> {
        if http_urls.is_empty() {
            return Err(anyhow!("RPC pool requires at least one HTTP_RPC_URL"));
        }
        Ok(Self { http_urls })
    }

    /// Sample one HTTP URL uniformly at random.
    fn sample_url(&self) -> &str {
        if self.http_urls.len() == 1 {
            return &self.http_urls[0];
        }
        let idx = rand::thread_rng().gen_range(0..self.http_urls.len());
        &self.http_urls[idx]
    }

    /// Build a fresh provider against a randomly sampled URL. ENS resolution
    /// is disabled (`staticNetwork` equivalent — no chain-id-probing network
    /// detection on every call).
    fn provider(&self, url: &str) -> Result<RootProvider> {
        let url = url.parse().map_err(|e| anyhow!("invalid RPC URL {url}: {e}"))?;
        Ok(ProviderBuilder::new().connect_http(url))
    }

    /// Run `f` against a freshly sampled provider, with the §4.1 timeout and
    /// retry policy. `f` is invoked once per attempt; timeout-class failures
    /// are retried, everything else fails fast.
    pub async fn call<T, F, Fut>(&self, timeout: Duration, f: F) -> Result<T>
    where
        F: Fn(RootProvider) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let url = self.sample_url().to_string();
            let provider = self.provider(&url)?;

            match tokio::time::timeout(timeout, f(provider)).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    // Non-timeout errors fail fast (spec §7 TransientRpcError
                    // is specifically timeout/connection-reset class).
                    return Err(e);
                }
                Err(_elapsed) => {
                    if attempt >= MAX_RETRIES {
                        warn!(attempts = attempt, "RPC call timed out, retries exhausted");
                        return Err(anyhow!("RPC call timed out after {attempt} attempts"));
                    }
                    let backoff_ms = 500u64 * 2u64.pow(attempt - 1);
                    debug!(attempt, backoff_ms, "RPC call timed out, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    pub async fn block_number(&self) -> Result<u64> {
        self.call(CALL_TIMEOUT, |p| async move { Ok(p.get_block_number().await?) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_url_list() {
        assert!(RpcPool::new(vec![]).is_err());
    }

    #[test]
    fn backoff_sequence_matches_spec_formula() {
        // 500 * 2^(n-1) for n = 1, 2, 3
        let seq: Vec<u64> = (1..=3u32).map(|n| 500u64 * 2u64.pow(n - 1)).collect();
        assert_eq!(seq, vec![500, 1000, 2000]);
    }

    #[test]
    fn single_url_is_always_sampled() {
        let pool = RpcPool::new(vec!["http://localhost:8545".to_string()]).unwrap();
        assert_eq!(pool.sample_url(), "http://localhost:8545");
    }
}
