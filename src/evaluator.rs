//! Opportunity evaluator (spec §4.5): turns a decoded swap plus its router
//! into a [`Verdict`] by resolving tokens/pool, gating on liquidity, pricing
//! the trade's impact, and judging expected profit against the user's own
//! slippage floor.
//!
//! Grounded in the teacher's `arbitrage::detector` orchestration — staged
//! early returns, one `tracing` line per stage, no panics on absent state.

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use crate::addressing::RouterRegistry;
use crate::cache::{FactoryCache, PoolCache, TokenCache};
use crate::pool_state::{v2 as pool_v2, v3 as pool_v3};
use crate::rpc::RpcPool;
use crate::types::{parse_amount, DecodedSwap, RouterFamily, Verdict};

/// Minimum price impact for a trade to be worth flagging (spec §4.5 step 9).
const MIN_PRICE_IMPACT: f64 = 0.005;

#[derive(Clone)]
pub struct Evaluator {
    pub token_cache: TokenCache,
    pub factory_cache: FactoryCache,
    pub pool_cache: PoolCache,
    pub rpc: RpcPool,
    pub router_registry: RouterRegistry,
    pub v3_quoter: Address,
}

impl Evaluator {
    /// `now` is the evaluation-time unix timestamp, passed in rather than
    /// read from the clock so the deadline math stays deterministic in tests.
    pub async fn detect(
        &self,
        tx_hash: &str,
        chain_id: i64,
        swap: &DecodedSwap,
        router: &str,
        now: i64,
    ) -> Result<Verdict> {
        debug!(tx_hash, router, method = %swap.method, "evaluating swap");

        // Step 1 — token metadata, in parallel; either missing fails the tx.
        let (token_in, token_out) = tokio::join!(
            self.token_cache.get_token(chain_id, &swap.token_in),
            self.token_cache.get_token(chain_id, &swap.token_out),
        );
        let token_in = token_in.map_err(|e| anyhow!("token_in metadata unresolvable: {e}"))?;
        let token_out = token_out.map_err(|e| anyhow!("token_out metadata unresolvable: {e}"))?;

        // Step 2 — router resolution/substitution, then factory lookup.
        let resolved_router = self
            .router_registry
            .resolve_for_pool_lookup(router, swap.router_family);
        let factory = self
            .factory_cache
            .get_factory(chain_id, &resolved_router, swap.router_family)
            .await?;

        // Step 3 — pool lookup.
        let fee = if swap.router_family == RouterFamily::V3 {
            Some(swap.fee.clone())
        } else {
            None
        };
        let pool = self
            .pool_cache
            .get_pool(
                chain_id,
                &token_in.token_address,
                &token_out.token_address,
                &factory.factory_address,
                swap.router_family,
                fee,
            )
            .await?;
        let Some(pool) = pool else {
            return Ok(not_an_opportunity("Pool not found", &token_in, &token_out, swap, now));
        };

        // Step 4 — effective input amount.
        let amount_in = parse_amount(&swap.amount_in);
        let amount_in_max = parse_amount(&swap.amount_in_max);
        let amount_in_effective = if amount_in.is_zero() && !amount_in_max.is_zero() {
            amount_in_max
        } else {
            amount_in
        };

        let pool_address: Address = pool
            .pool_address
            .parse()
            .map_err(|_| anyhow!("stored pool address is not valid hex: {}", pool.pool_address))?;
        let token_in_addr: Address = token_in
            .token_address
            .parse()
            .map_err(|_| anyhow!("token_in address is not valid hex"))?;
        let token_out_addr: Address = token_out
            .token_address
            .parse()
            .map_err(|_| anyhow!("token_out address is not valid hex"))?;

        // Steps 5-6 — liquidity admissibility then price impact, per family.
        let (amount_out, price_impact) = match swap.router_family {
            RouterFamily::V2 => {
                match pool_v2::read_reserves(&self.rpc, pool_address).await {
                    Ok(reserves) => {
                        let reserve_in = reserves.reserve_in(token_in_addr);
                        if let Some(reason) = pool_v2::check_liquidity(reserve_in, amount_in_effective) {
                            return Ok(not_an_opportunity(reason, &token_in, &token_out, swap, now));
                        }
                        let reserve_out = reserves.reserve_out(token_in_addr);
                        let impact = pool_v2::compute_impact(
                            reserve_in,
                            reserve_out,
                            amount_in_effective,
                            token_in.decimals,
                            token_out.decimals,
                        );
                        (impact.amount_out, impact.price_impact)
                    }
                    Err(e) => {
                        warn!(error = %e, pool = %pool.pool_address, "V2 reserve read failed, proceeding without a liquidity veto");
                        (U256::ZERO, 0.0)
                    }
                }
            }
            RouterFamily::V3 => {
                match pool_v3::read_state(&self.rpc, pool_address).await {
                    Ok(state) => {
                        if let Some(reason) = pool_v3::check_liquidity(state.liquidity) {
                            return Ok(not_an_opportunity(reason, &token_in, &token_out, swap, now));
                        }
                        match pool_v3::compute_impact(
                            &self.rpc,
                            self.v3_quoter,
                            &state,
                            token_in_addr,
                            token_out_addr,
                            amount_in_effective,
                            token_in.decimals,
                            token_out.decimals,
                        )
                        .await
                        {
                            Ok(impact) => (impact.amount_out, impact.price_impact),
                            Err(e) => {
                                warn!(error = %e, pool = %pool.pool_address, "quoter reverted, proceeding without a liquidity veto");
                                (U256::ZERO, 0.0)
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, pool = %pool.pool_address, "V3 state read failed, proceeding without a liquidity veto");
                        (U256::ZERO, 0.0)
                    }
                }
            }
        };

        // Step 7 — profit: the trade's actual projected output against the
        // user's own declared minimum. Equal is zero profit, not an error;
        // negative means this isn't an opportunity at all.
        let amount_out_min = parse_amount(&swap.amount_out_min);
        let profit = if amount_out > amount_out_min {
            amount_out - amount_out_min
        } else {
            U256::ZERO
        };
        let expected_profit_is_positive = amount_out > amount_out_min;

        // Step 8 — deadline.
        let deadline_timestamp: i64 = swap.deadline.parse().unwrap_or(0);
        let (is_expired, time_to_submit_seconds) = if deadline_timestamp > now {
            (false, (deadline_timestamp - now) as u64)
        } else {
            (true, 0)
        };

        // Step 9 — verdict.
        let is_opportunity = expected_profit_is_positive && price_impact >= MIN_PRICE_IMPACT;

        if is_opportunity {
            info!(
                tx_hash,
                pool = %pool.pool_address,
                price_impact,
                "opportunity detected"
            );
        }

        Ok(Verdict {
            is_opportunity,
            expected_profit_formatted: Some(crate::pool_state::to_decimal_f64(profit, token_out.decimals).to_string()),
            price_impact: Some(price_impact),
            pool_address: Some(pool.pool_address),
            decimals_in: token_in.decimals,
            decimals_out: token_out.decimals,
            reason: if is_opportunity {
                "Opportunity detected".to_string()
            } else {
                "Below profitability threshold".to_string()
            },
            time_to_submit_seconds,
            deadline_timestamp,
            is_expired,
        })
    }
}

fn not_an_opportunity(
    reason: &str,
    token_in: &crate::types::TokenRecord,
    token_out: &crate::types::TokenRecord,
    swap: &DecodedSwap,
    now: i64,
) -> Verdict {
    let deadline_timestamp: i64 = swap.deadline.parse().unwrap_or(0);
    let (is_expired, time_to_submit_seconds) = if deadline_timestamp > now {
        (false, (deadline_timestamp - now) as u64)
    } else {
        (true, 0)
    };
    Verdict {
        is_opportunity: false,
        expected_profit_formatted: None,
        price_impact: None,
        pool_address: None,
        decimals_in: token_in.decimals,
        decimals_out: token_out.decimals,
        reason: reason.to_string(),
        time_to_submit_seconds,
        deadline_timestamp,
        is_expired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_in_the_future_is_not_expired() {
        let now = 1_000i64;
        let deadline = 1_500i64;
        assert!(deadline > now);
    }

    #[test]
    fn min_price_impact_threshold_matches_spec() {
        assert_eq!(MIN_PRICE_IMPACT, 0.005);
    }
}
