//! V3 pool state and quoter-based price impact (spec §4.4).
//!
//! Diverges from the teacher's `V3PoolState::price_from_tick`, which sources
//! mid-price from `1.0001^tick` to sidestep squaring a 160-bit integer in
//! `f64`. The required formula here is `sqrtPriceX96²/2^192` directly; the
//! overflow is avoided by normalizing to a ratio before squaring rather than
//! squaring the raw integer.

use alloy::primitives::{Address, U256};
use alloy::primitives::aliases::U160;
use anyhow::{anyhow, Result};
use tracing::warn;

use crate::contracts::IQuoterV2::{self, QuoteExactInputSingleParams};
use crate::contracts::IUniswapV3Pool;
use crate::rpc::{RpcPool, CALL_TIMEOUT};

use super::to_decimal_f64;

const TWO_POW_96: f64 = 79_228_162_514_264_337_593_543_950_336.0; // 2^96

#[derive(Debug, Clone)]
pub struct V3State {
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub sqrt_price_x96: U160,
    pub liquidity: u128,
}

pub async fn read_state(rpc: &RpcPool, pool_address: Address) -> Result<V3State> {
    let for_slot0 = pool_address;
    let for_liquidity = pool_address;
    let for_fee = pool_address;
    let for_token0 = pool_address;
    let for_token1 = pool_address;

    let (slot0, liquidity, fee, token0, token1) = tokio::join!(
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV3Pool::new(for_slot0, p).slot0().call().await?)
        }),
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV3Pool::new(for_liquidity, p).liquidity().call().await?)
        }),
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV3Pool::new(for_fee, p).fee().call().await?)
        }),
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV3Pool::new(for_token0, p).token0().call().await?)
        }),
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV3Pool::new(for_token1, p).token1().call().await?)
        }),
    );

    let slot0 = slot0?;
    let liquidity = liquidity?;
    let fee = fee?;
    let token0 = token0?;
    let token1 = token1?;

    Ok(V3State {
        token0,
        token1,
        fee: u32::from(fee),
        sqrt_price_x96: slot0.sqrtPriceX96,
        liquidity,
    })
}

/// Liquidity admissibility (spec §4.5 step 5, V3 branch).
pub fn check_liquidity(liquidity: u128) -> Option<&'static str> {
    if liquidity == 0 {
        return Some("Zero liquidity in V3 pool");
    }
    if liquidity < 1_000_000_000_000u128 {
        return Some("Very low V3 liquidity");
    }
    None
}

/// `price1Over0 = sqrtPriceX96² / 2^192`, computed as `(sqrtPriceX96/2^96)²`
/// to keep every intermediate value inside `f64`'s safe range.
fn price1_over_0(sqrt_price_x96: U160) -> f64 {
    let raw: f64 = sqrt_price_x96.to_string().parse().unwrap_or(0.0);
    let ratio = raw / TWO_POW_96;
    ratio * ratio
}

/// Mid-price of `token_out` denominated in `token_in`, decimal-adjusted and
/// oriented by which side of the pool `token_in` sits on.
pub fn mid_price(
    state: &V3State,
    token_in: Address,
    decimals0: i16,
    decimals1: i16,
) -> f64 {
    let raw = price1_over_0(state.sqrt_price_x96);
    // raw = price of token0 in units of token1 (token1 per token0), adjusted
    // for decimals below; invert when token_in is token1 so the result is
    // always "amount of token_out per unit of token_in".
    let decimal_adjustment = 10f64.powi(decimals0 as i32) / 10f64.powi(decimals1 as i32);
    let price0_in_1 = raw * decimal_adjustment;
    if token_in == state.token0 {
        price0_in_1
    } else if price0_in_1 == 0.0 {
        0.0
    } else {
        1.0 / price0_in_1
    }
}

pub struct ImpactResult {
    pub amount_out: U256,
    pub price_impact: f64,
}

/// Quoter-based price impact (spec §4.4 "V3 price impact"). A quoter revert
/// surfaces as `Err` (spec §7 QuoterRevert) rather than a synthetic zero.
pub async fn compute_impact(
    rpc: &RpcPool,
    quoter_address: Address,
    state: &V3State,
    token_in: Address,
    token_out: Address,
    amount_in: U256,
    decimals_in: i16,
    decimals_out: i16,
) -> Result<ImpactResult> {
    if amount_in.is_zero() {
        return Ok(ImpactResult { amount_out: U256::ZERO, price_impact: 0.0 });
    }

    let mid = mid_price(state, token_in, decimals0_for(state, token_in, decimals_in, decimals_out), decimals1_for(state, token_in, decimals_in, decimals_out));
    let fee = state.fee;

    let amount_out = rpc
        .call(CALL_TIMEOUT, move |p| async move {
            let quoter = IQuoterV2::new(quoter_address, p);
            let params = QuoteExactInputSingleParams {
                tokenIn: token_in,
                tokenOut: token_out,
                amountIn: amount_in,
                fee,
                sqrtPriceLimitX96: U160::ZERO,
            };
            let result = quoter
                .quoteExactInputSingle(params)
                .call()
                .await
                .map_err(|e| anyhow!("quoter reverted: {e}"))?;
            Ok(result.amountOut)
        })
        .await?;

    let amount_in_dec = to_decimal_f64(amount_in, decimals_in);
    let amount_out_dec = to_decimal_f64(amount_out, decimals_out);
    if amount_in_dec == 0.0 {
        warn!("zero decimal-adjusted amountIn despite non-zero raw amount");
        return Ok(ImpactResult { amount_out, price_impact: 0.0 });
    }
    let quoted_price = amount_out_dec / amount_in_dec;
    let price_impact = if mid == 0.0 {
        0.0
    } else {
        (quoted_price - mid) / mid
    };

    Ok(ImpactResult { amount_out, price_impact })
}

fn decimals0_for(state: &V3State, token_in: Address, decimals_in: i16, decimals_out: i16) -> i16 {
    if token_in == state.token0 { decimals_in } else { decimals_out }
}

fn decimals1_for(state: &V3State, token_in: Address, decimals_in: i16, decimals_out: i16) -> i16 {
    if token_in == state.token0 { decimals_out } else { decimals_in }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn sample_state(sqrt_price_x96: u128) -> V3State {
        V3State {
            token0: address!("0000000000000000000000000000000000000001"),
            token1: address!("0000000000000000000000000000000000000002"),
            fee: 3000,
            sqrt_price_x96: U160::from(sqrt_price_x96),
            liquidity: 1_000_000_000_000_000u128,
        }
    }

    #[test]
    fn zero_liquidity_is_rejected() {
        assert_eq!(check_liquidity(0), Some("Zero liquidity in V3 pool"));
    }

    #[test]
    fn below_floor_liquidity_is_rejected() {
        assert_eq!(check_liquidity(999_999_999_999u128), Some("Very low V3 liquidity"));
    }

    #[test]
    fn at_floor_liquidity_passes() {
        assert_eq!(check_liquidity(1_000_000_000_000u128), None);
    }

    #[test]
    fn price_at_parity_sqrt_price_is_one() {
        // sqrtPriceX96 = 2^96 => price1Over0 = 1.0 (before decimal adjustment)
        let state = sample_state(TWO_POW_96 as u128);
        let price = mid_price(&state, state.token0, 18, 18);
        assert!((price - 1.0).abs() < 1e-9);
    }

    #[test]
    fn price_inverts_for_token1_in() {
        let state = sample_state((TWO_POW_96 * 2.0) as u128);
        let price_token0_in = mid_price(&state, state.token0, 18, 18);
        let price_token1_in = mid_price(&state, state.token1, 18, 18);
        assert!((price_token0_in * price_token1_in - 1.0).abs() < 1e-6);
    }
}
