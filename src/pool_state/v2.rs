//! V2 pool state and constant-product price impact (spec §4.4).
//!
//! Grounded in the teacher's `PoolState::get_amount_out` (`x·y=k` with the
//! 997/1000 fee factor, kept in `U256` to avoid float precision loss on the
//! swap math itself — only the price-impact ratio uses floats, per spec).

use alloy::primitives::{Address, U256};
use anyhow::Result;
use tracing::warn;

use crate::contracts::IUniswapV2Pair;
use crate::rpc::{RpcPool, CALL_TIMEOUT};

use super::to_decimal_f64;

#[derive(Debug, Clone)]
pub struct V2Reserves {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

impl V2Reserves {
    pub fn k(&self) -> U256 {
        self.reserve0 * self.reserve1
    }

    /// Reserve on the `token_in` side of the pair, oriented by whichever
    /// token is `token0` (spec §9: preserve this orientation verbatim, even
    /// for the ETH-in synthetic path).
    pub fn reserve_in(&self, token_in: Address) -> U256 {
        if token_in == self.token0 {
            self.reserve0
        } else {
            self.reserve1
        }
    }

    pub fn reserve_out(&self, token_in: Address) -> U256 {
        if token_in == self.token0 {
            self.reserve1
        } else {
            self.reserve0
        }
    }
}

pub async fn read_reserves(rpc: &RpcPool, pool_address: Address) -> Result<V2Reserves> {
    let pair_for_reserves = pool_address;
    let pair_for_token0 = pool_address;
    let pair_for_token1 = pool_address;

    let (reserves, token0, token1) = tokio::join!(
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV2Pair::new(pair_for_reserves, p).getReserves().call().await?)
        }),
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV2Pair::new(pair_for_token0, p).token0().call().await?)
        }),
        rpc.call(CALL_TIMEOUT, move |p| async move {
            Ok(IUniswapV2Pair::new(pair_for_token1, p).token1().call().await?)
        }),
    );
    let reserves = reserves?;
    let token0 = token0?;
    let token1 = token1?;

    Ok(V2Reserves {
        token0,
        token1,
        reserve0: U256::from(reserves.reserve0),
        reserve1: U256::from(reserves.reserve1),
    })
}

pub struct ImpactResult {
    pub amount_out: U256,
    pub price_impact: f64,
}

/// Constant-product impact (spec §4.4 "V2 price impact"). `amount_in = 0`
/// yields `amount_out = 0`, `price_impact = 0` (spec §8 round-trip property).
pub fn compute_impact(
    reserve_in: U256,
    reserve_out: U256,
    amount_in: U256,
    decimals_in: i16,
    decimals_out: i16,
) -> ImpactResult {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return ImpactResult {
            amount_out: U256::ZERO,
            price_impact: 0.0,
        };
    }

    let amount_in_with_fee = amount_in * U256::from(997u64);
    let numerator = amount_in_with_fee * reserve_out;
    let denominator = reserve_in * U256::from(1000u64) + amount_in_with_fee;
    let amount_out = numerator / denominator;

    let reserve_in_dec = to_decimal_f64(reserve_in, decimals_in);
    let reserve_out_dec = to_decimal_f64(reserve_out, decimals_out);
    let amount_in_dec = to_decimal_f64(amount_in, decimals_in);
    let amount_out_dec = to_decimal_f64(amount_out, decimals_out);

    let price_before = reserve_out_dec / reserve_in_dec;
    let price_after = (reserve_out_dec - amount_out_dec) / (reserve_in_dec + amount_in_dec);
    let price_impact = if price_before == 0.0 {
        0.0
    } else {
        ((price_before - price_after) / price_before).abs()
    };

    ImpactResult { amount_out, price_impact }
}

/// Liquidity admissibility (spec §4.5 step 5, V2 branch). `None` means the
/// trade is admissible; `Some(reason)` names the rejection reason.
pub fn check_liquidity(reserve_in: U256, amount_in_effective: U256) -> Option<&'static str> {
    if amount_in_effective.is_zero() {
        return None;
    }
    if reserve_in.is_zero() {
        warn!("zero reserve on liquidity check");
        return None;
    }
    if amount_in_effective > reserve_in / U256::from(2u64) {
        return Some("Insufficient liquidity: trade > 50% of reserve");
    }
    if reserve_in < amount_in_effective * U256::from(10u64) {
        return Some("Low liquidity: reserve < 10x trade");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amount_in_yields_zero_impact() {
        let result = compute_impact(U256::from(1000u64), U256::from(2000u64), U256::ZERO, 18, 18);
        assert_eq!(result.amount_out, U256::ZERO);
        assert_eq!(result.price_impact, 0.0);
    }

    #[test]
    fn exactly_half_reserve_is_rejected() {
        let reserve_in = U256::from(1000u64);
        let amount_in = U256::from(500u64); // exactly 0.5 * reserveIn
        // The >50% gate uses strict `>`, so exactly half passes it through;
        // the trade is still rejected, just by the 10x-reserve gate instead
        // (1000 < 10*500). Spec §8's boundary is satisfied either way.
        assert_eq!(
            check_liquidity(reserve_in, amount_in),
            Some("Low liquidity: reserve < 10x trade")
        );
    }

    #[test]
    fn just_under_half_reserve_passes_liquidity_gate() {
        let reserve_in = U256::from(1000u64);
        let amount_in = U256::from(499u64);
        // Passes the >50% gate but still fails the 10x-reserve gate here
        // since 1000 < 10*499; assert the correct *specific* rejection.
        assert_eq!(
            check_liquidity(reserve_in, amount_in),
            Some("Low liquidity: reserve < 10x trade")
        );
    }

    #[test]
    fn healthy_trade_passes_both_gates() {
        let reserve_in = U256::from(1000u64);
        let amount_in = U256::from(10u64);
        assert_eq!(check_liquidity(reserve_in, amount_in), None);
    }

    #[test]
    fn realistic_swap_matches_expected_magnitude() {
        // reserve0 = 1000 WETH (18 dec), reserve1 = 2_000_000 USDC (6 dec)
        let reserve_in = U256::from(1000u64) * U256::from(10u64).pow(U256::from(18u64));
        let reserve_out = U256::from(2_000_000u64) * U256::from(10u64).pow(U256::from(6u64));
        let amount_in = U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64));

        let result = compute_impact(reserve_in, reserve_out, amount_in, 18, 6);
        assert!(result.price_impact > 0.0 && result.price_impact < 0.02);
    }
}
