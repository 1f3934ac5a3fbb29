//! Pool-state readers and price-impact engines (spec §4.4).

pub mod v2;
pub mod v3;

use alloy::primitives::U256;

/// Convert a 256-bit on-chain amount to a decimal-adjusted `f64` for impact
/// math. Precision loss beyond `f64`'s ~15 significant digits is accepted —
/// the spec calls for "decimal-adjusted floats", not arbitrary precision.
pub fn to_decimal_f64(amount: U256, decimals: i16) -> f64 {
    let raw: f64 = amount.to_string().parse().unwrap_or(0.0);
    raw / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_decimal_f64_adjusts_by_decimals() {
        let amount = U256::from(1_500_000u64);
        assert!((to_decimal_f64(amount, 6) - 1.5).abs() < 1e-9);
    }
}
