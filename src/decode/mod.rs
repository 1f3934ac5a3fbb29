//! Pure calldata decoders (spec §4.3): V2 AMM router, V3 concentrated-
//! liquidity router, and the Universal Router's command-stream interpreter.
//! None of these touch the network — they only turn raw `bytes` into
//! [`crate::types::DecodedSwap`].

pub mod universal;
pub mod v2;
pub mod v3;

use alloy::primitives::Address;

use crate::addressing::to_lower;

/// Shared packed-path helper for the Universal Router's V3 sub-actions
/// (`token(20) | fee(3) | token(20) | ...`), returning lowercase-hex ends
/// and the *last* fee observed (the hop adjacent to `token_out`).
pub(crate) fn v3_path_ends(path: &[u8]) -> (String, String, u32) {
    if path.len() < 43 {
        return (String::new(), String::new(), 0);
    }
    let token_in = Address::from_slice(&path[0..20]);
    let token_out = Address::from_slice(&path[path.len() - 20..]);

    let mut fee = 0u32;
    let mut offset = 20;
    while offset + 23 <= path.len() {
        fee = u32::from(path[offset]) << 16 | u32::from(path[offset + 1]) << 8 | u32::from(path[offset + 2]);
        offset += 23;
    }

    (to_lower(token_in), to_lower(token_out), fee)
}

/// Dispatch calldata to the right decoder family based on the router's
/// family as resolved by the allow-list (spec §4.5 step 2). The universal
/// router can emit more than one sub-action; the other two always emit at
/// most one. `tx_value` is the outer transaction's `value`, needed by the V2
/// ETH-in methods.
pub fn decode_for_family(
    router: &str,
    family: crate::types::RouterFamily,
    is_universal: bool,
    input: &[u8],
    tx_value: alloy::primitives::U256,
) -> Vec<crate::types::DecodedSwap> {
    if is_universal {
        return universal::decode(router, input);
    }
    match family {
        crate::types::RouterFamily::V2 => v2::decode(router, input, tx_value).into_iter().collect(),
        crate::types::RouterFamily::V3 => v3::decode(router, input).into_iter().collect(),
    }
}
