//! Uniswap V3 SwapRouter calldata decoder (spec §4.3).
//!
//! `exactInput`/`exactOutput` carry a packed multi-hop path
//! (`token(20) | fee(3) | token(20) | fee(3) | ...`); this module decodes only
//! the first and last token plus the first fee, matching the teacher's
//! `decode_v3_path` helper in `mempool::decoder`.

use alloy::primitives::{Address, U256};
use alloy_sol_types::SolCall;
use tracing::trace;

use crate::addressing::to_lower;
use crate::contracts::IUniswapV3RouterSwaps::{
    exactInputCall, exactInputSingleCall, exactOutputCall, exactOutputSingleCall,
};
use crate::types::{format_amount, DecodedSwap, RouterFamily};

pub fn decode(router: &str, input: &[u8]) -> Option<DecodedSwap> {
    if input.len() < 4 {
        return None;
    }
    let selector: [u8; 4] = input[..4].try_into().ok()?;
    let router = router.to_lowercase();

    match selector {
        s if s == exactInputSingleCall::SELECTOR => {
            let call = exactInputSingleCall::abi_decode(input, true).ok()?;
            let p = call.params;
            Some(DecodedSwap {
                router,
                method: "exactInputSingle".to_string(),
                router_family: RouterFamily::V3,
                token_in: to_lower(p.tokenIn),
                token_out: to_lower(p.tokenOut),
                amount_in: format_amount(p.amountIn),
                amount_out: String::new(),
                amount_out_min: format_amount(p.amountOutMinimum),
                amount_in_max: String::new(),
                fee: p.fee.to_string(),
                recipient: to_lower(p.recipient),
                deadline: format_amount(p.deadline),
                payer_is_user: true,
            })
        }
        s if s == exactOutputSingleCall::SELECTOR => {
            let call = exactOutputSingleCall::abi_decode(input, true).ok()?;
            let p = call.params;
            Some(DecodedSwap {
                router,
                method: "exactOutputSingle".to_string(),
                router_family: RouterFamily::V3,
                token_in: to_lower(p.tokenIn),
                token_out: to_lower(p.tokenOut),
                amount_in: String::new(),
                amount_out: format_amount(p.amountOut),
                amount_out_min: String::new(),
                amount_in_max: format_amount(p.amountInMaximum),
                fee: p.fee.to_string(),
                recipient: to_lower(p.recipient),
                deadline: format_amount(p.deadline),
                payer_is_user: true,
            })
        }
        s if s == exactInputCall::SELECTOR => {
            let call = exactInputCall::abi_decode(input, true).ok()?;
            let p = call.params;
            let (token_in, token_out, fee) = decode_path(&p.path)?;
            Some(DecodedSwap {
                router,
                method: "exactInput".to_string(),
                router_family: RouterFamily::V3,
                token_in: to_lower(token_in),
                token_out: to_lower(token_out),
                amount_in: format_amount(p.amountIn),
                amount_out: String::new(),
                amount_out_min: format_amount(p.amountOutMinimum),
                amount_in_max: String::new(),
                fee: fee.to_string(),
                recipient: to_lower(p.recipient),
                deadline: format_amount(p.deadline),
                payer_is_user: true,
            })
        }
        s if s == exactOutputCall::SELECTOR => {
            let call = exactOutputCall::abi_decode(input, true).ok()?;
            let p = call.params;
            // exactOutput's path is reversed: first token is tokenOut, last is tokenIn.
            let (path_first, path_last, fee) = decode_path(&p.path)?;
            Some(DecodedSwap {
                router,
                method: "exactOutput".to_string(),
                router_family: RouterFamily::V3,
                token_in: to_lower(path_last),
                token_out: to_lower(path_first),
                amount_in: String::new(),
                amount_out: format_amount(p.amountOut),
                amount_out_min: String::new(),
                amount_in_max: format_amount(p.amountInMaximum),
                fee: fee.to_string(),
                recipient: to_lower(p.recipient),
                deadline: format_amount(p.deadline),
                payer_is_user: true,
            })
        }
        _ => {
            trace!(
                selector = %format!("0x{:02x}{:02x}{:02x}{:02x}", selector[0], selector[1], selector[2], selector[3]),
                "unrecognized V3 selector"
            );
            None
        }
    }
}

/// `token(20) | fee(3) | token(20) [| fee(3) | token(20) ...]`. The first
/// and last tokens and the *last* fee observed are returned — sufficient for
/// a single-hop-equivalent price-impact evaluation (spec §4.4), but the fee
/// must come from the final hop, not the first, for multi-hop paths.
fn decode_path(path: &[u8]) -> Option<(Address, Address, u32)> {
    if path.len() < 43 {
        return None;
    }
    let token_in = Address::from_slice(&path[0..20]);
    let token_out = Address::from_slice(&path[path.len() - 20..]);

    let mut fee = 0u32;
    let mut offset = 20;
    while offset + 23 <= path.len() {
        fee = u32::from(path[offset]) << 16 | u32::from(path[offset + 1]) << 8 | u32::from(path[offset + 2]);
        offset += 23;
    }

    Some((token_in, token_out, fee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IUniswapV3RouterSwaps::ExactInputSingleParams;
    use alloy::primitives::address;

    #[test]
    fn decodes_exact_input_single() {
        let call = exactInputSingleCall {
            params: ExactInputSingleParams {
                tokenIn: address!("0000000000000000000000000000000000000001"),
                tokenOut: address!("0000000000000000000000000000000000000002"),
                fee: 3000,
                recipient: address!("0000000000000000000000000000000000000003"),
                deadline: U256::from(1_893_456_000u64),
                amountIn: U256::from(500_000u64),
                amountOutMinimum: U256::from(1u64),
                sqrtPriceLimitX96: alloy::primitives::aliases::U160::ZERO,
            },
        };
        let data = call.abi_encode();
        let decoded = decode("0xrouter", &data).expect("should decode");
        assert_eq!(decoded.method, "exactInputSingle");
        assert_eq!(decoded.fee, "3000");
        assert_eq!(decoded.amount_in, "500000");
    }

    #[test]
    fn decode_path_rejects_short_paths() {
        assert!(decode_path(&[0u8; 10]).is_none());
    }

    #[test]
    fn decode_path_extracts_ends_and_fee_for_single_hop() {
        let mut path = vec![0u8; 20];
        path[19] = 0xAA; // token in
        path.extend_from_slice(&[0x00, 0x0b, 0xb8]); // fee = 3000
        let mut token_out = vec![0u8; 20];
        token_out[19] = 0xBB;
        path.extend_from_slice(&token_out);

        let (token_in, out, fee) = decode_path(&path).unwrap();
        assert_eq!(fee, 3000);
        assert_eq!(token_in.as_slice()[19], 0xAA);
        assert_eq!(out.as_slice()[19], 0xBB);
    }

    #[test]
    fn decode_path_keeps_last_fee_across_multiple_hops() {
        let mut path = vec![0u8; 20];
        path[19] = 0xAA; // token in
        path.extend_from_slice(&[0x00, 0x0b, 0xb8]); // hop 1 fee = 3000
        path.extend_from_slice(&[0u8; 20]); // middle hop token
        path.extend_from_slice(&[0x00, 0x01, 0xf4]); // hop 2 fee = 500
        let mut token_out = vec![0u8; 20];
        token_out[19] = 0xBB;
        path.extend_from_slice(&token_out);

        let (token_in, out, fee) = decode_path(&path).unwrap();
        assert_eq!(fee, 500, "multi-hop fee must be the last hop's, not the first");
        assert_eq!(token_in.as_slice()[19], 0xAA);
        assert_eq!(out.as_slice()[19], 0xBB);
    }
}
