//! Uniswap V2 router calldata decoder (spec §4.3).
//!
//! Dispatches on the 4-byte function selector, then ABI-decodes with the
//! matching `SolCall` impl from [`crate::contracts::IUniswapV2RouterSwaps`].
//! Grounded in the teacher's `mempool::decoder::decode_calldata` selector
//! dispatch, adapted from `ethers::abi::decode` to `alloy_sol_types::SolCall`.

use alloy::primitives::{Address, U256};
use alloy_sol_types::SolCall;
use tracing::trace;

use crate::addressing::to_lower;
use crate::contracts::IUniswapV2RouterSwaps::{
    swapETHForExactTokensCall, swapExactETHForTokensCall,
    swapExactETHForTokensSupportingFeeOnTransferTokensCall, swapExactTokensForETHCall,
    swapExactTokensForETHSupportingFeeOnTransferTokensCall, swapExactTokensForTokensCall,
    swapExactTokensForTokensSupportingFeeOnTransferTokensCall, swapTokensForExactETHCall,
    swapTokensForExactTokensCall,
};
use crate::types::{format_amount, DecodedSwap, RouterFamily};

/// Decode a V2 router call. `tx_value` is the outer transaction's `value`,
/// needed for the ETH-in methods which carry no explicit `amountIn` param
/// (spec §4.3 V2 table). Returns `None` for an unrecognized selector or a
/// malformed payload — both are treated as "not a swap we understand",
/// never as a hard error.
pub fn decode(router: &str, input: &[u8], tx_value: U256) -> Option<DecodedSwap> {
    if input.len() < 4 {
        return None;
    }
    let selector: [u8; 4] = input[..4].try_into().ok()?;
    let router = router.to_lowercase();

    match selector {
        s if s == swapExactTokensForTokensCall::SELECTOR => {
            let call = swapExactTokensForTokensCall::abi_decode(input, true).ok()?;
            Some(exact_in(
                &router,
                "swapExactTokensForTokens",
                &call.path,
                call.amountIn,
                call.amountOutMin,
                call.to,
                call.deadline,
            ))
        }
        s if s == swapExactTokensForTokensSupportingFeeOnTransferTokensCall::SELECTOR => {
            let call =
                swapExactTokensForTokensSupportingFeeOnTransferTokensCall::abi_decode(input, true)
                    .ok()?;
            Some(exact_in(
                &router,
                "swapExactTokensForTokensSupportingFeeOnTransferTokens",
                &call.path,
                call.amountIn,
                call.amountOutMin,
                call.to,
                call.deadline,
            ))
        }
        s if s == swapTokensForExactTokensCall::SELECTOR => {
            let call = swapTokensForExactTokensCall::abi_decode(input, true).ok()?;
            Some(exact_out(
                &router,
                "swapTokensForExactTokens",
                &call.path,
                call.amountOut,
                call.amountInMax,
                call.to,
                call.deadline,
            ))
        }
        s if s == swapExactETHForTokensCall::SELECTOR => {
            let call = swapExactETHForTokensCall::abi_decode(input, true).ok()?;
            Some(exact_in(
                &router,
                "swapExactETHForTokens",
                &call.path,
                tx_value,
                call.amountOutMin,
                call.to,
                call.deadline,
            ))
        }
        s if s == swapExactETHForTokensSupportingFeeOnTransferTokensCall::SELECTOR => {
            let call =
                swapExactETHForTokensSupportingFeeOnTransferTokensCall::abi_decode(input, true)
                    .ok()?;
            Some(exact_in(
                &router,
                "swapExactETHForTokensSupportingFeeOnTransferTokens",
                &call.path,
                tx_value,
                call.amountOutMin,
                call.to,
                call.deadline,
            ))
        }
        s if s == swapExactTokensForETHCall::SELECTOR => {
            let call = swapExactTokensForETHCall::abi_decode(input, true).ok()?;
            Some(exact_in(
                &router,
                "swapExactTokensForETH",
                &call.path,
                call.amountIn,
                call.amountOutMin,
                call.to,
                call.deadline,
            ))
        }
        s if s == swapExactTokensForETHSupportingFeeOnTransferTokensCall::SELECTOR => {
            let call =
                swapExactTokensForETHSupportingFeeOnTransferTokensCall::abi_decode(input, true)
                    .ok()?;
            Some(exact_in(
                &router,
                "swapExactTokensForETHSupportingFeeOnTransferTokens",
                &call.path,
                call.amountIn,
                call.amountOutMin,
                call.to,
                call.deadline,
            ))
        }
        s if s == swapETHForExactTokensCall::SELECTOR => {
            let call = swapETHForExactTokensCall::abi_decode(input, true).ok()?;
            let (token_in, token_out) = path_ends(&call.path);
            // ETH-in method: msg.value is both the declared amountIn (spec
            // §4.3 V2 table) and the implicit amountInMax (refunded on excess).
            Some(DecodedSwap {
                router: router.clone(),
                method: "swapETHForExactTokens".to_string(),
                router_family: RouterFamily::V2,
                token_in,
                token_out,
                amount_in: format_amount(tx_value),
                amount_out: format_amount(call.amountOut),
                amount_out_min: String::new(),
                amount_in_max: format_amount(tx_value),
                fee: "0".to_string(),
                recipient: to_lower(call.to),
                deadline: format_amount(call.deadline),
                payer_is_user: true,
            })
        }
        s if s == swapTokensForExactETHCall::SELECTOR => {
            let call = swapTokensForExactETHCall::abi_decode(input, true).ok()?;
            let (token_in, token_out) = path_ends(&call.path);
            // Table quirk preserved verbatim: both amountIn and amountInMax
            // carry the decoded amountInMax value for this method.
            Some(DecodedSwap {
                router: router.clone(),
                method: "swapTokensForExactETH".to_string(),
                router_family: RouterFamily::V2,
                token_in,
                token_out,
                amount_in: format_amount(call.amountInMax),
                amount_out: format_amount(call.amountOut),
                amount_out_min: String::new(),
                amount_in_max: format_amount(call.amountInMax),
                fee: "0".to_string(),
                recipient: to_lower(call.to),
                deadline: format_amount(call.deadline),
                payer_is_user: true,
            })
        }
        _ => {
            trace!(
                selector = %format!("0x{:02x}{:02x}{:02x}{:02x}", selector[0], selector[1], selector[2], selector[3]),
                "unrecognized V2 selector"
            );
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn exact_in(
    router: &str,
    method: &str,
    path: &[Address],
    amount_in: U256,
    amount_out_min: U256,
    recipient: Address,
    deadline: U256,
) -> DecodedSwap {
    let (token_in, token_out) = path_ends(path);
    DecodedSwap {
        router: router.to_string(),
        method: method.to_string(),
        router_family: RouterFamily::V2,
        token_in,
        token_out,
        amount_in: format_amount(amount_in),
        amount_out: String::new(),
        amount_out_min: format_amount(amount_out_min),
        amount_in_max: String::new(),
        fee: "0".to_string(),
        recipient: to_lower(recipient),
        deadline: format_amount(deadline),
        payer_is_user: true,
    }
}

#[allow(clippy::too_many_arguments)]
fn exact_out(
    router: &str,
    method: &str,
    path: &[Address],
    amount_out: U256,
    amount_in_max: U256,
    recipient: Address,
    deadline: U256,
) -> DecodedSwap {
    let (token_in, token_out) = path_ends(path);
    DecodedSwap {
        router: router.to_string(),
        method: method.to_string(),
        router_family: RouterFamily::V2,
        token_in,
        token_out,
        amount_in: String::new(),
        amount_out: format_amount(amount_out),
        amount_out_min: String::new(),
        amount_in_max: format_amount(amount_in_max),
        fee: "0".to_string(),
        recipient: to_lower(recipient),
        deadline: format_amount(deadline),
        payer_is_user: true,
    }
}

fn path_ends(path: &[Address]) -> (String, String) {
    let token_in = path.first().map(|a| to_lower(*a)).unwrap_or_default();
    let token_out = path.last().map(|a| to_lower(*a)).unwrap_or_default();
    (token_in, token_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn build_exact_in_calldata() -> Vec<u8> {
        let call = swapExactTokensForTokensCall {
            amountIn: U256::from(1_000_000u64),
            amountOutMin: U256::from(1u64),
            path: vec![
                address!("0000000000000000000000000000000000000001"),
                address!("0000000000000000000000000000000000000002"),
            ],
            to: address!("0000000000000000000000000000000000000003"),
            deadline: U256::from(1_893_456_000u64),
        };
        call.abi_encode()
    }

    #[test]
    fn decodes_exact_tokens_for_tokens() {
        let data = build_exact_in_calldata();
        let decoded = decode("0xrouter", &data, U256::ZERO).expect("should decode");
        assert_eq!(decoded.method, "swapExactTokensForTokens");
        assert_eq!(decoded.amount_in, "1000000");
        assert_eq!(decoded.fee, "0");
        assert_eq!(decoded.token_in, "0x0000000000000000000000000000000000000001");
        assert_eq!(decoded.token_out, "0x0000000000000000000000000000000000000002");
    }

    #[test]
    fn eth_in_method_uses_tx_value_as_amount_in() {
        let call = swapExactETHForTokensCall {
            amountOutMin: U256::from(1u64),
            path: vec![
                address!("0000000000000000000000000000000000000001"),
                address!("0000000000000000000000000000000000000002"),
            ],
            to: address!("0000000000000000000000000000000000000003"),
            deadline: U256::from(1_893_456_000u64),
        };
        let data = call.abi_encode();
        let decoded = decode("0xrouter", &data, U256::from(5_000_000u64)).expect("should decode");
        assert_eq!(decoded.amount_in, "5000000");
    }

    #[test]
    fn eth_for_exact_tokens_uses_tx_value_as_amount_in() {
        let call = swapETHForExactTokensCall {
            amountOut: U256::from(1_000u64),
            path: vec![
                address!("0000000000000000000000000000000000000001"),
                address!("0000000000000000000000000000000000000002"),
            ],
            to: address!("0000000000000000000000000000000000000003"),
            deadline: U256::from(1_893_456_000u64),
        };
        let data = call.abi_encode();
        let decoded = decode("0xrouter", &data, U256::from(7_000u64)).expect("should decode");
        assert_eq!(decoded.amount_in, "7000");
        assert_eq!(decoded.amount_in_max, "7000");
        assert_eq!(decoded.amount_out, "1000");
    }

    #[test]
    fn swap_tokens_for_exact_eth_mirrors_amount_in_max_into_amount_in() {
        let call = swapTokensForExactETHCall {
            amountOut: U256::from(1u64),
            amountInMax: U256::from(9_000u64),
            path: vec![
                address!("0000000000000000000000000000000000000001"),
                address!("0000000000000000000000000000000000000002"),
            ],
            to: address!("0000000000000000000000000000000000000003"),
            deadline: U256::from(1_893_456_000u64),
        };
        let data = call.abi_encode();
        let decoded = decode("0xrouter", &data, U256::ZERO).expect("should decode");
        assert_eq!(decoded.amount_in, "9000");
        assert_eq!(decoded.amount_in_max, "9000");
    }

    #[test]
    fn unknown_selector_returns_none() {
        let data = vec![0xde, 0xad, 0xbe, 0xef, 0x00];
        assert!(decode("0xrouter", &data, U256::ZERO).is_none());
    }

    #[test]
    fn short_input_returns_none() {
        assert!(decode("0xrouter", &[0x01, 0x02], U256::ZERO).is_none());
    }
}
