//! Universal Router command-stream decoder (spec §4.3).
//!
//! `execute(commands, inputs, deadline)`: `commands` is a byte string where
//! each byte is a command tag (the top bit is the allow-revert flag, masked
//! off here); `inputs[i]` is the ABI-encoded tuple for that command. Unknown
//! tags are non-swap commands (PERMIT2, WRAP_ETH, SWEEP, ...) and are
//! silently skipped — never an error.
//!
//! The opcode table is a single match arm per recognized tag so that adding
//! a new one stays a one-line change.

use alloy_sol_types::{SolCall, SolValue};
use tracing::trace;

use crate::addressing::to_lower;
use crate::contracts::IUniversalRouter::executeCall;
use crate::contracts::IUniversalRouterCommands::{
    V2ExactInParams, V2ExactOutParams, V3ExactInParams, V3ExactOutParams,
};
use crate::types::{format_amount, DecodedSwap, RouterFamily};

const V3_EXACT_IN: u8 = 0x00;
const V3_EXACT_OUT: u8 = 0x01;
const V2_EXACT_IN: u8 = 0x08;
const V2_EXACT_OUT: u8 = 0x09;
const COMMAND_TYPE_MASK: u8 = 0x3f;

/// Decode every recognized sub-action out of an `execute` call, in command
/// order. Returns an empty list (never an error) when `commands` holds only
/// unrecognized tags, and the same for a malformed outer call.
pub fn decode(router: &str, input: &[u8]) -> Vec<DecodedSwap> {
    let Some(call) = (if input.len() >= 4 && input[..4] == executeCall::SELECTOR {
        executeCall::abi_decode(input, true).ok()
    } else {
        None
    }) else {
        return Vec::new();
    };

    let router = router.to_lowercase();
    let deadline = format_amount(call.deadline);
    let mut swaps = Vec::new();

    for (i, &tag_byte) in call.commands.iter().enumerate() {
        let Some(raw) = call.inputs.get(i) else {
            continue;
        };
        let tag = tag_byte & COMMAND_TYPE_MASK;

        let decoded = match tag {
            V3_EXACT_IN => V3ExactInParams::abi_decode_params(raw, true).ok().map(|p| {
                let (token_in, token_out, fee) = super::v3_path_ends(&p.path);
                DecodedSwap {
                    router: router.clone(),
                    method: "v3ExactIn".to_string(),
                    router_family: RouterFamily::V3,
                    token_in,
                    token_out,
                    amount_in: format_amount(p.amountIn),
                    amount_out: String::new(),
                    amount_out_min: format_amount(p.amountOutMin),
                    amount_in_max: String::new(),
                    fee: fee.to_string(),
                    recipient: to_lower(p.recipient),
                    deadline: deadline.clone(),
                    payer_is_user: p.payerIsUser,
                }
            }),
            V3_EXACT_OUT => V3ExactOutParams::abi_decode_params(raw, true).ok().map(|p| {
                let (token_in, token_out, fee) = super::v3_path_ends(&p.path);
                DecodedSwap {
                    router: router.clone(),
                    method: "v3ExactOut".to_string(),
                    router_family: RouterFamily::V3,
                    token_in,
                    token_out,
                    amount_in: String::new(),
                    amount_out: format_amount(p.amountOut),
                    amount_out_min: String::new(),
                    amount_in_max: format_amount(p.amountInMax),
                    fee: fee.to_string(),
                    recipient: to_lower(p.recipient),
                    deadline: deadline.clone(),
                    payer_is_user: p.payerIsUser,
                }
            }),
            V2_EXACT_IN => V2ExactInParams::abi_decode_params(raw, true).ok().map(|p| {
                let token_in = p.path.first().map(|a| to_lower(*a)).unwrap_or_default();
                let token_out = p.path.last().map(|a| to_lower(*a)).unwrap_or_default();
                DecodedSwap {
                    router: router.clone(),
                    method: "v2ExactIn".to_string(),
                    router_family: RouterFamily::V2,
                    token_in,
                    token_out,
                    amount_in: format_amount(p.amountIn),
                    amount_out: String::new(),
                    amount_out_min: format_amount(p.amountOutMin),
                    amount_in_max: String::new(),
                    fee: "0".to_string(),
                    recipient: to_lower(p.recipient),
                    deadline: deadline.clone(),
                    payer_is_user: p.payerIsUser,
                }
            }),
            V2_EXACT_OUT => V2ExactOutParams::abi_decode_params(raw, true).ok().map(|p| {
                let token_in = p.path.first().map(|a| to_lower(*a)).unwrap_or_default();
                let token_out = p.path.last().map(|a| to_lower(*a)).unwrap_or_default();
                // Spec's command table names the second field "amountIn" for
                // this tag even though it carries the exact-output target;
                // remapped here rather than in the wire shape.
                DecodedSwap {
                    router: router.clone(),
                    method: "v2ExactOut".to_string(),
                    router_family: RouterFamily::V2,
                    token_in,
                    token_out,
                    amount_in: String::new(),
                    amount_out: format_amount(p.amountIn),
                    amount_out_min: String::new(),
                    amount_in_max: format_amount(p.amountInMax),
                    fee: "0".to_string(),
                    recipient: to_lower(p.recipient),
                    deadline: deadline.clone(),
                    payer_is_user: p.payerIsUser,
                }
            }),
            other => {
                trace!(tag = other, "unrecognized universal-router command, skipping");
                None
            }
        };

        if let Some(swap) = decoded {
            swaps.push(swap);
        }
    }

    swaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};

    fn path_bytes(token_in: alloy::primitives::Address, fee: u32, token_out: alloy::primitives::Address) -> alloy::primitives::Bytes {
        let mut buf = Vec::with_capacity(43);
        buf.extend_from_slice(token_in.as_slice());
        buf.push((fee >> 16) as u8);
        buf.push((fee >> 8) as u8);
        buf.push(fee as u8);
        buf.extend_from_slice(token_out.as_slice());
        buf.into()
    }

    #[test]
    fn decodes_v3_exact_in_and_v2_exact_in_in_command_order() {
        let token_a = address!("0000000000000000000000000000000000000001");
        let token_b = address!("0000000000000000000000000000000000000002");
        let token_c = address!("0000000000000000000000000000000000000003");
        let recipient = address!("0000000000000000000000000000000000000009");

        let v3_input = V3ExactInParams {
            recipient,
            amountIn: U256::from(1_000u64),
            amountOutMin: U256::from(1u64),
            path: path_bytes(token_a, 3000, token_b),
            payerIsUser: true,
        }
        .abi_encode_params();

        let v2_input = V2ExactInParams {
            recipient,
            amountIn: U256::from(2_000u64),
            amountOutMin: U256::from(1u64),
            path: vec![token_b, token_c],
            payerIsUser: true,
        }
        .abi_encode_params();

        let call = executeCall {
            commands: vec![V3_EXACT_IN, V2_EXACT_IN].into(),
            inputs: vec![v3_input.into(), v2_input.into()],
            deadline: U256::from(1_893_456_000u64),
        };
        let data = call.abi_encode();

        let swaps = decode("0xuniversal", &data);
        assert_eq!(swaps.len(), 2);
        assert_eq!(swaps[0].method, "v3ExactIn");
        assert_eq!(swaps[0].router_family, RouterFamily::V3);
        assert_eq!(swaps[1].method, "v2ExactIn");
        assert_eq!(swaps[1].router_family, RouterFamily::V2);
    }

    #[test]
    fn unrecognized_tags_decode_to_empty_list() {
        let call = executeCall {
            commands: vec![0x0c].into(), // PERMIT2_PERMIT, not a swap
            inputs: vec![alloy::primitives::Bytes::new()],
            deadline: U256::from(1u64),
        };
        let data = call.abi_encode();
        assert!(decode("0xuniversal", &data).is_empty());
    }
}
