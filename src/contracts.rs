//! Centralized contract interface definitions.
//!
//! All Solidity interfaces touched by the detector, defined with alloy's
//! `sol!` macro. Each is annotated `#[sol(rpc)]` so the generated type can
//! issue `eth_call`s through any alloy `Provider`.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use alloy::sol;

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20Metadata {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
    }
}

// ── Uniswap V2 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function factory() external view returns (address);
        function WETH() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
        function totalSupply() external view returns (uint256);
    }
}

// ── Uniswap V3 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV3Router {
        function factory() external view returns (address);
        function WETH9() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV3Pool {
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked);
        function liquidity() external view returns (uint128);
        function fee() external view returns (uint24);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    interface IQuoterV1 {
        function quoteExactInputSingle(address tokenIn, address tokenOut, uint24 fee, uint256 amountIn, uint160 sqrtPriceLimitX96) external returns (uint256 amountOut);
    }
}

sol! {
    #[sol(rpc)]
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params) external returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }
}

// ── Universal Router ────────────────────────────────────────────────
//
// `execute` is decoded manually (see decode::universal) since its `inputs`
// array holds opaque per-command byte strings whose ABI shape depends on
// the command tag. The sol! definition here is only used to recognize and
// ABI-decode the outer call.

sol! {
    #[sol(rpc)]
    interface IUniversalRouter {
        function execute(bytes calldata commands, bytes[] calldata inputs, uint256 deadline) external payable;
    }
}

// ── Calldata-decode-only interfaces ──────────────────────────────────
//
// These are never dispatched as RPC calls — they exist purely so the
// decoders (decode::v2, decode::v3, decode::universal) can use
// `SolCall::abi_decode` against known function selectors.

sol! {
    interface IUniswapV2RouterSwaps {
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
        function swapExactTokensForTokensSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external;
        function swapTokensForExactTokens(uint256 amountOut, uint256 amountInMax, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
        function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable;
        function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
        function swapExactTokensForETHSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external;
        function swapETHForExactTokens(uint256 amountOut, address[] calldata path, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
        function swapTokensForExactETH(uint256 amountOut, uint256 amountInMax, address[] calldata path, address to, uint256 deadline) external returns (uint256[] memory amounts);
    }
}

sol! {
    interface IUniswapV3RouterSwaps {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountOut;
            uint256 amountInMaximum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        struct ExactOutputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountOut;
            uint256 amountInMaximum;
        }

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
        function exactOutputSingle(ExactOutputSingleParams calldata params) external payable returns (uint256 amountIn);
        function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
        function exactOutput(ExactOutputParams calldata params) external payable returns (uint256 amountIn);
    }
}

sol! {
    interface IUniversalRouterCommands {
        struct V3ExactInParams {
            address recipient;
            uint256 amountIn;
            uint256 amountOutMin;
            bytes path;
            bool payerIsUser;
        }

        struct V3ExactOutParams {
            address recipient;
            uint256 amountOut;
            uint256 amountInMax;
            bytes path;
            bool payerIsUser;
        }

        struct V2ExactInParams {
            address recipient;
            uint256 amountIn;
            uint256 amountOutMin;
            address[] path;
            bool payerIsUser;
        }

        // Field order and naming follow the universal-router command table
        // literally: the second field is positionally "amountIn" even for
        // the EXACT_OUT tag. decode::universal remaps it to amount_out.
        struct V2ExactOutParams {
            address recipient;
            uint256 amountIn;
            uint256 amountInMax;
            address[] path;
            bool payerIsUser;
        }
    }
}
