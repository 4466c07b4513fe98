//! Centralized Contract Definitions
//!
//! Solidity interfaces consumed by the quote fetcher, defined using alloy's
//! `sol!` macro. Each interface is annotated with `#[sol(rpc)]` to generate
//! contract instance types that can make RPC calls via any alloy Provider.
//!
//! Author: AI-Generated
//! Created: 2026-02-02

use alloy::sol;

// ── Uniswap V3 QuoterV2 ──────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IQuoterV2 {
        function quoteExactInput(bytes memory path, uint256 amountIn)
            external
            returns (
                uint256 amountOut,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );

        function quoteExactOutput(bytes memory path, uint256 amountOut)
            external
            returns (
                uint256 amountIn,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );
    }
}

// ── Gas-limited interface multicall ──────────────────────────────────
//
// Unlike Multicall3's aggregate3, this variant enforces a per-sub-call gas
// ceiling and reports per-sub-call gas usage, which the fetcher needs to
// keep each batch below the node's eth_call gas cap.

sol! {
    #[sol(rpc)]
    interface IInterfaceMulticall {
        struct Call {
            address target;
            uint256 gasLimit;
            bytes callData;
        }

        struct Result {
            bool success;
            uint256 gasUsed;
            bytes returnData;
        }

        function multicall(Call[] memory calls)
            public
            returns (uint256 blockNumber, Result[] memory returnData);
    }
}
