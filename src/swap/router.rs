//! Uniswap V3 router and ERC-20 bindings
//!
//! Calldata builders for `approve` and `exactInputSingle`, plus the helpers
//! that turn a mined receipt back into an output amount.

use crate::tokens::to_token_units;
use alloy::primitives::aliases::{U160, U24};
use alloy::primitives::{Address, Bytes, Log, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};

sol! {
    interface ISwapRouter {
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

        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }

    interface IERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);

        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Basis-point denominator
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Parameters for a single-pool exact-input swap
#[derive(Debug, Clone, PartialEq)]
pub struct SwapParams {
    pub token_in: Address,
    pub token_out: Address,
    /// Pool fee in hundredths of a bip (3000 = 0.3%)
    pub fee: u32,
    pub recipient: Address,
    /// Unix timestamp after which the router reverts
    pub deadline: u64,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
}

/// `expected * (10000 - slippage_bps) / 10000`, floored
pub fn min_amount_out(expected: U256, slippage_bps: u32) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps);
    expected * U256::from(keep) / U256::from(BPS_DENOMINATOR)
}

pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Encode `exactInputSingle` with no price limit.
///
/// `fee` must fit in 24 bits; configured tiers are validated on load.
pub fn exact_input_single_calldata(params: &SwapParams) -> Bytes {
    ISwapRouter::exactInputSingleCall {
        params: ISwapRouter::ExactInputSingleParams {
            tokenIn: params.token_in,
            tokenOut: params.token_out,
            fee: U24::from(params.fee),
            recipient: params.recipient,
            deadline: U256::from(params.deadline),
            amountIn: params.amount_in,
            amountOutMinimum: params.amount_out_minimum,
            sqrtPriceLimitX96: U160::ZERO,
        },
    }
    .abi_encode()
    .into()
}

/// Amount of the first `Transfer` emitted by `token` to `recipient`
pub fn find_transfer_amount(logs: &[Log], token: Address, recipient: Address) -> Option<U256> {
    logs.iter()
        .filter(|log| log.address == token)
        .filter_map(|log| IERC20::Transfer::decode_log(log).ok())
        .find(|transfer| transfer.data.to == recipient)
        .map(|transfer| transfer.data.value)
}

/// `(expected - actual) / expected * 100`; negative when the fill beat the estimate
pub fn effective_slippage(expected: U256, actual: U256) -> Option<f64> {
    if expected.is_zero() {
        return None;
    }
    let expected = to_token_units(expected, 0);
    let actual = to_token_units(actual, 0);
    Some((expected - actual) / expected * 100.0)
}
