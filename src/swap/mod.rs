//! Swap execution against a Uniswap V3 style router

pub mod approval;
pub mod executor;
pub mod quote;
pub mod router;

pub use approval::{ExactApproval, SpendApproval};
pub use executor::SwapExecutor;
pub use quote::{FixedHaircutEstimator, QuoteEstimator};
pub use router::{min_amount_out, SwapParams};
