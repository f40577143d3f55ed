//! Guardrail Trading Agent
//!
//! A forecast-driven swap agent that screens every trade through a policy
//! engine before signing:
//! - Slippage bounds, self-swap and zero-amount rejection
//! - On-chain token allow-list
//! - Per-wallet daily USD volume limit
//!
//! Trades that pass are executed against a Uniswap V3 style router with a
//! slippage-protected minimum output.
//!
//! # Security Model
//!
//! - Private keys never leave the wallet module
//! - Every policy decision and swap result can be appended to a JSONL audit log
//! - Volume is committed once per executed trade and released when the swap
//!   never reaches the chain

pub mod config;
pub mod guardrails;
pub mod oracle;
pub mod pipeline;
pub mod runner;
pub mod swap;
pub mod tokens;
pub mod tools;
pub mod trade;
pub mod wallet;

mod error;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{Config, RpcConfig};
pub use error::{Error, ErrorKind, Result};
pub use guardrails::{GuardrailEngine, PolicyDecision};
pub use pipeline::{TradeOutcome, TradePipeline};
pub use runner::AgentRunner;
pub use swap::SwapExecutor;
pub use trade::{Signal, SwapResult, TradeIntent};
