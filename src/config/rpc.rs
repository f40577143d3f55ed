//! RPC endpoint configuration
//!
//! Resolution order for each chain:
//! 1. `RPC_URL` (applies to the chain the agent trades on)
//! 2. Per-chain env vars (`ETH_RPC_URL`, `ARBITRUM_RPC_URL`, ...)
//! 3. Provider API keys (`ALCHEMY_API_KEY`, then `INFURA_API_KEY`)
//! 4. Public RPC fallbacks (rate limited, for testing only)
//!
//! ```bash
//! export RPC_URL="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! # or
//! export ALCHEMY_API_KEY="YOUR_KEY"
//! ```

use crate::{Error, Result};
use std::collections::HashMap;
use url::Url;

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const ARBITRUM: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
    pub const POLYGON: u64 = 137;
}

/// Environment variable names
mod env_vars {
    pub const RPC_URL: &str = "RPC_URL";
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Per-chain endpoint table: chain id, env var, Alchemy host, Infura host, public fallback.
struct ChainEndpoints {
    chain_id: u64,
    env_var: &'static str,
    alchemy: &'static str,
    infura: Option<&'static str>,
    public: &'static str,
}

const CHAIN_ENDPOINTS: &[ChainEndpoints] = &[
    ChainEndpoints {
        chain_id: chains::ETHEREUM,
        env_var: "ETH_RPC_URL",
        alchemy: "eth-mainnet",
        infura: Some("mainnet"),
        public: "https://eth.llamarpc.com",
    },
    ChainEndpoints {
        chain_id: chains::ARBITRUM,
        env_var: "ARBITRUM_RPC_URL",
        alchemy: "arb-mainnet",
        infura: Some("arbitrum-mainnet"),
        public: "https://arb1.arbitrum.io/rpc",
    },
    ChainEndpoints {
        chain_id: chains::OPTIMISM,
        env_var: "OPTIMISM_RPC_URL",
        alchemy: "opt-mainnet",
        infura: Some("optimism-mainnet"),
        public: "https://mainnet.optimism.io",
    },
    ChainEndpoints {
        chain_id: chains::BASE,
        env_var: "BASE_RPC_URL",
        alchemy: "base-mainnet",
        // Infura doesn't serve Base
        infura: None,
        public: "https://mainnet.base.org",
    },
    ChainEndpoints {
        chain_id: chains::POLYGON,
        env_var: "POLYGON_RPC_URL",
        alchemy: "polygon-mainnet",
        infura: Some("polygon-mainnet"),
        public: "https://polygon-rpc.com",
    },
];

/// Where a resolved URL came from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcSource {
    Explicit,
    PerChainEnv,
    Alchemy,
    Infura,
    Public,
}

/// RPC configuration for multiple chains
#[derive(Debug, Clone)]
pub struct RpcConfig {
    urls: HashMap<u64, (String, RpcSource)>,
}

impl RpcConfig {
    /// Build from the process environment for the chain the agent trades on.
    pub fn from_env(active_chain: u64) -> Self {
        Self::from_lookup(active_chain, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, in production).
    pub fn from_lookup(active_chain: u64, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let alchemy_key = lookup(env_vars::ALCHEMY_API_KEY);
        let infura_key = lookup(env_vars::INFURA_API_KEY);

        let mut urls = HashMap::new();
        for chain in CHAIN_ENDPOINTS {
            let resolved = if let Some(url) = lookup(chain.env_var) {
                (url, RpcSource::PerChainEnv)
            } else if let Some(key) = &alchemy_key {
                (
                    format!("https://{}.g.alchemy.com/v2/{}", chain.alchemy, key),
                    RpcSource::Alchemy,
                )
            } else if let (Some(key), Some(host)) = (&infura_key, chain.infura) {
                (format!("https://{}.infura.io/v3/{}", host, key), RpcSource::Infura)
            } else {
                (chain.public.to_string(), RpcSource::Public)
            };
            urls.insert(chain.chain_id, resolved);
        }

        if let Some(url) = lookup(env_vars::RPC_URL) {
            urls.insert(active_chain, (url, RpcSource::Explicit));
        }

        if matches!(urls.get(&active_chain), Some((_, RpcSource::Public))) {
            tracing::warn!(
                chain_id = active_chain,
                "No RPC configured for the trading chain, using public RPC (rate limited)"
            );
        }

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self {
            urls: urls
                .into_iter()
                .map(|(chain, url)| (chain, (url, RpcSource::Explicit)))
                .collect(),
        }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|(url, _)| url.as_str())
    }

    pub fn source(&self, chain_id: u64) -> Option<RpcSource> {
        self.urls.get(&chain_id).map(|(_, source)| *source)
    }

    /// Parsed URL for a chain; a missing or malformed URL is a configuration error.
    pub fn url_for(&self, chain_id: u64) -> Result<Url> {
        let raw = self
            .get(chain_id)
            .ok_or_else(|| Error::Config(format!("No RPC URL configured for chain {}", chain_id)))?;
        raw.parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL for chain {}: {}", chain_id, e)))
    }
}
