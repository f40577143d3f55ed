//! Guardrail trading agent CLI

use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use guardrail_trader::config::env_keys;
use guardrail_trader::runner::{build_engine, resolve_decimals, RunOptions};
use guardrail_trader::{AgentRunner, Config, Error, Result, TradeIntent};
use secrecy::SecretString;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "guardrail-agent")]
#[command(about = "Forecast-driven swap agent with guardrail policy checks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading loop
    Run {
        /// Evaluate trades against policy without signing anything
        #[arg(long)]
        dry_run: bool,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Evaluate a trade against the guardrails without committing volume
    Validate {
        /// Input token address
        #[arg(long)]
        token_in: Address,

        /// Output token address
        #[arg(long)]
        token_out: Address,

        /// Amount of the input token in its smallest unit
        #[arg(long)]
        amount: U256,

        /// Input token decimals (looked up in the token registry when omitted)
        #[arg(long)]
        decimals: Option<u8>,

        /// Requested slippage in basis points
        #[arg(long, default_value_t = 50)]
        slippage_bps: u32,

        /// Wallet the trade is attributed to (defaults to the configured wallet)
        #[arg(long)]
        wallet: Option<Address>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { dry_run, once } => {
            let private_key = std::env::var(env_keys::PRIVATE_KEY)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from);
            if private_key.is_none() && !dry_run {
                tracing::warn!("No PRIVATE_KEY set, live trading is unavailable");
            }

            let runner = AgentRunner::from_config(
                &config,
                private_key,
                RunOptions { dry_run, once },
            )?;
            runner.run().await?;
        }
        Commands::Validate {
            token_in,
            token_out,
            amount,
            decimals,
            slippage_bps,
            wallet,
        } => {
            let wallet = wallet.or(config.wallet_address).ok_or_else(|| {
                Error::InvalidArgument(
                    "--wallet is required when WALLET_ADDRESS is not configured".to_string(),
                )
            })?;
            let decimals = resolve_decimals(token_in, decimals)?;
            let intent =
                TradeIntent::new(token_in, token_out, amount, decimals, slippage_bps, wallet);

            let engine = build_engine(&config, wallet)?;
            let decision = engine.evaluate(&intent).await;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
