//! External collaborators used by the agent loop
//!
//! Each client talks to one service at its boundary: Odos for prices and
//! quotes, a market data API, the forecast model and the leaderboard.

pub mod forecast;
pub mod leaderboard;
pub mod market_data;
mod odos;

pub use forecast::ForecastClient;
pub use leaderboard::{CycleReport, LeaderboardReporter, ReportOutcome};
pub use market_data::{MarketDataClient, PricePoint};
pub use odos::OdosTool;
