//! Leaderboard reporting
//!
//! Fire-and-forget: each report is posted from a spawned task and failures
//! are only logged.

use crate::trade::{Signal, SwapResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-cycle report body
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub agent_id: String,
    pub cycle_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub signal: Signal,
    pub dry_run: bool,
    /// Set when a trade was attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReportOutcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Rejected { reason: String },
    Executed { result: SwapResult },
    Previewed { valid: bool },
}

#[derive(Clone)]
pub struct LeaderboardReporter {
    client: reqwest::Client,
    url: String,
}

impl LeaderboardReporter {
    pub fn new(url: impl Into<String>) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn report(&self, report: CycleReport) -> JoinHandle<()> {
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            let cycle_id = report.cycle_id;
            match client.post(&url).json(&report).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(%cycle_id, "Leaderboard report posted");
                }
                Ok(response) => {
                    tracing::warn!(%cycle_id, status = %response.status(), "Leaderboard rejected report");
                }
                Err(e) => {
                    tracing::warn!(%cycle_id, error = %e, "Failed to post leaderboard report");
                }
            }
        })
    }
}
