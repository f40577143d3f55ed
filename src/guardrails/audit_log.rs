//! Audit log
//!
//! Appends one JSON line per policy decision and per swap result. Write
//! failures are logged and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    cycle_id: Option<Uuid>,
    entry_type: &'a str,
    payload: Value,
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// JSONL audit trail shared by the pipeline
pub struct AuditLog {
    writer: Mutex<AuditLogWriter>,
}

impl AuditLog {
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Mutex::new(AuditLogWriter {
                path: log_path.into(),
            }),
        }
    }

    pub async fn record(
        &self,
        cycle_id: Option<Uuid>,
        entry_type: &str,
        payload: &impl Serialize,
    ) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, entry_type, "Failed to serialize audit payload");
                return;
            }
        };

        let entry = AuditEntry {
            timestamp: Utc::now(),
            cycle_id,
            entry_type,
            payload,
        };

        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(&entry) {
            tracing::warn!(error = %e, path = %writer.path.display(), "Failed to write audit log entry");
        }
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}
