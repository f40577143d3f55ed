//! Security policy gating every outbound swap

pub mod audit_log;
pub mod engine;
pub mod slippage_guard;
pub mod volume_ledger;
pub mod whitelist;

pub use audit_log::AuditLog;
pub use engine::{GuardrailEngine, PolicyDecision, VolumeCommit, FALLBACK_PRICE_USD};
pub use slippage_guard::{SlippageGuard, SlippageViolation};
pub use volume_ledger::{
    DailyVolumeRecord, InMemoryVolumeStore, VolumeCheck, VolumeLedger, VolumeStore,
};
pub use whitelist::{OnchainWhitelist, WhitelistOracle, WhitelistOutcome, WhitelistPolicy};
