//! Daily volume ledger
//!
//! Tracks cumulative traded USD value per wallet per UTC day. Read-check-commit
//! is serialized per wallet so two concurrent validations cannot both fit under
//! the limit when only one should.

use crate::Result;
use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Running total for one wallet on one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyVolumeRecord {
    pub date: NaiveDate,
    pub volume_usd: f64,
}

/// Backing storage for volume records
#[async_trait]
pub trait VolumeStore: Send + Sync {
    async fn load(&self, wallet: Address, date: NaiveDate) -> Result<Option<DailyVolumeRecord>>;

    async fn store(&self, wallet: Address, record: DailyVolumeRecord) -> Result<()>;

    /// Drop every record dated before `cutoff`, returning how many were removed
    async fn evict_before(&self, cutoff: NaiveDate) -> Result<usize>;
}

/// Process-local store
#[derive(Default)]
pub struct InMemoryVolumeStore {
    records: RwLock<HashMap<(Address, NaiveDate), f64>>,
}

impl InMemoryVolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VolumeStore for InMemoryVolumeStore {
    async fn load(&self, wallet: Address, date: NaiveDate) -> Result<Option<DailyVolumeRecord>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(wallet, date))
            .map(|volume_usd| DailyVolumeRecord {
                date,
                volume_usd: *volume_usd,
            }))
    }

    async fn store(&self, wallet: Address, record: DailyVolumeRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert((wallet, record.date), record.volume_usd);
        Ok(())
    }

    async fn evict_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|(_, date), _| *date >= cutoff);
        Ok(before - records.len())
    }
}

/// Result of a volume reservation attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeCheck {
    Committed { previous: f64, new_total: f64 },
    Exceeded { current: f64, new_total: f64 },
}

/// Volume ledger owned by a policy engine
pub struct VolumeLedger {
    store: Arc<dyn VolumeStore>,
    retention_days: u32,
    wallet_locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
    last_eviction: Mutex<Option<NaiveDate>>,
}

impl VolumeLedger {
    /// # Arguments
    /// * `store` - Backing storage
    /// * `retention_days` - Days of history kept before today's record
    pub fn new(store: Arc<dyn VolumeStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
            wallet_locks: Mutex::new(HashMap::new()),
            last_eviction: Mutex::new(None),
        }
    }

    async fn wallet_lock(&self, wallet: Address) -> Arc<Mutex<()>> {
        let mut locks = self.wallet_locks.lock().await;
        locks
            .entry(wallet)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Today's running total; zero when no record exists
    pub async fn current(&self, wallet: Address, date: NaiveDate) -> Result<f64> {
        Ok(self
            .store
            .load(wallet, date)
            .await?
            .map(|record| record.volume_usd)
            .unwrap_or(0.0))
    }

    /// Add `amount_usd` to the wallet's total for `date` unless that would exceed `limit_usd`.
    pub async fn try_commit(
        &self,
        wallet: Address,
        date: NaiveDate,
        amount_usd: f64,
        limit_usd: f64,
    ) -> Result<VolumeCheck> {
        self.evict_stale(date).await;

        let lock = self.wallet_lock(wallet).await;
        let _guard = lock.lock().await;

        let current = self.current(wallet, date).await?;
        let new_total = current + amount_usd;
        if new_total > limit_usd {
            return Ok(VolumeCheck::Exceeded { current, new_total });
        }

        self.store
            .store(
                wallet,
                DailyVolumeRecord {
                    date,
                    volume_usd: new_total,
                },
            )
            .await?;

        tracing::info!(
            wallet = %wallet,
            %date,
            trade_value = amount_usd,
            new_daily_total = new_total,
            "Committed daily volume"
        );

        Ok(VolumeCheck::Committed {
            previous: current,
            new_total,
        })
    }

    /// Return a previously committed amount; the total never drops below zero.
    pub async fn release(&self, wallet: Address, date: NaiveDate, amount_usd: f64) -> Result<f64> {
        let lock = self.wallet_lock(wallet).await;
        let _guard = lock.lock().await;

        let current = self.current(wallet, date).await?;
        let new_total = (current - amount_usd).max(0.0);
        self.store
            .store(
                wallet,
                DailyVolumeRecord {
                    date,
                    volume_usd: new_total,
                },
            )
            .await?;

        tracing::info!(
            wallet = %wallet,
            %date,
            released = amount_usd,
            new_daily_total = new_total,
            "Released daily volume"
        );
        Ok(new_total)
    }

    /// Evict records older than the retention window, at most once per day
    async fn evict_stale(&self, today: NaiveDate) {
        let mut last = self.last_eviction.lock().await;
        if *last == Some(today) {
            return;
        }

        let cutoff = today
            .checked_sub_days(Days::new(u64::from(self.retention_days)))
            .unwrap_or(NaiveDate::MIN);
        match self.store.evict_before(cutoff).await {
            Ok(removed) => {
                if removed > 0 {
                    tracing::debug!(removed, %cutoff, "Evicted stale volume records");
                }
                *last = Some(today);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Volume record eviction failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::addr;

    fn week_ledger() -> VolumeLedger {
        VolumeLedger::new(Arc::new(InMemoryVolumeStore::new()), 7)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn commits_accumulate_within_a_day() {
        let ledger = week_ledger();
        let wallet = addr(9);

        let first = ledger.try_commit(wallet, day(10), 400.0, 1000.0).await.unwrap();
        assert_eq!(
            first,
            VolumeCheck::Committed {
                previous: 0.0,
                new_total: 400.0
            }
        );

        let second = ledger.try_commit(wallet, day(10), 700.0, 1000.0).await.unwrap();
        assert_eq!(
            second,
            VolumeCheck::Exceeded {
                current: 400.0,
                new_total: 1100.0
            }
        );
        assert_eq!(ledger.current(wallet, day(10)).await.unwrap(), 400.0);
    }

    #[tokio::test]
    async fn new_day_starts_from_zero() {
        let ledger = week_ledger();
        let wallet = addr(9);

        ledger.try_commit(wallet, day(10), 900.0, 1000.0).await.unwrap();
        let next = ledger.try_commit(wallet, day(11), 900.0, 1000.0).await.unwrap();
        assert!(matches!(next, VolumeCheck::Committed { previous, .. } if previous == 0.0));
    }

    #[tokio::test]
    async fn wallets_are_tracked_separately() {
        let ledger = week_ledger();

        ledger.try_commit(addr(1), day(10), 900.0, 1000.0).await.unwrap();
        let other = ledger.try_commit(addr(2), day(10), 900.0, 1000.0).await.unwrap();
        assert!(matches!(other, VolumeCheck::Committed { .. }));
    }

    #[tokio::test]
    async fn release_refunds_and_floors_at_zero() {
        let ledger = week_ledger();
        let wallet = addr(3);

        ledger.try_commit(wallet, day(10), 300.0, 1000.0).await.unwrap();
        assert_eq!(ledger.release(wallet, day(10), 100.0).await.unwrap(), 200.0);
        assert_eq!(ledger.release(wallet, day(10), 500.0).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn stale_days_are_evicted() {
        let store = Arc::new(InMemoryVolumeStore::new());
        let ledger = VolumeLedger::new(store.clone(), 2);
        let wallet = addr(4);

        ledger.try_commit(wallet, day(1), 10.0, 1000.0).await.unwrap();
        ledger.try_commit(wallet, day(2), 10.0, 1000.0).await.unwrap();
        assert_eq!(store.len().await, 2);

        // Cutoff for day 5 with two days of retention is day 3
        ledger.try_commit(wallet, day(5), 10.0, 1000.0).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(ledger.current(wallet, day(1)).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn concurrent_commits_never_overshoot_the_limit() {
        let ledger = Arc::new(week_ledger());
        let wallet = addr(5);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.try_commit(wallet, day(10), 100.0, 1000.0).await.unwrap()
            }));
        }

        let mut committed = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), VolumeCheck::Committed { .. }) {
                committed += 1;
            }
        }

        assert_eq!(committed, 10);
        assert_eq!(ledger.current(wallet, day(10)).await.unwrap(), 1000.0);
    }
}
