use crate::core::rate::{ExchangeRate, RateTable};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Lifecycle of the cached table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    SeededFromPersisted,
    Live,
}

/// An immutable view of the cache as of one commit.
#[derive(Debug, Clone)]
pub struct RateSnapshot {
    pub table: Option<RateTable>,
    pub last_updated: Option<DateTime<Utc>>,
    pub state: CacheState,
}

impl RateSnapshot {
    fn uninitialized() -> Self {
        RateSnapshot {
            table: None,
            last_updated: None,
            state: CacheState::Uninitialized,
        }
    }
}

/// Single-writer rate cache. Readers clone an `Arc` of the last committed
/// snapshot; a replace swaps the whole snapshot at once.
pub struct RateCache {
    current: RwLock<Arc<RateSnapshot>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RateSnapshot::uninitialized())),
        }
    }

    /// A cache holding one persisted rate until the first refresh commits.
    /// The seed does not count as a refresh, so the cache is still due.
    pub fn seeded(rate: ExchangeRate) -> Self {
        debug!(currency = %rate.currency_code, "Seeding rate cache from persisted rate");
        Self {
            current: RwLock::new(Arc::new(RateSnapshot {
                table: Some(RateTable::single(rate)),
                last_updated: None,
                state: CacheState::SeededFromPersisted,
            })),
        }
    }

    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    pub fn replace(&self, table: RateTable, updated_at: DateTime<Utc>) {
        let snapshot = Arc::new(RateSnapshot {
            table: Some(table),
            last_updated: Some(updated_at),
            state: CacheState::Live,
        });
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = snapshot;
        debug!(%updated_at, "Cache REPLACE");
    }

    /// True when no refresh has committed, or the last one is older than `interval`.
    pub fn is_stale(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        match self.snapshot().last_updated {
            Some(last_updated) => now - last_updated > interval,
            None => true,
        }
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}
