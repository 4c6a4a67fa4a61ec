//! Usage analytics counters
//!
//! Best-effort: a failed save is logged and never fails the operation that
//! produced the event.

use chrono::{DateTime, Utc};
use imlo_storage::Storage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub const ANALYTICS_SNAPSHOT: &str = "analytics";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub tokens_spent: u64,
    pub corrections_performed: u64,
    pub payment_requests: u64,
    pub payment_successes: u64,
    pub payment_failures: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for UsageStats {
    fn default() -> Self {
        Self {
            tokens_spent: 0,
            corrections_performed: 0,
            payment_requests: 0,
            payment_successes: 0,
            payment_failures: 0,
            last_updated: Utc::now(),
        }
    }
}

impl UsageStats {
    /// Successes per request in percent, one decimal. `None` before the first request.
    pub fn payment_success_rate(&self) -> Option<f64> {
        if self.payment_requests == 0 {
            return None;
        }
        let rate = self.payment_successes as f64 / self.payment_requests as f64 * 100.0;
        Some((rate * 10.0).round() / 10.0)
    }
}

pub struct Analytics {
    stats: Mutex<UsageStats>,
    storage: Option<Storage>,
}

impl Analytics {
    /// Counters that live only as long as the process
    pub fn in_memory() -> Self {
        Self {
            stats: Mutex::new(UsageStats::default()),
            storage: None,
        }
    }

    /// Counters persisted in the data directory; unreadable files start from zero
    pub fn open(storage: Storage) -> Self {
        let stats = if storage.has_snapshot(ANALYTICS_SNAPSHOT) {
            match storage.load_snapshot(ANALYTICS_SNAPSHOT) {
                Ok(stats) => stats,
                Err(e) => {
                    log::warn!("⚠️  Unable to read analytics snapshot, resetting: {}", e);
                    UsageStats::default()
                }
            }
        } else {
            UsageStats::default()
        };

        Self {
            stats: Mutex::new(stats),
            storage: Some(storage),
        }
    }

    pub fn snapshot(&self) -> UsageStats {
        self.stats.lock().clone()
    }

    pub fn record_tokens_spent(&self, count: u64) {
        self.update(|s| s.tokens_spent += count);
    }

    pub fn record_correction(&self) {
        self.update(|s| s.corrections_performed += 1);
    }

    pub fn record_payment_request(&self) {
        self.update(|s| s.payment_requests += 1);
    }

    pub fn record_payment_success(&self) {
        self.update(|s| s.payment_successes += 1);
    }

    pub fn record_payment_failure(&self) {
        self.update(|s| s.payment_failures += 1);
    }

    fn update(&self, f: impl FnOnce(&mut UsageStats)) {
        let mut stats = self.stats.lock();
        f(&mut stats);
        stats.last_updated = Utc::now();

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save_snapshot(ANALYTICS_SNAPSHOT, &*stats) {
                log::warn!("⚠️  Failed to save analytics: {}", e);
            }
        }
    }
}
