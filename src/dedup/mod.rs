//! Duplicate-signal suppression.
//!
//! Alerting integrations retry webhook deliveries aggressively, so the same
//! alert often lands several times within a second or two. The deduplicator
//! remembers the most recently admitted signal(s) and drops exact repeats that
//! arrive inside the admission window.
//!
//! The window is measured from the last *admitted* arrival. Suppressed
//! repeats never touch the record, so a burst of duplicates cannot keep
//! extending the window.

pub mod fingerprint;

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::config::DedupConfig;

pub use fingerprint::Fingerprint;

/// Outcome of checking a signal against the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupDecision {
    Admit,
    Suppress,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DedupRecord {
    pub fingerprint: Fingerprint,
    pub observed_at: DateTime<Utc>,
}

pub struct SignalDeduplicator {
    window: Duration,
    slots: usize,
    records: Mutex<VecDeque<DedupRecord>>,
}

impl SignalDeduplicator {
    /// `slots` is clamped to at least one.
    pub fn new(window: Duration, slots: usize) -> Self {
        let slots = slots.max(1);
        Self {
            window,
            slots,
            records: Mutex::new(VecDeque::with_capacity(slots)),
        }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.slots)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn evaluate(&self, payload: &Value, now: DateTime<Utc>) -> DedupDecision {
        self.evaluate_fingerprint(Fingerprint::of(payload), now)
    }

    /// Check-and-record under a single lock so concurrent identical signals
    /// cannot both be admitted.
    pub fn evaluate_fingerprint(&self, fingerprint: Fingerprint, now: DateTime<Utc>) -> DedupDecision {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        let repeat = records
            .iter()
            .any(|r| r.fingerprint == fingerprint && self.within_window(r.observed_at, now));

        if repeat {
            debug!("🛡️ [DEDUP] Suppressed repeat of {}", fingerprint);
            return DedupDecision::Suppress;
        }

        // A stale entry for the same fingerprint is replaced, not duplicated.
        records.retain(|r| r.fingerprint != fingerprint);
        records.push_back(DedupRecord {
            fingerprint,
            observed_at: now,
        });
        while records.len() > self.slots {
            records.pop_front();
        }

        DedupDecision::Admit
    }

    /// Snapshot of the most recent admission, if any.
    pub fn last_admitted(&self) -> Option<DedupRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.back().cloned()
    }

    /// Half-open: exactly `window` after the admission is already outside.
    /// A clock that stepped backwards counts as inside.
    fn within_window(&self, observed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(observed_at).to_std() {
            Ok(elapsed) => elapsed < self.window,
            Err(_) => true,
        }
    }
}

impl Default for SignalDeduplicator {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(crate::constants::dedup::DEFAULT_WINDOW_SECS),
            crate::constants::dedup::DEFAULT_SLOTS,
        )
    }
}
