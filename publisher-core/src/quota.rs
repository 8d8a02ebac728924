//! API key rotation and cooldown tracking.
//!
//! Keys are used round-robin. A key that hits its quota is put on a
//! cooldown; the cooldown is cleared lazily the next time availability
//! is checked after it has elapsed. Nothing runs in the background.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors related to quota tracking
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("API key pool is empty")]
    EmptyPool,
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Per-key exhaustion record
#[derive(Debug, Clone, Default)]
struct KeyState {
    exhausted_until: Option<DateTime<Utc>>,
    failure_count: u32,
}

/// Tracks which API keys are usable and rotates among them
pub struct QuotaTracker {
    keys: Vec<String>,
    cursor: usize,
    states: HashMap<String, KeyState>,
    cooldown: Duration,
    clock: Box<dyn Clock>,
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("keys", &self.keys.len())
            .field("cursor", &self.cursor)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}

impl QuotaTracker {
    /// Default time an exhausted key stays out of rotation
    pub const DEFAULT_COOLDOWN_SECS: i64 = 3600;

    /// Create a tracker over a non-empty key pool using the wall clock
    pub fn new(keys: Vec<String>) -> Result<Self, QuotaError> {
        Self::with_clock(keys, SystemClock)
    }

    /// Create a tracker with an explicit clock
    pub fn with_clock(keys: Vec<String>, clock: impl Clock + 'static) -> Result<Self, QuotaError> {
        if keys.is_empty() {
            return Err(QuotaError::EmptyPool);
        }

        debug!("Quota tracker initialized with {} keys", keys.len());

        Ok(Self {
            keys,
            cursor: 0,
            states: HashMap::new(),
            cooldown: Duration::seconds(Self::DEFAULT_COOLDOWN_SECS),
            clock: Box::new(clock),
        })
    }

    /// Override the cooldown period
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key at the rotation cursor
    pub fn current(&self) -> &str {
        &self.keys[self.cursor]
    }

    /// Advance the cursor by one, wrapping around. The new key may itself
    /// be on cooldown; callers check availability separately.
    pub fn rotate(&mut self) -> &str {
        self.cursor = (self.cursor + 1) % self.keys.len();
        debug!("Rotated to key #{}", self.cursor);
        &self.keys[self.cursor]
    }

    /// Rotate until an available key is found, trying each key at most once.
    /// Returns `None` when a full cycle finds nothing usable.
    pub fn rotate_to_available(&mut self) -> Option<String> {
        for _ in 0..self.keys.len() {
            let key = self.rotate().to_string();
            if self.is_available(&key) {
                return Some(key);
            }
        }

        warn!("All {} API keys are on cooldown", self.keys.len());
        None
    }

    /// Put a key on cooldown and bump its failure counter
    pub fn mark_exhausted(&mut self, key: &str) {
        let until = self
            .clock
            .now()
            .checked_add_signed(self.cooldown)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let position = self.position(key);
        let state = self.states.entry(key.to_string()).or_default();
        state.exhausted_until = Some(until);
        state.failure_count += 1;

        info!(
            "API key {:?} exhausted until {} (failures: {})",
            position,
            until.to_rfc3339(),
            state.failure_count
        );
    }

    /// Whether a key may be used now. An elapsed cooldown is cleared here.
    pub fn is_available(&mut self, key: &str) -> bool {
        let now = self.clock.now();
        let Some(state) = self.states.get_mut(key) else {
            return true;
        };

        match state.exhausted_until {
            Some(until) if now <= until => false,
            Some(_) => {
                state.exhausted_until = None;
                debug!("Cooldown elapsed, API key back in rotation");
                true
            }
            None => true,
        }
    }

    /// Number of keys usable right now
    pub fn available_count(&mut self) -> usize {
        let keys = self.keys.clone();
        keys.iter().filter(|key| self.is_available(key)).count()
    }

    /// Times a key has been marked exhausted. Kept for reporting only.
    pub fn failure_count(&self, key: &str) -> u32 {
        self.states.get(key).map_or(0, |s| s.failure_count)
    }

    /// Index of a key in the rotation order
    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("key-{}", i)).collect()
    }

    fn manual_clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert!(matches!(
            QuotaTracker::new(Vec::new()),
            Err(QuotaError::EmptyPool)
        ));
    }

    #[test]
    fn test_rotation_wraps_around() {
        for n in 1..=4 {
            let mut tracker = QuotaTracker::new(keys(n)).unwrap();
            let start = tracker.current().to_string();
            for _ in 0..n {
                tracker.rotate();
            }
            assert_eq!(tracker.current(), start);
        }
    }

    #[test]
    fn test_rotation_order() {
        let mut tracker = QuotaTracker::new(keys(3)).unwrap();
        assert_eq!(tracker.current(), "key-0");
        assert_eq!(tracker.rotate(), "key-1");
        assert_eq!(tracker.rotate(), "key-2");
        assert_eq!(tracker.rotate(), "key-0");
    }

    #[test]
    fn test_exhausted_key_recovers_after_cooldown() {
        let clock = manual_clock();
        let mut tracker = QuotaTracker::with_clock(keys(2), clock.clone()).unwrap();

        assert!(tracker.is_available("key-0"));
        tracker.mark_exhausted("key-0");
        assert!(!tracker.is_available("key-0"));

        clock.advance(Duration::minutes(59));
        assert!(!tracker.is_available("key-0"));

        // Exactly at the deadline the key is still on cooldown
        clock.advance(Duration::minutes(1));
        assert!(!tracker.is_available("key-0"));

        clock.advance(Duration::seconds(1));
        assert!(tracker.is_available("key-0"));
        assert_eq!(tracker.available_count(), 2);
    }

    #[test]
    fn test_failure_count_survives_recovery() {
        let clock = manual_clock();
        let mut tracker = QuotaTracker::with_clock(keys(1), clock.clone()).unwrap();

        tracker.mark_exhausted("key-0");
        clock.advance(Duration::hours(2));
        assert!(tracker.is_available("key-0"));
        tracker.mark_exhausted("key-0");

        assert_eq!(tracker.failure_count("key-0"), 2);
        assert_eq!(tracker.failure_count("unknown"), 0);
    }

    #[test]
    fn test_exhaustion_independent_of_rotation() {
        let mut tracker = QuotaTracker::new(keys(2)).unwrap();
        tracker.mark_exhausted("key-1");
        assert_eq!(tracker.rotate(), "key-1");
        assert!(!tracker.is_available("key-1"));
    }

    #[test]
    fn test_rotate_to_available_skips_exhausted() {
        let mut tracker = QuotaTracker::new(keys(3)).unwrap();
        tracker.mark_exhausted("key-1");
        assert_eq!(tracker.rotate_to_available().as_deref(), Some("key-2"));
        assert_eq!(tracker.current(), "key-2");
        assert_eq!(tracker.available_count(), 2);
    }

    #[test]
    fn test_rotate_to_available_full_cycle() {
        let mut tracker = QuotaTracker::new(keys(2)).unwrap();
        tracker.mark_exhausted("key-0");
        tracker.mark_exhausted("key-1");
        assert_eq!(tracker.rotate_to_available(), None);
        // Cursor is back where it started
        assert_eq!(tracker.current(), "key-0");
        assert_eq!(tracker.available_count(), 0);
    }

    #[test]
    fn test_oversized_cooldown_saturates() {
        let clock = manual_clock();
        let mut tracker = QuotaTracker::with_clock(keys(1), clock.clone())
            .unwrap()
            .with_cooldown(Duration::try_days(100_000_000).unwrap());

        tracker.mark_exhausted("key-0");
        assert!(!tracker.is_available("key-0"));
        assert_eq!(tracker.failure_count("key-0"), 1);
    }

    #[test]
    fn test_custom_cooldown() {
        let clock = manual_clock();
        let mut tracker = QuotaTracker::with_clock(keys(1), clock.clone())
            .unwrap()
            .with_cooldown(Duration::seconds(30));

        tracker.mark_exhausted("key-0");
        clock.advance(Duration::seconds(31));
        assert!(tracker.is_available("key-0"));
    }
}
