//! Aging Guard - elapsed time since the last full validation.
//!
//! A shadow path that has not been re-validated within the configured
//! horizon is no longer trusted, regardless of how healthy its live
//! statistics look. A guard that has never seen a validation reports the
//! sentinel and is expired immediately.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Sentinel for "never validated": far exceeds any real threshold.
pub const NEVER_VALIDATED_DAYS: i64 = i64::MAX;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgingGuard {
    last_validation: Option<i64>,
    max_age_days: i64,
}

impl AgingGuard {
    pub fn new(max_age_days: i64) -> Self {
        Self {
            last_validation: None,
            max_age_days,
        }
    }

    /// Stamp a completed full validation at "now".
    pub fn record_validation(&mut self) {
        let now = Utc::now().timestamp();
        self.last_validation = Some(now);
        log::info!("Validation recorded at {} (max age {} days)", now, self.max_age_days);
    }

    /// Whole days since the last validation, or the sentinel if none.
    pub fn days_since_validation(&self) -> i64 {
        match self.last_validation {
            Some(ts) => (Utc::now().timestamp() - ts) / SECONDS_PER_DAY,
            None => NEVER_VALIDATED_DAYS,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.days_since_validation() > self.max_age_days
    }

    pub fn last_validation(&self) -> Option<i64> {
        self.last_validation
    }

    /// Test isolation only.
    pub fn reset(&mut self) {
        self.last_validation = None;
    }

    #[cfg(test)]
    fn backdate(&mut self, timestamp: i64) {
        self.last_validation = Some(timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_validated_is_expired_immediately() {
        let guard = AgingGuard::new(90);
        assert_eq!(guard.days_since_validation(), NEVER_VALIDATED_DAYS);
        assert!(guard.is_expired());
    }

    #[test]
    fn test_fresh_validation_is_not_expired() {
        let mut guard = AgingGuard::new(90);
        guard.record_validation();
        assert_eq!(guard.days_since_validation(), 0);
        assert!(!guard.is_expired());
    }

    #[test]
    fn test_old_validation_expires() {
        let mut guard = AgingGuard::new(90);
        guard.backdate(Utc::now().timestamp() - 91 * SECONDS_PER_DAY);
        assert_eq!(guard.days_since_validation(), 91);
        assert!(guard.is_expired());
    }

    #[test]
    fn test_threshold_edge_is_strict() {
        let mut guard = AgingGuard::new(90);
        guard.backdate(Utc::now().timestamp() - 90 * SECONDS_PER_DAY);
        // Exactly 90 days does not expire; strictly more does.
        assert_eq!(guard.days_since_validation(), 90);
        assert!(!guard.is_expired());
    }

    #[test]
    fn test_reset_returns_to_sentinel() {
        let mut guard = AgingGuard::new(90);
        guard.record_validation();
        guard.reset();
        assert!(guard.is_expired());
    }
}
