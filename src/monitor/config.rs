//! Monitor Configuration
//!
//! Single source of truth for every threshold and capacity the engine uses.
//! Defaults match the gate-pass validation contract; `strict()` and
//! `lenient()` are preset profiles for deployments that want tighter or
//! looser containment triggers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// DEFAULTS
// ============================================================================

const DEFAULT_KL_THRESHOLD: f64 = 0.5;
const DEFAULT_COLLAPSE_THRESHOLD: f64 = 0.10;
const DEFAULT_DRIFT_SIGMA_THRESHOLD: f64 = 2.0;
const DEFAULT_INFLATION_THRESHOLD: f64 = 0.02;
const DEFAULT_SLOPE_THRESHOLD: f64 = 0.9;
const DEFAULT_CONSENSUS_DELTA_THRESHOLD: f64 = 0.03;
const DEFAULT_MAX_AGE_DAYS: i64 = 90;

const DEFAULT_DRIFT_WINDOW: usize = 10_000;
const DEFAULT_CALIBRATION_WINDOW: usize = 5_000;
const DEFAULT_LATENT_MIN_SAMPLES: u64 = 11; // stats only when n > 10
const DEFAULT_CALIBRATION_MIN_SAMPLES: usize = 100;
const DEFAULT_ENTROPY_BINS: usize = 50;
const DEFAULT_CALIBRATION_BINS: usize = 10;
const DEFAULT_CALIBRATION_MIN_PER_BIN: usize = 10;
const DEFAULT_NUM_CLASSES: usize = 10;

const DATA_DIR_NAME: &str = "shadow-integrity";
const INCIDENT_DIR_NAME: &str = "incidents";

// ============================================================================
// CONFIG
// ============================================================================

/// Engine configuration. All trigger thresholds are strict (`value > t`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of prediction classes tracked by the entropy monitor.
    pub num_classes: usize,

    /// KL(current || baseline) above which the latent monitor alerts.
    pub kl_threshold: f64,

    /// Max per-class entropy collapse fraction before alerting.
    pub collapse_threshold: f64,

    /// Max per-dimension mean shift (baseline sigmas) before alerting.
    pub drift_sigma_threshold: f64,

    /// Rolling confidence inflation above which calibration alerts.
    pub inflation_threshold: f64,

    /// Monotonicity slope below which calibration alerts.
    pub slope_threshold: f64,

    /// Mean-confidence delta between heads that counts as an anomaly.
    pub consensus_delta_threshold: f64,

    /// Days since last full validation before the shadow path expires.
    pub max_age_days: i64,

    /// Sliding-window capacity for raw feature vectors.
    pub drift_window_capacity: usize,

    /// Sliding-window capacity for (confidence, correctness) pairs.
    pub calibration_window_capacity: usize,

    /// Latent stats stay zeroed until this many embeddings were seen.
    pub latent_min_samples: u64,

    /// Calibration stats stay zeroed until this many outcomes were seen.
    pub calibration_min_samples: usize,

    /// Confidence histogram resolution for the entropy monitor.
    pub entropy_bins: usize,

    /// Equal-width confidence bins used for the ECE computation.
    pub calibration_bins: usize,

    /// Minimum samples a calibration bin needs to qualify.
    pub calibration_min_per_bin: usize,

    /// Directory incident JSON files are written to (created on demand).
    pub incident_dir: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            num_classes: DEFAULT_NUM_CLASSES,
            kl_threshold: DEFAULT_KL_THRESHOLD,
            collapse_threshold: DEFAULT_COLLAPSE_THRESHOLD,
            drift_sigma_threshold: DEFAULT_DRIFT_SIGMA_THRESHOLD,
            inflation_threshold: DEFAULT_INFLATION_THRESHOLD,
            slope_threshold: DEFAULT_SLOPE_THRESHOLD,
            consensus_delta_threshold: DEFAULT_CONSENSUS_DELTA_THRESHOLD,
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            drift_window_capacity: DEFAULT_DRIFT_WINDOW,
            calibration_window_capacity: DEFAULT_CALIBRATION_WINDOW,
            latent_min_samples: DEFAULT_LATENT_MIN_SAMPLES,
            calibration_min_samples: DEFAULT_CALIBRATION_MIN_SAMPLES,
            entropy_bins: DEFAULT_ENTROPY_BINS,
            calibration_bins: DEFAULT_CALIBRATION_BINS,
            calibration_min_per_bin: DEFAULT_CALIBRATION_MIN_PER_BIN,
            incident_dir: default_incident_dir(),
        }
    }
}

impl MonitorConfig {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            ..Default::default()
        }
    }

    /// Tighter triggers: fires earlier on drift, collapse, and inflation.
    pub fn strict(num_classes: usize) -> Self {
        Self {
            num_classes,
            kl_threshold: 0.3,
            collapse_threshold: 0.05,
            drift_sigma_threshold: 1.5,
            inflation_threshold: 0.01,
            consensus_delta_threshold: 0.02,
            max_age_days: 30,
            ..Default::default()
        }
    }

    /// Looser triggers for noisy feature streams.
    pub fn lenient(num_classes: usize) -> Self {
        Self {
            num_classes,
            kl_threshold: 1.0,
            collapse_threshold: 0.20,
            drift_sigma_threshold: 3.0,
            inflation_threshold: 0.05,
            consensus_delta_threshold: 0.05,
            ..Default::default()
        }
    }
}

/// Default incident directory under the local app-data dir.
fn default_incident_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
        .join(INCIDENT_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = MonitorConfig::default();
        assert_eq!(config.drift_sigma_threshold, 2.0);
        assert_eq!(config.collapse_threshold, 0.10);
        assert_eq!(config.max_age_days, 90);
        assert_eq!(config.drift_window_capacity, 10_000);
        assert_eq!(config.calibration_window_capacity, 5_000);
    }

    #[test]
    fn test_strict_is_tighter_than_default() {
        let strict = MonitorConfig::strict(5);
        let default = MonitorConfig::default();
        assert!(strict.kl_threshold < default.kl_threshold);
        assert!(strict.drift_sigma_threshold < default.drift_sigma_threshold);
        assert_eq!(strict.num_classes, 5);
    }
}
