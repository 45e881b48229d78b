//! Integrity Monitor - orchestrator wiring every monitor together.
//!
//! One `IntegrityMonitor` instance watches one inference stream. The serving
//! layer installs baselines once from gate-pass validation data, records
//! every shadow decision as it happens, and polls `check_health` to get a
//! consolidated snapshot - which is also the point where containment
//! triggers are evaluated and incidents are persisted.
//!
//! # Architecture
//! - `ledger.rs`: tamper-evident decision hash chain
//! - `latent.rs` / `entropy.rs` / `drift.rs` / `calibration.rs`: streaming
//!   statistical monitors, each with its own cold-start guard
//! - `consensus.rs`: out-of-band live-vs-snapshot comparison
//! - `aging.rs` / `containment.rs`: validation age + the one-way lock
//!
//! # Failure Strategy
//! Statistical monitors never raise - insufficient data yields neutral
//! stats. Ledger tamper surfaces in the snapshot as `ledger_valid == false`
//! and is a hard security event for the caller. Incident-persistence
//! failures propagate as errors *after* the in-memory lock is applied.

pub mod aging;
pub mod calibration;
pub mod config;
pub mod consensus;
pub mod containment;
pub mod drift;
pub mod entropy;
pub mod latent;
pub mod ledger;
pub mod types;
pub mod window;


use chrono::Utc;
use serde::{Deserialize, Serialize};

use aging::AgingGuard;
use calibration::{CalibrationGuard, CalibrationStats};
use config::MonitorConfig;
use consensus::{ConsensusChecker, ConsensusStats};
use containment::{ContainmentController, ContainmentError};
use drift::{DriftDetector, DriftStats};
use entropy::{EntropyMonitor, EntropyStats};
use latent::{LatentSpaceMonitor, LatentStats};
use ledger::DecisionLedger;
use types::{ContainmentMode, DecisionRecord, IncidentRecord};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum MonitorError {
    /// Baseline installation rejected (empty or mismatched validation data).
    BaselineInput(String),

    /// Containment fired but the incident write failed; the lock is applied.
    Containment(ContainmentError),
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BaselineInput(e) => write!(f, "Baseline input error: {}", e),
            Self::Containment(e) => write!(f, "Containment error: {}", e),
        }
    }
}

impl std::error::Error for MonitorError {}

impl From<ContainmentError> for MonitorError {
    fn from(e: ContainmentError) -> Self {
        Self::Containment(e)
    }
}

// ============================================================================
// HEALTH SNAPSHOT
// ============================================================================

/// Point-in-time aggregate returned by `check_health`. Recomputed on every
/// call, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub timestamp: i64,
    pub decision_count: u64,
    pub ledger_length: usize,
    pub ledger_valid: bool,
    pub current_chain_hash: String,
    pub latent: LatentStats,
    pub drift: DriftStats,
    pub entropy: EntropyStats,
    pub calibration: CalibrationStats,
    pub days_since_validation: i64,
    pub validation_expired: bool,
    pub baseline_fingerprint: Option<u32>,
    pub mode: ContainmentMode,
    pub locked: bool,
    pub containment_fired: bool,
    pub incident_count: usize,
}

// ============================================================================
// INTEGRITY MONITOR
// ============================================================================

/// Owns one instance of every monitor plus the containment controller.
///
/// Not internally synchronized: share one instance per worker, or wrap
/// calls in caller-held mutual exclusion.
pub struct IntegrityMonitor {
    config: MonitorConfig,
    ledger: DecisionLedger,
    latent: LatentSpaceMonitor,
    entropy: EntropyMonitor,
    drift: DriftDetector,
    calibration: CalibrationGuard,
    consensus: ConsensusChecker,
    aging: AgingGuard,
    containment: ContainmentController,
    decision_count: u64,
    baseline_fingerprint: Option<u32>,
}

impl IntegrityMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            ledger: DecisionLedger::new(),
            latent: LatentSpaceMonitor::new(config.kl_threshold, config.latent_min_samples),
            entropy: EntropyMonitor::new(
                config.num_classes,
                config.entropy_bins,
                config.collapse_threshold,
            ),
            drift: DriftDetector::new(config.drift_window_capacity, config.drift_sigma_threshold),
            calibration: CalibrationGuard::new(
                config.calibration_window_capacity,
                config.calibration_min_samples,
                config.calibration_bins,
                config.calibration_min_per_bin,
                config.inflation_threshold,
                config.slope_threshold,
            ),
            consensus: ConsensusChecker::new(config.consensus_delta_threshold),
            aging: AgingGuard::new(config.max_age_days),
            containment: ContainmentController::new(&config),
            decision_count: 0,
            baseline_fingerprint: None,
            config,
        }
    }

    /// Install baselines from gate-pass validation data and stamp the
    /// validation time. `features`, `labels`, and `confidences` are
    /// row-aligned.
    pub fn set_baselines(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        confidences: &[f64],
    ) -> Result<(), MonitorError> {
        if features.is_empty() {
            return Err(MonitorError::BaselineInput(
                "validation feature set is empty".to_string(),
            ));
        }
        if labels.len() != features.len() || confidences.len() != features.len() {
            return Err(MonitorError::BaselineInput(format!(
                "row mismatch: {} features, {} labels, {} confidences",
                features.len(),
                labels.len(),
                confidences.len()
            )));
        }

        let dim = features[0].len();
        if features.iter().any(|row| row.len() != dim) {
            return Err(MonitorError::BaselineInput(
                "validation feature rows have inconsistent dimensions".to_string(),
            ));
        }

        let (mean, variance) = mean_and_variance(features, dim);
        let std: Vec<f64> = variance.iter().map(|v| v.sqrt()).collect();

        self.latent.set_baseline(mean.clone(), variance.clone());
        self.drift.set_baseline(mean.clone(), std);

        // Derive the per-class entropy baseline by feeding the validation
        // predictions through the entropy monitor, then clearing its counts.
        for (&label, &confidence) in labels.iter().zip(confidences.iter()) {
            self.entropy.record(label, confidence);
        }
        let baseline_entropy = self.entropy.stats().per_class_entropy;
        self.entropy.set_baseline(baseline_entropy);
        self.entropy.reset();

        self.aging.record_validation();

        let fingerprint = baseline_fingerprint(&mean, &variance);
        self.baseline_fingerprint = Some(fingerprint);
        log::info!(
            "Baselines installed: dim={}, rows={}, fingerprint={:08x}",
            dim,
            features.len(),
            fingerprint
        );

        Ok(())
    }

    /// Record one shadow-path inference. Fans out to the ledger and every
    /// streaming monitor; the calibration guard only sees decisions whose
    /// ground truth is already known.
    pub fn record_decision(
        &mut self,
        features: &[f64],
        logits: &[f64],
        temperature: f64,
        predicted_class: usize,
        confidence: f64,
        correct: Option<bool>,
    ) -> DecisionRecord {
        let record = self
            .ledger
            .record(features, logits, temperature, predicted_class, confidence);

        self.latent.update(features);
        self.entropy.record(predicted_class, confidence);
        self.drift.add(features);
        if let Some(correct) = correct {
            self.calibration.record(confidence, correct);
        }

        self.decision_count += 1;
        record
    }

    /// Evaluate all containment triggers and return a consolidated
    /// snapshot. Consensus statistics are not wired in by default; use
    /// `check_health_with_consensus` to supply an out-of-band batch result.
    pub fn check_health(&mut self) -> Result<HealthSnapshot, MonitorError> {
        self.check_health_with_consensus(None)
    }

    pub fn check_health_with_consensus(
        &mut self,
        consensus: Option<&ConsensusStats>,
    ) -> Result<HealthSnapshot, MonitorError> {
        let latent = self.latent.stats();
        let drift = self.drift.stats();
        let entropy = self.entropy.stats();
        let calibration = self.calibration.stats();
        let days_since_validation = self.aging.days_since_validation();

        let ledger_valid = self.ledger.verify();
        if !ledger_valid {
            log::error!("Decision ledger verification FAILED: stored records were tampered with");
        }

        let containment_fired =
            self.containment
                .check_all(&drift, &entropy, &calibration, consensus, days_since_validation)?;

        Ok(HealthSnapshot {
            timestamp: Utc::now().timestamp(),
            decision_count: self.decision_count,
            ledger_length: self.ledger.len(),
            ledger_valid,
            current_chain_hash: self.ledger.current_hash(),
            latent,
            drift,
            entropy,
            calibration,
            days_since_validation,
            validation_expired: self.aging.is_expired(),
            baseline_fingerprint: self.baseline_fingerprint,
            mode: self.containment.current_mode(),
            locked: self.containment.is_locked(),
            containment_fired,
            incident_count: self.containment.incident_count(),
        })
    }

    // ------------------------------------------------------------------
    // Pass-throughs
    // ------------------------------------------------------------------

    /// Enable the shadow path (advisory only). No-op once locked.
    pub fn enable_shadow(&mut self) -> bool {
        self.containment.enable_shadow()
    }

    pub fn current_mode(&self) -> ContainmentMode {
        self.containment.current_mode()
    }

    pub fn is_locked(&self) -> bool {
        self.containment.is_locked()
    }

    pub fn incidents(&self) -> &[IncidentRecord] {
        self.containment.incidents()
    }

    pub fn ledger(&self) -> &DecisionLedger {
        &self.ledger
    }

    /// The consensus checker is caller-driven: feed it paired batches from
    /// the live and frozen heads, then pass its stats to
    /// `check_health_with_consensus`.
    pub fn consensus_mut(&mut self) -> &mut ConsensusChecker {
        &mut self.consensus
    }

    pub fn decision_count(&self) -> u64 {
        self.decision_count
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Test isolation only; never called from request handling.
    pub fn reset(&mut self) {
        self.ledger.reset();
        self.latent.reset();
        self.entropy.reset();
        self.drift.reset();
        self.calibration.reset();
        self.consensus.reset();
        self.aging.reset();
        self.containment.reset();
        self.decision_count = 0;
        self.baseline_fingerprint = None;
    }
}

/// Two-pass mean and sample variance over row-aligned feature vectors.
fn mean_and_variance(features: &[Vec<f64>], dim: usize) -> (Vec<f64>, Vec<f64>) {
    let n = features.len() as f64;

    let mut mean = vec![0.0; dim];
    for row in features {
        for (m, x) in mean.iter_mut().zip(row.iter()) {
            *m += x;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let denom = (features.len().saturating_sub(1)).max(1) as f64;
    let mut variance = vec![0.0; dim];
    for row in features {
        for (v, (x, m)) in variance.iter_mut().zip(row.iter().zip(mean.iter())) {
            *v += (x - m).powi(2);
        }
    }
    variance.iter_mut().for_each(|v| *v /= denom);

    (mean, variance)
}

/// CRC32 over the installed baseline bytes, so operators can confirm which
/// validation data a running monitor was armed with.
fn baseline_fingerprint(mean: &[f64], variance: &[f64]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for m in mean {
        hasher.update(&m.to_le_bytes());
    }
    for v in variance {
        hasher.update(&v.to_le_bytes());
    }
    hasher.finalize()
}
