//! Containment Controller - mode state machine + incident persistence.
//!
//! Owns the shadow path's deployment mode and the one-way containment lock.
//! Every fired trigger appends a signed `IncidentRecord` and persists it as
//! its own JSON file. The lock is applied to in-memory state *before* the
//! durable write is attempted, so a failed write can only ever mean "locked
//! but evidence may be incomplete" - never "evidence written but not
//! locked". Unlocking is an out-of-band administrative action that this
//! engine deliberately does not implement.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};

use super::calibration::CalibrationStats;
use super::config::MonitorConfig;
use super::consensus::ConsensusStats;
use super::drift::DriftStats;
use super::entropy::EntropyStats;
use super::types::{ContainmentMode, IncidentRecord};

// ============================================================================
// TRIGGER NAMES
// ============================================================================

pub const TRIGGER_DRIFT: &str = "DRIFT_SPIKE";
pub const TRIGGER_ENTROPY: &str = "ENTROPY_COLLAPSE";
pub const TRIGGER_CALIBRATION: &str = "CALIBRATION_FAILURE";
pub const TRIGGER_CONSENSUS: &str = "CONSENSUS_DIVERGENCE";
pub const TRIGGER_AGING: &str = "VALIDATION_EXPIRED";

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Containment fault. `IncidentWrite` is returned *after* the in-memory
/// lock has been applied: the state is contained, the durable evidence for
/// the named incident may be incomplete.
#[derive(Debug, Clone)]
pub enum ContainmentError {
    IncidentWrite { incident_id: u64, source: String },
}

impl std::fmt::Display for ContainmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncidentWrite {
                incident_id,
                source,
            } => write!(
                f,
                "Incident {} write failed (lock already applied): {}",
                incident_id, source
            ),
        }
    }
}

impl std::error::Error for ContainmentError {}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct ContainmentController {
    mode: ContainmentMode,
    locked: bool,
    incidents: Vec<IncidentRecord>,
    next_incident_id: u64,
    incident_dir: PathBuf,
    drift_sigma_threshold: f64,
    collapse_threshold: f64,
    consensus_delta_threshold: f64,
    max_age_days: i64,
}

impl ContainmentController {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            mode: ContainmentMode::ModeAOnly,
            locked: false,
            incidents: Vec::new(),
            next_incident_id: 0,
            incident_dir: config.incident_dir.clone(),
            drift_sigma_threshold: config.drift_sigma_threshold,
            collapse_threshold: config.collapse_threshold,
            consensus_delta_threshold: config.consensus_delta_threshold,
            max_age_days: config.max_age_days,
        }
    }

    /// Enable the shadow path in advisory-only mode. No-op once locked.
    pub fn enable_shadow(&mut self) -> bool {
        if self.locked {
            log::warn!("enable_shadow ignored: containment lock is set");
            return false;
        }
        self.mode = ContainmentMode::ModeBShadow;
        log::info!("Shadow path enabled (MODE_B_SHADOW, advisory only)");
        true
    }

    /// Fire a containment trigger if `value > threshold`.
    ///
    /// On fire: the mode value is set to `MODE_A_ONLY` and the sticky lock
    /// is raised (the `CONTAINMENT` mode name is intentionally never
    /// installed - see `ContainmentMode`), the signed incident is appended,
    /// and only then is the durable write attempted. Returns whether the
    /// trigger fired; an `Err` also means it fired.
    pub fn contain(
        &mut self,
        trigger: &str,
        value: f64,
        threshold: f64,
        description: &str,
    ) -> Result<bool, ContainmentError> {
        if value <= threshold {
            return Ok(false);
        }

        let previous_mode = self.mode;
        self.mode = ContainmentMode::ModeAOnly;
        self.locked = true;

        let timestamp = Utc::now().timestamp();
        let incident = IncidentRecord {
            incident_id: self.next_incident_id,
            timestamp,
            trigger: trigger.to_string(),
            previous_mode,
            new_mode: self.mode,
            trigger_value: value,
            threshold,
            description: description.to_string(),
            signature: sign_incident(trigger, value, threshold, timestamp),
        };
        self.next_incident_id += 1;

        log::error!(
            "CONTAINMENT: {} fired (value {:.4} > threshold {:.4}); shadow path locked. {}",
            trigger,
            value,
            threshold,
            description
        );

        self.incidents.push(incident.clone());
        self.persist_incident(&incident)?;
        Ok(true)
    }

    /// Evaluate every trigger, never short-circuiting, so simultaneous
    /// faults each leave their own incident. Returns whether any fired; a
    /// persistence error is reported only after all triggers have run.
    pub fn check_all(
        &mut self,
        drift: &DriftStats,
        entropy: &EntropyStats,
        calibration: &CalibrationStats,
        consensus: Option<&ConsensusStats>,
        days_since_validation: i64,
    ) -> Result<bool, ContainmentError> {
        let mut fired = false;
        let mut first_err: Option<ContainmentError> = None;

        let mut note = |result: Result<bool, ContainmentError>| match result {
            Ok(f) => fired |= f,
            Err(e) => {
                fired = true;
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        };

        note(self.contain(
            TRIGGER_DRIFT,
            drift.max_shift_sigma,
            self.drift_sigma_threshold,
            &format!(
                "Max per-dimension feature drift {:.3} sigma (dim {:?}, window {})",
                drift.max_shift_sigma, drift.max_shift_dim, drift.window_len
            ),
        ));

        note(self.contain(
            TRIGGER_ENTROPY,
            entropy.max_collapse_pct,
            self.collapse_threshold,
            &format!(
                "Confidence entropy collapsed {:.1}% vs baseline (class {:?})",
                entropy.max_collapse_pct * 100.0,
                entropy.collapsed_class
            ),
        ));

        if calibration.should_disable {
            // Boolean trigger mapped onto the generic value > threshold
            // contract; the description carries the detail.
            note(self.contain(
                TRIGGER_CALIBRATION,
                1.0,
                0.0,
                &format!(
                    "Calibration failed: inflation {:.4}, monotonicity slope {:.4}",
                    calibration.rolling_inflation, calibration.monotonicity_slope
                ),
            ));
        }

        if let Some(consensus) = consensus {
            note(self.contain(
                TRIGGER_CONSENSUS,
                consensus.mean_delta,
                self.consensus_delta_threshold,
                &format!(
                    "Live vs snapshot mean confidence delta {:.4} (agreement {:.3})",
                    consensus.mean_delta, consensus.agreement_rate
                ),
            ));
        }

        note(self.contain(
            TRIGGER_AGING,
            days_since_validation as f64,
            self.max_age_days as f64,
            &format!(
                "Shadow path not re-validated for {} days (max {})",
                days_since_validation, self.max_age_days
            ),
        ));

        match first_err {
            Some(e) => Err(e),
            None => Ok(fired),
        }
    }

    pub fn current_mode(&self) -> ContainmentMode {
        self.mode
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn incidents(&self) -> &[IncidentRecord] {
        &self.incidents
    }

    pub fn incident_count(&self) -> usize {
        self.incidents.len()
    }

    pub fn incident_dir(&self) -> &Path {
        &self.incident_dir
    }

    /// Test isolation only. Does not touch persisted incident files and is
    /// never a lock-release path for production code.
    pub fn reset(&mut self) {
        self.mode = ContainmentMode::ModeAOnly;
        self.locked = false;
        self.incidents.clear();
        self.next_incident_id = 0;
    }

    fn persist_incident(&self, incident: &IncidentRecord) -> Result<(), ContainmentError> {
        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&self.incident_dir)?;
            let path = self
                .incident_dir
                .join(format!("incident_{:04}.json", incident.incident_id));
            let json = serde_json::to_string_pretty(incident)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            fs::write(&path, json)?;
            log::info!("Incident persisted: {:?}", path);
            Ok(())
        };

        write().map_err(|e| {
            log::error!(
                "Failed to persist incident {}: {} (lock already applied)",
                incident.incident_id,
                e
            );
            ContainmentError::IncidentWrite {
                incident_id: incident.incident_id,
                source: e.to_string(),
            }
        })
    }
}

/// Deterministic signature over {trigger, value, threshold, timestamp}.
fn sign_incident(trigger: &str, value: f64, threshold: f64, timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(trigger.as_bytes());
    hasher.update(value.to_le_bytes());
    hasher.update(threshold.to_le_bytes());
    hasher.update(timestamp.to_le_bytes());
    hex::encode(hasher.finalize())
}
