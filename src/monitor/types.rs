//! Shared record types for the integrity monitor.
//!
//! `DecisionRecord` is owned exclusively by the ledger, `IncidentRecord` by
//! the containment controller. Both are append-only: once created they are
//! never mutated by production code.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONTAINMENT MODE
// ============================================================================

/// Active deployment mode for the shadow path.
///
/// Note on `Containment`: the mode is defined as a distinct name, but
/// `contain()` deliberately installs `ModeAOnly` plus the independent sticky
/// `locked` flag instead of this variant. Downstream consumers read the mode
/// field as `MODE_A_ONLY` during containment; the lock flag carries the real
/// containment meaning. This mirrors the deployed behavior and is kept
/// as-is rather than "fixed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainmentMode {
    #[serde(rename = "MODE_A_ONLY")]
    ModeAOnly,
    #[serde(rename = "MODE_B_SHADOW")]
    ModeBShadow,
    #[serde(rename = "CONTAINMENT")]
    Containment,
}

impl ContainmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainmentMode::ModeAOnly => "MODE_A_ONLY",
            ContainmentMode::ModeBShadow => "MODE_B_SHADOW",
            ContainmentMode::Containment => "CONTAINMENT",
        }
    }
}

impl std::fmt::Display for ContainmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DECISION RECORD
// ============================================================================

/// One shadow-path decision, chained into the tamper-evident ledger.
///
/// `decision_hash` covers the inference inputs (features, logits,
/// temperature); `chain_hash` binds the record to everything recorded before
/// it. Neither hash is ever recomputed from mutable state after append.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub sequence_id: u64,
    pub timestamp: i64,
    pub decision_hash: [u8; 32],
    pub chain_hash: [u8; 32],
    pub predicted_class: usize,
    pub confidence: f64,
    pub temperature: f64,
}

impl DecisionRecord {
    pub fn decision_hash_hex(&self) -> String {
        hex::encode(self.decision_hash)
    }

    pub fn chain_hash_hex(&self) -> String {
        hex::encode(self.chain_hash)
    }
}

// ============================================================================
// INCIDENT RECORD
// ============================================================================

/// Durable evidence for one fired containment trigger.
///
/// Serialized as pretty JSON to `incident_{id:04}.json` in the configured
/// incident directory. `signature` is a deterministic SHA-256 over
/// {trigger, value, threshold, timestamp} so a record can be checked for
/// after-the-fact edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub incident_id: u64,
    pub timestamp: i64,
    pub trigger: String,
    pub previous_mode: ContainmentMode,
    pub new_mode: ContainmentMode,
    pub trigger_value: f64,
    pub threshold: f64,
    pub description: String,
    pub signature: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serialization_names() {
        assert_eq!(
            serde_json::to_string(&ContainmentMode::ModeAOnly).unwrap(),
            "\"MODE_A_ONLY\""
        );
        assert_eq!(
            serde_json::to_string(&ContainmentMode::ModeBShadow).unwrap(),
            "\"MODE_B_SHADOW\""
        );
        assert_eq!(
            serde_json::to_string(&ContainmentMode::Containment).unwrap(),
            "\"CONTAINMENT\""
        );
    }

    #[test]
    fn test_mode_display_matches_serde() {
        assert_eq!(ContainmentMode::ModeAOnly.to_string(), "MODE_A_ONLY");
        assert_eq!(ContainmentMode::Containment.to_string(), "CONTAINMENT");
    }
}
