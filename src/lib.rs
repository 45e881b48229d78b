//! Shadow-Path Integrity Monitor - Containment Core
//!
//! Inference-time integrity engine for a dual-mode model deployment: a
//! trusted primary path (MODE_A) and a shadow candidate path (MODE_B) that
//! runs alongside it with no authority to act. The engine watches streaming
//! statistics over live shadow predictions and decides, continuously,
//! whether the shadow path is still behaviorally safe to keep enabled. When
//! it is not, containment is irreversible within this crate: the shadow path
//! is disabled, the lock is sticky, and a signed incident record is durably
//! persisted.
//!
//! ## Architecture
//! - `monitor::ledger` - tamper-evident hash chain of shadow decisions
//! - `monitor::latent` - online embedding mean/variance + KL divergence
//! - `monitor::entropy` - per-class confidence entropy, collapse detection
//! - `monitor::drift` - sliding-window mean-shift over raw features
//! - `monitor::calibration` - rolling ECE, inflation, monotonicity
//! - `monitor::consensus` - live vs frozen-snapshot divergence
//! - `monitor::aging` - time-since-validation tracking
//! - `monitor::containment` - mode state machine + incident persistence
//! - `monitor::IntegrityMonitor` - orchestrator owning all of the above
//!
//! Every operation is synchronous and single-threaded; callers that share an
//! `IntegrityMonitor` across threads must serialize access themselves.

pub mod monitor;

pub use monitor::config::MonitorConfig;
pub use monitor::types::{ContainmentMode, DecisionRecord, IncidentRecord};
pub use monitor::{HealthSnapshot, IntegrityMonitor, MonitorError};
