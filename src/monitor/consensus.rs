//! Consensus Checker - live head vs frozen validated snapshot.
//!
//! Both heads are evaluated on the same inputs by the serving layer; this
//! checker only compares the resulting confidence-vector batches. A
//! divergence, once observed, stays a standing concern: the anomaly counter
//! is cumulative and only an explicit reset clears it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsensusStats {
    pub sample_count: usize,
    pub mean_confidence_live: f64,
    pub mean_confidence_snapshot: f64,
    pub mean_delta: f64,
    pub agreement_rate: f64,
    pub anomaly: bool,
}

pub struct ConsensusChecker {
    delta_threshold: f64,
    anomaly_count: u64,
    history: Vec<ConsensusStats>,
}

impl ConsensusChecker {
    pub fn new(delta_threshold: f64) -> Self {
        Self {
            delta_threshold,
            anomaly_count: 0,
            history: Vec::new(),
        }
    }

    /// Compare one batch of paired confidence vectors. Mean confidence per
    /// head is the mean of each sample's arg-max (predicted-class)
    /// confidence; agreement is the fraction of samples where both heads
    /// pick the same class.
    pub fn check(&mut self, live: &[Vec<f64>], snapshot: &[Vec<f64>]) -> ConsensusStats {
        let pairs = live.len().min(snapshot.len());
        if live.len() != snapshot.len() {
            log::warn!(
                "Consensus batch length mismatch: live={}, snapshot={}; comparing {} pairs",
                live.len(),
                snapshot.len(),
                pairs
            );
        }

        let mut live_conf_sum = 0.0;
        let mut snap_conf_sum = 0.0;
        let mut agreements = 0usize;
        let mut compared = 0usize;

        for (a, b) in live.iter().zip(snapshot.iter()).take(pairs) {
            // An empty confidence vector has no arg-max; drop the pair
            // rather than poisoning the batch means.
            if a.is_empty() || b.is_empty() {
                log::warn!("Skipping consensus pair with an empty confidence vector");
                continue;
            }

            let (class_a, conf_a) = argmax(a);
            let (class_b, conf_b) = argmax(b);

            live_conf_sum += conf_a;
            snap_conf_sum += conf_b;
            if class_a == class_b {
                agreements += 1;
            }
            compared += 1;
        }

        if compared == 0 {
            let stats = ConsensusStats::default();
            self.history.push(stats.clone());
            return stats;
        }

        let n = compared as f64;
        let mean_live = live_conf_sum / n;
        let mean_snap = snap_conf_sum / n;
        let mean_delta = (mean_live - mean_snap).abs();
        let anomaly = mean_delta > self.delta_threshold;

        if anomaly {
            self.anomaly_count += 1;
            log::warn!(
                "Consensus divergence: mean confidence delta {:.4} over {} samples (threshold {})",
                mean_delta,
                compared,
                self.delta_threshold
            );
        }

        let stats = ConsensusStats {
            sample_count: compared,
            mean_confidence_live: mean_live,
            mean_confidence_snapshot: mean_snap,
            mean_delta,
            agreement_rate: agreements as f64 / n,
            anomaly,
        };
        self.history.push(stats.clone());
        stats
    }

    /// True from the first observed divergence until an explicit reset.
    pub fn is_alert(&self) -> bool {
        self.anomaly_count > 0
    }

    pub fn anomaly_count(&self) -> u64 {
        self.anomaly_count
    }

    pub fn history(&self) -> &[ConsensusStats] {
        &self.history
    }

    /// Test isolation only.
    pub fn reset(&mut self) {
        self.anomaly_count = 0;
        self.history.clear();
    }
}

/// Index and value of the largest entry (first index wins ties).
fn argmax(values: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, &v) in values.iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best
}
