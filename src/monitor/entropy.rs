//! Entropy Monitor - per-class confidence entropy and collapse detection.
//!
//! Keeps a fixed-bin histogram of prediction confidences per class. A
//! confidence distribution that collapses toward certainty (entropy falling
//! well below the gate-pass baseline) is treated as a proxy for
//! representation degradation in the shadow path.

use serde::{Deserialize, Serialize};

/// Floor for baseline entropies when computing the collapse percentage.
const BASELINE_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntropyStats {
    pub total_samples: u64,
    pub per_class_entropy: Vec<f64>,
    pub overall_entropy: f64,
    pub max_collapse_pct: f64,
    pub collapsed_class: Option<usize>,
    pub alert: bool,
}

pub struct EntropyMonitor {
    num_classes: usize,
    bins: usize,
    histograms: Vec<Vec<u64>>,
    counts: Vec<u64>,
    baseline_entropy: Option<Vec<f64>>,
    collapse_threshold: f64,
}

impl EntropyMonitor {
    pub fn new(num_classes: usize, bins: usize, collapse_threshold: f64) -> Self {
        Self {
            num_classes,
            bins,
            histograms: vec![vec![0; bins]; num_classes],
            counts: vec![0; num_classes],
            baseline_entropy: None,
            collapse_threshold,
        }
    }

    /// Record one prediction. `bin = floor(confidence * (bins - 1))`,
    /// clamped into range; out-of-range classes are clamped and logged
    /// rather than rejected.
    pub fn record(&mut self, predicted_class: usize, confidence: f64) {
        if self.num_classes == 0 {
            return;
        }

        let class = if predicted_class >= self.num_classes {
            log::warn!(
                "Predicted class {} out of range (num_classes={}), clamping",
                predicted_class,
                self.num_classes
            );
            self.num_classes - 1
        } else {
            predicted_class
        };

        let raw = (confidence * (self.bins - 1) as f64).floor();
        let bin = (raw.max(0.0) as usize).min(self.bins - 1);

        self.histograms[class][bin] += 1;
        self.counts[class] += 1;
    }

    /// Install the known-good per-class entropy vector.
    pub fn set_baseline(&mut self, baseline_entropy: Vec<f64>) {
        log::info!(
            "Entropy baseline installed for {} classes",
            baseline_entropy.len()
        );
        self.baseline_entropy = Some(baseline_entropy);
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline_entropy.is_some()
    }

    pub fn stats(&self) -> EntropyStats {
        let per_class_entropy: Vec<f64> = (0..self.num_classes)
            .map(|c| shannon_entropy(&self.histograms[c], self.counts[c]))
            .collect();

        let total: u64 = self.counts.iter().sum();
        let overall_entropy = if total > 0 {
            per_class_entropy
                .iter()
                .zip(self.counts.iter())
                .map(|(h, &n)| h * (n as f64 / total as f64))
                .sum()
        } else {
            0.0
        };

        let (max_collapse_pct, collapsed_class) = match &self.baseline_entropy {
            Some(baseline) => {
                let mut max_pct = f64::NEG_INFINITY;
                let mut argmax = None;
                for (c, (&b, &cur)) in baseline.iter().zip(per_class_entropy.iter()).enumerate() {
                    // A class with no live samples has nothing to compare yet;
                    // its zero entropy is absence of data, not collapse.
                    if self.counts[c] == 0 {
                        continue;
                    }
                    let pct = (b - cur) / b.max(BASELINE_FLOOR);
                    if pct > max_pct {
                        max_pct = pct;
                        argmax = Some(c);
                    }
                }
                if argmax.is_some() {
                    (max_pct, argmax)
                } else {
                    (0.0, None)
                }
            }
            None => (0.0, None),
        };

        EntropyStats {
            total_samples: total,
            per_class_entropy,
            overall_entropy,
            max_collapse_pct,
            collapsed_class,
            alert: self.baseline_entropy.is_some() && max_collapse_pct > self.collapse_threshold,
        }
    }

    /// Clear histogram counts. The baseline survives - the orchestrator
    /// derives the baseline by feeding validation data through this monitor
    /// and then resetting it.
    pub fn reset(&mut self) {
        for hist in &mut self.histograms {
            hist.iter_mut().for_each(|b| *b = 0);
        }
        self.counts.iter_mut().for_each(|c| *c = 0);
    }
}

/// Shannon entropy (bits) over the nonzero bins of one class histogram.
fn shannon_entropy(histogram: &[u64], count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    histogram
        .iter()
        .filter(|&&b| b > 0)
        .map(|&b| {
            let p = b as f64 / n;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_clamping_at_extremes() {
        let mut m = EntropyMonitor::new(2, 50, 0.10);
        m.record(0, 0.0);
        m.record(0, 1.0);
        m.record(0, 1.5); // over-range confidence still lands in the top bin

        assert_eq!(m.histograms[0][0], 1);
        assert_eq!(m.histograms[0][49], 2);
    }

    #[test]
    fn test_point_mass_has_zero_entropy() {
        let mut m = EntropyMonitor::new(1, 50, 0.10);
        for _ in 0..100 {
            m.record(0, 0.95);
        }

        let stats = m.stats();
        assert_eq!(stats.per_class_entropy[0], 0.0);
        assert_eq!(stats.total_samples, 100);
    }

    #[test]
    fn test_uniform_spread_has_high_entropy() {
        let mut m = EntropyMonitor::new(1, 50, 0.10);
        // Bin centers land robustly in bins 0..=48; 1.0 clamps into bin 49.
        for i in 0..49 {
            m.record(0, (i as f64 + 0.5) / 49.0);
        }
        m.record(0, 1.0);

        let stats = m.stats();
        // 50 samples spread one-per-bin: entropy = log2(50).
        assert!((stats.per_class_entropy[0] - 50f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn test_overall_entropy_weighted_by_class_counts() {
        let mut m = EntropyMonitor::new(2, 50, 0.10);
        // Class 0: 30 samples, zero entropy. Class 1: 10 samples, 1 bit.
        for _ in 0..30 {
            m.record(0, 0.5);
        }
        for i in 0..10 {
            m.record(1, if i % 2 == 0 { 0.2 } else { 0.8 });
        }

        let stats = m.stats();
        assert!((stats.per_class_entropy[1] - 1.0).abs() < 1e-9);
        assert!((stats.overall_entropy - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_collapse_alert_after_baseline() {
        let mut m = EntropyMonitor::new(1, 50, 0.10);

        // Spread confidences during validation, then freeze that entropy.
        for i in 0..50 {
            m.record(0, i as f64 / 49.0);
        }
        let baseline = m.stats().per_class_entropy;
        m.set_baseline(baseline);
        m.reset();

        // Live traffic collapses to a single confidence value.
        for _ in 0..50 {
            m.record(0, 0.99);
        }

        let stats = m.stats();
        assert!(stats.max_collapse_pct > 0.99);
        assert_eq!(stats.collapsed_class, Some(0));
        assert!(stats.alert);
    }

    #[test]
    fn test_no_live_samples_is_neutral() {
        let mut m = EntropyMonitor::new(2, 50, 0.10);
        m.set_baseline(vec![2.0, 2.0]);

        // Freshly armed, zero live traffic: nothing to compare against.
        let stats = m.stats();
        assert_eq!(stats.total_samples, 0);
        assert_eq!(stats.max_collapse_pct, 0.0);
        assert!(stats.collapsed_class.is_none());
        assert!(!stats.alert);
    }

    #[test]
    fn test_unseen_class_does_not_count_as_collapsed() {
        let mut m = EntropyMonitor::new(2, 50, 0.10);
        m.set_baseline(vec![2.0, 2.0]);

        // Only class 0 appears in live traffic, and it genuinely collapses.
        for _ in 0..50 {
            m.record(0, 0.99);
        }

        let stats = m.stats();
        assert_eq!(stats.collapsed_class, Some(0));
        assert!(stats.alert);
        // Class 1 never saw a sample; it must not be the argmax.
        assert_ne!(stats.collapsed_class, Some(1));
    }

    #[test]
    fn test_no_baseline_never_alerts() {
        let mut m = EntropyMonitor::new(2, 50, 0.10);
        for _ in 0..200 {
            m.record(0, 1.0);
        }

        let stats = m.stats();
        assert_eq!(stats.max_collapse_pct, 0.0);
        assert!(!stats.alert);
    }

    #[test]
    fn test_entropy_gain_does_not_alert() {
        let mut m = EntropyMonitor::new(1, 50, 0.10);
        m.set_baseline(vec![0.5]);

        // Live entropy well above baseline: collapse is negative.
        for i in 0..50 {
            m.record(0, i as f64 / 49.0);
        }

        let stats = m.stats();
        assert!(stats.max_collapse_pct < 0.0);
        assert!(!stats.alert);
    }
}
