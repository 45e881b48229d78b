//! Calibration Guard - rolling calibration error and monotonicity tracking.
//!
//! Watches (confidence, correctness) pairs as ground truth arrives
//! out-of-band. Confidence that is inflated relative to observed accuracy,
//! or non-monotone with respect to it, is the signature of a miscalibrated
//! shadow model that must not be trusted for autonomous action.

use serde::{Deserialize, Serialize};

use super::window::{Accumulate, RollingWindow};

/// One graded prediction outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub confidence: f64,
    pub correct: bool,
}

/// Running totals over the calibration window.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationTotals {
    pub confidence_sum: f64,
    pub correct_count: u64,
}

impl Accumulate for CalibrationSample {
    type Total = CalibrationTotals;

    fn accumulate(&self, total: &mut Self::Total) {
        total.confidence_sum += self.confidence;
        if self.correct {
            total.correct_count += 1;
        }
    }

    fn retire(&self, total: &mut Self::Total) {
        total.confidence_sum -= self.confidence;
        if self.correct {
            total.correct_count -= 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationStats {
    pub sample_count: usize,
    pub ece: f64,
    pub rolling_inflation: f64,
    pub monotonicity_slope: f64,
    pub inflation_alert: bool,
    pub monotonicity_alert: bool,
    pub should_disable: bool,
}

impl Default for CalibrationStats {
    fn default() -> Self {
        Self {
            sample_count: 0,
            ece: 0.0,
            rolling_inflation: 0.0,
            // Assume-monotone until enough bins qualify.
            monotonicity_slope: 1.0,
            inflation_alert: false,
            monotonicity_alert: false,
            should_disable: false,
        }
    }
}

pub struct CalibrationGuard {
    window: RollingWindow<CalibrationSample>,
    min_samples: usize,
    bins: usize,
    min_per_bin: usize,
    inflation_threshold: f64,
    slope_threshold: f64,
}

impl CalibrationGuard {
    pub fn new(
        window_capacity: usize,
        min_samples: usize,
        bins: usize,
        min_per_bin: usize,
        inflation_threshold: f64,
        slope_threshold: f64,
    ) -> Self {
        Self {
            window: RollingWindow::new(window_capacity),
            min_samples,
            bins,
            min_per_bin,
            inflation_threshold,
            slope_threshold,
        }
    }

    pub fn record(&mut self, confidence: f64, correct: bool) {
        self.window.push(CalibrationSample {
            confidence,
            correct,
        });
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    /// Rolling calibration statistics. Below the minimum sample count this
    /// is the neutral default (cold-start guard), never an error.
    pub fn stats(&self) -> CalibrationStats {
        let n = self.window.len();
        if n < self.min_samples {
            return CalibrationStats {
                sample_count: n,
                ..Default::default()
            };
        }

        // Equal-width confidence bins over [0, 1].
        let mut bin_counts = vec![0usize; self.bins];
        let mut bin_conf_sums = vec![0.0f64; self.bins];
        let mut bin_correct = vec![0usize; self.bins];

        for sample in self.window.iter() {
            let idx = ((sample.confidence * self.bins as f64) as usize).min(self.bins - 1);
            bin_counts[idx] += 1;
            bin_conf_sums[idx] += sample.confidence;
            if sample.correct {
                bin_correct[idx] += 1;
            }
        }

        let mut ece = 0.0;
        let mut points: Vec<(f64, f64)> = Vec::new();
        for b in 0..self.bins {
            if bin_counts[b] < self.min_per_bin {
                continue;
            }
            let count = bin_counts[b] as f64;
            let bin_conf = bin_conf_sums[b] / count;
            let bin_acc = bin_correct[b] as f64 / count;

            ece += (count / n as f64) * (bin_conf - bin_acc).abs();
            points.push((bin_conf, bin_acc));
        }

        let totals = self.window.total();
        let rolling_inflation =
            totals.confidence_sum / n as f64 - totals.correct_count as f64 / n as f64;

        let monotonicity_slope = ols_slope(&points);

        let inflation_alert = rolling_inflation > self.inflation_threshold;
        let monotonicity_alert = monotonicity_slope < self.slope_threshold;

        CalibrationStats {
            sample_count: n,
            ece,
            rolling_inflation,
            monotonicity_slope,
            inflation_alert,
            monotonicity_alert,
            should_disable: inflation_alert || monotonicity_alert,
        }
    }

    /// True when either the inflation or the monotonicity alert fires.
    pub fn should_disable(&self) -> bool {
        self.stats().should_disable
    }

    /// Test isolation only.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

/// Ordinary least squares slope of accuracy on confidence over qualifying
/// bins. Fewer than two bins (or a degenerate spread) defaults to 1.0.
fn ols_slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 1.0;
    }

    let n = points.len() as f64;
    let mean_x: f64 = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y: f64 = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in points {
        num += (x - mean_x) * (y - mean_y);
        den += (x - mean_x).powi(2);
    }

    if den < 1e-12 {
        1.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> CalibrationGuard {
        CalibrationGuard::new(5_000, 100, 10, 10, 0.02, 0.9)
    }

    /// Feed `count` samples at one confidence with an exact correct count.
    fn feed_bin(g: &mut CalibrationGuard, confidence: f64, count: usize, correct: usize) {
        for i in 0..count {
            g.record(confidence, i < correct);
        }
    }

    #[test]
    fn test_cold_start_below_100_samples() {
        let mut g = guard();
        feed_bin(&mut g, 0.9, 99, 10);

        let stats = g.stats();
        assert_eq!(stats.sample_count, 99);
        assert_eq!(stats.ece, 0.0);
        assert_eq!(stats.rolling_inflation, 0.0);
        assert!(!stats.should_disable);
    }

    #[test]
    fn test_inflated_confidence_disables() {
        let mut g = guard();
        // 100 samples at confidence 0.9 with 60% correctness.
        feed_bin(&mut g, 0.9, 100, 60);

        let stats = g.stats();
        assert!((stats.rolling_inflation - 0.30).abs() < 1e-9);
        assert!((stats.ece - 0.30).abs() < 1e-9);
        assert!(stats.inflation_alert);
        // One qualifying bin: slope defaults to assume-monotone.
        assert_eq!(stats.monotonicity_slope, 1.0);
        assert!(!stats.monotonicity_alert);
        assert!(stats.should_disable);
        assert!(g.should_disable());
    }

    #[test]
    fn test_well_calibrated_stream_stays_quiet() {
        let mut g = guard();
        // Four bins whose accuracy matches their confidence exactly.
        feed_bin(&mut g, 0.25, 40, 10);
        feed_bin(&mut g, 0.45, 40, 18);
        feed_bin(&mut g, 0.65, 40, 26);
        feed_bin(&mut g, 0.85, 40, 34);

        let stats = g.stats();
        assert!(stats.ece < 1e-9);
        assert!(stats.rolling_inflation.abs() < 1e-9);
        assert!((stats.monotonicity_slope - 1.0).abs() < 1e-9);
        assert!(!stats.should_disable);
    }

    #[test]
    fn test_anti_monotone_accuracy_disables() {
        let mut g = guard();
        // Accuracy falls as confidence rises; means are balanced so the
        // inflation alert stays out of the way.
        feed_bin(&mut g, 0.25, 60, 54); // acc 0.9
        feed_bin(&mut g, 0.85, 60, 12); // acc 0.2

        let stats = g.stats();
        assert!(stats.monotonicity_slope < 0.0);
        assert!(stats.monotonicity_alert);
        assert!(!stats.inflation_alert);
        assert!(stats.should_disable);
    }

    #[test]
    fn test_window_eviction_keeps_totals_consistent() {
        let mut g = CalibrationGuard::new(100, 10, 10, 10, 0.02, 0.9);
        // Overfill: only the last 100 samples (all correct, conf 0.5) remain.
        feed_bin(&mut g, 0.9, 100, 0);
        feed_bin(&mut g, 0.5, 100, 100);

        let stats = g.stats();
        assert_eq!(stats.sample_count, 100);
        assert!((stats.rolling_inflation - (0.5 - 1.0)).abs() < 1e-9);
        assert!(!stats.inflation_alert);
    }
}
