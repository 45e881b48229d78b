//! Drift Detector - sliding-window mean shift over raw feature vectors.
//!
//! Holds the most recent feature vectors in a bounded window and compares
//! the window mean against the gate-pass baseline, dimension by dimension,
//! in units of baseline standard deviations. The alert is strict: a shift of
//! exactly the threshold does not fire.

use serde::{Deserialize, Serialize};

use super::window::RollingWindow;

/// Floor for baseline standard deviations.
const STD_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone)]
struct DriftBaseline {
    mean: Vec<f64>,
    std: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftStats {
    pub window_len: usize,
    pub max_shift_sigma: f64,
    pub mean_shift_sigma: f64,
    pub max_shift_dim: Option<usize>,
    pub alert: bool,
}

pub struct DriftDetector {
    window: RollingWindow<Vec<f64>>,
    baseline: Option<DriftBaseline>,
    sigma_threshold: f64,
}

impl DriftDetector {
    pub fn new(window_capacity: usize, sigma_threshold: f64) -> Self {
        Self {
            window: RollingWindow::new(window_capacity),
            baseline: None,
            sigma_threshold,
        }
    }

    /// Push one raw feature vector, evicting the oldest when full.
    pub fn add(&mut self, features: &[f64]) {
        self.window.push(features.to_vec());
    }

    pub fn set_baseline(&mut self, mean: Vec<f64>, std: Vec<f64>) {
        log::info!(
            "Drift baseline installed: dim={}, sigma_threshold={}",
            mean.len(),
            self.sigma_threshold
        );
        self.baseline = Some(DriftBaseline { mean, std });
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Per-dimension shift of the window mean vs the baseline, in baseline
    /// sigmas. Zero/no-alert with an empty window or no baseline.
    pub fn stats(&self) -> DriftStats {
        let baseline = match &self.baseline {
            Some(b) if !self.window.is_empty() => b,
            _ => {
                return DriftStats {
                    window_len: self.window.len(),
                    ..Default::default()
                }
            }
        };

        let n = self.window.len() as f64;
        let totals = self.window.total();
        let dims = baseline.mean.len().min(totals.len());

        let mut max_shift: f64 = 0.0;
        let mut max_dim = None;
        let mut shift_sum = 0.0;

        for i in 0..dims {
            let window_mean = totals[i] / n;
            let shift =
                (window_mean - baseline.mean[i]).abs() / baseline.std[i].max(STD_FLOOR);

            shift_sum += shift;
            if shift > max_shift || max_dim.is_none() {
                max_shift = shift;
                max_dim = Some(i);
            }
        }

        let mean_shift = if dims > 0 { shift_sum / dims as f64 } else { 0.0 };

        DriftStats {
            window_len: self.window.len(),
            max_shift_sigma: max_shift,
            mean_shift_sigma: mean_shift,
            max_shift_dim: max_dim,
            alert: max_shift > self.sigma_threshold,
        }
    }

    /// Test isolation only; the baseline survives a reset.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector_with_baseline() -> DriftDetector {
        let mut d = DriftDetector::new(100, 2.0);
        d.set_baseline(vec![0.0, 10.0], vec![1.0, 2.0]);
        d
    }

    #[test]
    fn test_empty_window_reports_zero() {
        let d = detector_with_baseline();
        let stats = d.stats();

        assert_eq!(stats.window_len, 0);
        assert_eq!(stats.max_shift_sigma, 0.0);
        assert!(stats.max_shift_dim.is_none());
        assert!(!stats.alert);
    }

    #[test]
    fn test_no_baseline_reports_zero() {
        let mut d = DriftDetector::new(100, 2.0);
        d.add(&[50.0, 50.0]);

        let stats = d.stats();
        assert_eq!(stats.window_len, 1);
        assert!(!stats.alert);
    }

    #[test]
    fn test_shift_measured_in_baseline_sigmas() {
        let mut d = detector_with_baseline();
        // Dim 0 shifted by 1.5 sigma, dim 1 by 3.0 sigma (std = 2.0).
        for _ in 0..10 {
            d.add(&[1.5, 16.0]);
        }

        let stats = d.stats();
        assert!((stats.max_shift_sigma - 3.0).abs() < 1e-9);
        assert_eq!(stats.max_shift_dim, Some(1));
        assert!((stats.mean_shift_sigma - 2.25).abs() < 1e-9);
        assert!(stats.alert);
    }

    #[test]
    fn test_threshold_edge_is_strict() {
        let mut d = DriftDetector::new(10, 2.0);
        d.set_baseline(vec![0.0], vec![1.0]);

        d.add(&[2.0]);
        assert!(!d.stats().alert, "exactly 2.0 sigma must not alert");

        d.reset();
        d.add(&[2.0001]);
        assert!(d.stats().alert, "2.0001 sigma must alert");
    }

    #[test]
    fn test_eviction_moves_the_window_mean() {
        let mut d = DriftDetector::new(4, 2.0);
        d.set_baseline(vec![0.0], vec![1.0]);

        for _ in 0..4 {
            d.add(&[0.0]);
        }
        assert!(!d.stats().alert);

        // Window fills with shifted samples; the old ones are evicted.
        for _ in 0..4 {
            d.add(&[5.0]);
        }
        let stats = d.stats();
        assert!((stats.max_shift_sigma - 5.0).abs() < 1e-9);
        assert!(stats.alert);
    }
}
