//! Latent Space Monitor - online embedding statistics vs a frozen baseline.
//!
//! Maintains a single-pass (Welford) mean/variance over the shadow model's
//! embedding vectors and scores divergence from the gate-pass baseline as a
//! diagonal-Gaussian KL. Reports nothing until more than 10 samples have
//! been seen - the cold-start guard keeps a freshly armed monitor from
//! alerting on noise.

use serde::{Deserialize, Serialize};

/// Variance floor applied to both sides of the KL to avoid division by zero.
const VARIANCE_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone)]
struct LatentBaseline {
    mean: Vec<f64>,
    variance: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatentStats {
    pub sample_count: u64,
    pub kl_divergence: f64,
    pub frobenius_shift: f64,
    pub max_mean_shift_sigma: f64,
    pub alert: bool,
}

pub struct LatentSpaceMonitor {
    count: u64,
    mean: Vec<f64>,
    m2: Vec<f64>,
    baseline: Option<LatentBaseline>,
    kl_threshold: f64,
    min_samples: u64,
}

impl LatentSpaceMonitor {
    pub fn new(kl_threshold: f64, min_samples: u64) -> Self {
        Self {
            count: 0,
            mean: Vec::new(),
            m2: Vec::new(),
            baseline: None,
            kl_threshold,
            min_samples,
        }
    }

    /// Welford update with one embedding vector. The dimension is fixed by
    /// the first sample; shorter/longer vectors are zipped over the shared
    /// prefix.
    pub fn update(&mut self, embedding: &[f64]) {
        if self.mean.is_empty() {
            self.mean = vec![0.0; embedding.len()];
            self.m2 = vec![0.0; embedding.len()];
        }

        self.count += 1;
        let n = self.count as f64;

        for (i, &x) in embedding.iter().enumerate().take(self.mean.len()) {
            let delta = x - self.mean[i];
            self.mean[i] += delta / n;
            self.m2[i] += delta * (x - self.mean[i]);
        }
    }

    /// Freeze a reference distribution captured from validation data.
    pub fn set_baseline(&mut self, mean: Vec<f64>, variance: Vec<f64>) {
        log::info!(
            "Latent baseline installed: dim={}, kl_threshold={}",
            mean.len(),
            self.kl_threshold
        );
        self.baseline = Some(LatentBaseline { mean, variance });
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn sample_count(&self) -> u64 {
        self.count
    }

    /// Current sample variance (`M2 / max(n - 1, 1)`).
    pub fn variance(&self) -> Vec<f64> {
        let denom = (self.count.saturating_sub(1)).max(1) as f64;
        self.m2.iter().map(|m2| m2 / denom).collect()
    }

    pub fn current_mean(&self) -> &[f64] {
        &self.mean
    }

    /// Divergence scores against the baseline. Zero/no-alert without a
    /// baseline or below the minimum sample count.
    pub fn stats(&self) -> LatentStats {
        let baseline = match &self.baseline {
            Some(b) if self.count >= self.min_samples => b,
            _ => {
                return LatentStats {
                    sample_count: self.count,
                    ..Default::default()
                }
            }
        };

        let variance = self.variance();
        let dims = baseline.mean.len().min(self.mean.len());

        let mut kl = 0.0;
        let mut frobenius_sq = 0.0;
        let mut max_mean_shift_sigma: f64 = 0.0;

        for i in 0..dims {
            let v0 = baseline.variance[i].max(VARIANCE_FLOOR);
            let v1 = variance[i].max(VARIANCE_FLOOR);
            let m0 = baseline.mean[i];
            let m1 = self.mean[i];

            kl += (v0 / v1).ln() + v1 / v0 + (m0 - m1).powi(2) / v0 - 1.0;
            frobenius_sq += (variance[i] - baseline.variance[i]).powi(2);
            max_mean_shift_sigma = max_mean_shift_sigma.max((m1 - m0).abs() / v0.sqrt());
        }
        kl *= 0.5;

        LatentStats {
            sample_count: self.count,
            kl_divergence: kl,
            frobenius_shift: frobenius_sq.sqrt(),
            max_mean_shift_sigma,
            alert: kl > self.kl_threshold,
        }
    }

    /// Test isolation only; the baseline survives a reset.
    pub fn reset(&mut self) {
        self.count = 0;
        self.mean.clear();
        self.m2.clear();
    }
}
