//! Rolling Window - bounded FIFO with incremental running totals.
//!
//! Backs the drift detector (raw feature vectors) and the calibration guard
//! ((confidence, correctness) pairs). Eviction is strictly oldest-first and
//! the running total is updated on every push/evict, so window statistics
//! never require a rescan of the buffer.

use std::collections::VecDeque;

/// A sample type that knows how to enter and leave a running total.
///
/// Invariant relied on by `RollingWindow`: `retire` exactly undoes
/// `accumulate` for the same sample value.
pub trait Accumulate: Clone {
    type Total: Clone + Default;

    fn accumulate(&self, total: &mut Self::Total);
    fn retire(&self, total: &mut Self::Total);
}

/// Bounded FIFO buffer. `len() <= capacity` always holds; the running total
/// always equals the sum over the current contents.
#[derive(Debug, Clone)]
pub struct RollingWindow<T: Accumulate> {
    buf: VecDeque<T>,
    capacity: usize,
    total: T::Total,
}

impl<T: Accumulate> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total: T::Total::default(),
        }
    }

    /// Push a sample, evicting (and returning) the oldest entry when full.
    /// A zero-capacity window holds nothing: the push is rejected so the
    /// `len() <= capacity` invariant survives a degenerate configuration.
    pub fn push(&mut self, sample: T) -> Option<T> {
        if self.capacity == 0 {
            return None;
        }

        let evicted = if self.buf.len() >= self.capacity {
            let old = self.buf.pop_front();
            if let Some(ref old) = old {
                old.retire(&mut self.total);
            }
            old
        } else {
            None
        };

        sample.accumulate(&mut self.total);
        self.buf.push_back(sample);
        evicted
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total(&self) -> &T::Total {
        &self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.total = T::Total::default();
    }
}

/// Element-wise vector sum. The total grows to the widest sample seen, so a
/// window can be constructed before the feature dimension is known.
impl Accumulate for Vec<f64> {
    type Total = Vec<f64>;

    fn accumulate(&self, total: &mut Self::Total) {
        if total.len() < self.len() {
            total.resize(self.len(), 0.0);
        }
        for (t, v) in total.iter_mut().zip(self.iter()) {
            *t += v;
        }
    }

    fn retire(&self, total: &mut Self::Total) {
        for (t, v) in total.iter_mut().zip(self.iter()) {
            *t -= v;
        }
    }
}
