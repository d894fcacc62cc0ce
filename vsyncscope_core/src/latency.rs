// Copyright 2026 the Vsyncscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sliding-window latency statistics.
//!
//! [`LatencyStatistics`] keeps the most recent latency samples (milliseconds)
//! and evaluates jitter metrics over them. [`LatencySmoother`] is the
//! exponential moving average used for the headline "average latency" value.

use alloc::collections::VecDeque;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::present::PresentId;

/// Latency of one displayed present, with the statistics after folding it in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatencyReport {
    /// The present this sample came from.
    pub present_id: PresentId,
    /// Frame begin to display, in milliseconds.
    pub latency_ms: f64,
    /// Exponential moving average of latency.
    pub smoothed_ms: f64,
    /// Standard deviation over the sample window.
    pub std_dev_ms: f64,
    /// Max minus min over the sample window.
    pub min_max_ms: f64,
}

/// Bounded FIFO of latency samples.
#[derive(Clone, Debug)]
pub struct LatencyStatistics {
    samples: VecDeque<f64>,
    history_length: usize,
}

impl LatencyStatistics {
    /// Window size used when none is specified.
    pub const DEFAULT_HISTORY_LENGTH: usize = 256;

    /// Creates an empty window holding at most `history_length` samples.
    #[must_use]
    pub fn new(history_length: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(history_length),
            history_length,
        }
    }

    /// Maximum number of samples retained.
    #[inline]
    #[must_use]
    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Changes the window size, discarding the oldest samples if it shrank.
    pub fn set_history_length(&mut self, history_length: usize) {
        self.history_length = history_length;
        self.evict();
    }

    /// Appends a sample, evicting the oldest beyond the window size.
    pub fn sample(&mut self, value: f64) {
        self.samples.push_back(value);
        self.evict();
    }

    /// Number of samples currently held.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no samples are held.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in arrival order.
    pub fn samples(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Arithmetic mean, or 0 when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Population standard deviation, or 0 when empty.
    #[must_use]
    pub fn evaluate_std_dev_metric(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let n = self.samples.len() as f64;
        let (sum, sq_sum) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(s, sq), x| (s + x, sq + x * x));
        let mean = sum / n;
        // Rounding can push the variance a hair below zero for constant data.
        (sq_sum / n - mean * mean).max(0.0).sqrt()
    }

    /// Spread between the largest and smallest sample, or 0 when empty.
    #[must_use]
    pub fn evaluate_min_max_metric(&self) -> f64 {
        let mut iter = self.samples.iter().copied();
        let Some(first) = iter.next() else {
            return 0.0;
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
        max - min
    }

    /// Removes all samples, keeping the window size.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn evict(&mut self) {
        while self.samples.len() > self.history_length {
            self.samples.pop_front();
        }
    }
}

impl Default for LatencyStatistics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HISTORY_LENGTH)
    }
}

/// Exponential moving average of latency.
///
/// The first sample seeds the average directly.
#[derive(Clone, Copy, Debug)]
pub struct LatencySmoother {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl LatencySmoother {
    /// Creates a smoother with the given weight for new samples (0.0–1.0).
    #[must_use]
    pub const fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha,
            initialized: false,
        }
    }

    /// Folds in a new sample and returns the updated average.
    pub fn update(&mut self, sample: f64) -> f64 {
        if self.initialized {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        } else {
            self.value = sample;
            self.initialized = true;
        }
        self.value
    }

    /// Current average, or `None` before the first sample.
    #[must_use]
    pub const fn get(&self) -> Option<f64> {
        if self.initialized {
            Some(self.value)
        } else {
            None
        }
    }
}
