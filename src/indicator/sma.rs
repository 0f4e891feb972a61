use std::collections::VecDeque;

/// Simple moving average over the last `period` values.
///
/// Oldest value is evicted on push once the window is full. The average is
/// recomputed from the retained values, so two windows holding the same
/// numbers always report the same average.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be > 0");
        Self {
            period,
            window: VecDeque::with_capacity(period),
        }
    }

    /// Push a new value, return the current SMA if the window is full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.is_ready() {
            Some(self.window.iter().sum::<f64>() / self.period as f64)
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.window.len() == self.period
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Retained values, oldest first.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter().copied()
    }
}
