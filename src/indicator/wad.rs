/// One Williams A/D increment: the bar range, signed by the close-to-close move.
pub fn wad_step(close: f64, prev_close: f64, high: f64, low: f64) -> f64 {
    if close > prev_close {
        high - low
    } else if close < prev_close {
        -(high - low)
    } else {
        0.0
    }
}

/// Cumulative Williams Accumulation/Distribution.
///
/// The first close only seeds the previous close; accumulation starts with
/// the second one.
#[derive(Debug, Clone, Default)]
pub struct Wad {
    prev_close: Option<f64>,
    value: f64,
}

impl Wad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a closed bar. Returns the updated cumulative value, or `None` if
    /// this bar only seeded the previous close.
    pub fn push(&mut self, close: f64, high: f64, low: f64) -> Option<f64> {
        let Some(prev) = self.prev_close else {
            self.prev_close = Some(close);
            return None;
        };
        self.value += wad_step(close, prev, high, low);
        self.prev_close = Some(close);
        Some(self.value)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn prev_close(&self) -> Option<f64> {
        self.prev_close
    }
}
