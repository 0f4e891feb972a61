/// A kline close event, normalized from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleClose {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub close_time_ms: i64,
    pub is_final: bool,
}

impl CandleClose {
    /// Bar range used by the WAD step. Never negative for a well-formed bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}
