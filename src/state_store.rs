use std::collections::HashMap;

use crate::model::candle::CandleClose;
use crate::model::signal::CrossoverEvent;
use crate::strategy::wad_crossover::SymbolState;

/// Owns every symbol's indicator state for the lifetime of the process.
///
/// States are created on the first close seen for a symbol and are never
/// dropped, so a transport reconnect leaves them untouched.
#[derive(Debug)]
pub struct SymbolStateStore {
    sma_len: usize,
    states: HashMap<String, SymbolState>,
}

impl SymbolStateStore {
    pub fn new(sma_len: usize) -> Self {
        assert!(sma_len > 0, "sma_len must be > 0");
        Self {
            sma_len,
            states: HashMap::new(),
        }
    }

    /// Route a final close to its symbol's state, creating it on first sight.
    pub fn on_candle(&mut self, candle: &CandleClose) -> Option<CrossoverEvent> {
        if !candle.is_final {
            return None;
        }
        let sma_len = self.sma_len;
        self.states
            .entry(candle.symbol.clone())
            .or_insert_with(|| SymbolState::new(sma_len))
            .advance(candle)
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolState> {
        self.states.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn sma_len(&self) -> usize {
        self.sma_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(symbol: &str, close: f64, is_final: bool) -> CandleClose {
        CandleClose {
            symbol: symbol.to_string(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            close_time_ms: 0,
            is_final,
        }
    }

    #[test]
    fn creates_state_lazily_per_symbol() {
        let mut store = SymbolStateStore::new(2);
        assert!(store.is_empty());
        store.on_candle(&close("BTCUSDT", 100.0, true));
        store.on_candle(&close("ETHUSDT", 10.0, true));
        store.on_candle(&close("BTCUSDT", 101.0, true));
        assert_eq!(store.len(), 2);

        let btc = store.get("BTCUSDT").unwrap();
        assert!((btc.cumulative_wad() - 2.0).abs() < f64::EPSILON);
        let eth = store.get("ETHUSDT").unwrap();
        assert_eq!(eth.cumulative_wad(), 0.0);
        assert_eq!(eth.previous_close(), Some(10.0));
    }

    #[test]
    fn non_final_close_is_ignored() {
        let mut store = SymbolStateStore::new(2);
        assert_eq!(store.on_candle(&close("BTCUSDT", 100.0, false)), None);
        assert!(store.get("BTCUSDT").is_none());
    }
}
