use crate::indicator::sma::Sma;
use crate::indicator::wad::Wad;
use crate::model::candle::CandleClose;
use crate::model::signal::{CrossoverEvent, Direction, Relation};

/// Per-symbol WAD/SMA crossover state.
///
/// `last_relation` carries the hysteresis: an event fires only when a fully
/// warmed-up evaluation lands on the other side from the previous one.
#[derive(Debug, Clone)]
pub struct SymbolState {
    wad: Wad,
    window: Sma,
    last_relation: Relation,
}

impl SymbolState {
    pub fn new(sma_len: usize) -> Self {
        Self {
            wad: Wad::new(),
            window: Sma::new(sma_len),
            last_relation: Relation::Unknown,
        }
    }

    /// Advance the indicator by one closed bar.
    pub fn advance(&mut self, candle: &CandleClose) -> Option<CrossoverEvent> {
        let wad = self.wad.push(candle.close, candle.high, candle.low)?;
        let sma = self.window.push(wad)?;

        let relation = Relation::classify(wad, sma);
        let previous = std::mem::replace(&mut self.last_relation, relation);
        if previous == Relation::Unknown || previous == relation {
            return None;
        }

        let direction = match relation {
            Relation::Above => Direction::Up,
            _ => Direction::Down,
        };
        Some(CrossoverEvent {
            symbol: candle.symbol.clone(),
            direction,
            close: candle.close,
            wad,
            sma_value: sma,
            timestamp_ms: candle.close_time_ms,
        })
    }

    pub fn previous_close(&self) -> Option<f64> {
        self.wad.prev_close()
    }

    pub fn cumulative_wad(&self) -> f64 {
        self.wad.value()
    }

    /// WAD snapshots currently in the averaging window, oldest first.
    pub fn window(&self) -> Vec<f64> {
        self.window.values().collect()
    }

    pub fn sma_value(&self) -> Option<f64> {
        self.window.value()
    }

    pub fn last_relation(&self) -> Relation {
        self.last_relation
    }

    pub fn sma_len(&self) -> usize {
        self.window.period()
    }
}
