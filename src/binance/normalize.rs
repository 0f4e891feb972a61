//! Turns raw kline stream frames into `CandleClose` events.
//!
//! Accepts the combined-stream envelope `{stream, data: {s, k}}` as well as a
//! bare `{s, k}` event. Only closed bars for watch-listed symbols pass.

use std::collections::HashSet;

use serde::Deserialize;

use super::types::{BinanceKline, KlineEventHeader};
use crate::error::NormalizeError;
use crate::model::candle::CandleClose;

#[derive(Debug, Clone)]
pub struct CandleNormalizer {
    watch_list: HashSet<String>,
}

impl CandleNormalizer {
    pub fn new<S: AsRef<str>>(symbols: &[S]) -> Self {
        Self {
            watch_list: symbols
                .iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn watches(&self, symbol: &str) -> bool {
        self.watch_list.contains(symbol)
    }

    /// Normalize a frame, applying the drop policy for each rejection kind.
    pub fn normalize(&self, text: &str) -> Option<CandleClose> {
        match self.parse(text) {
            Ok(candle) => Some(candle),
            Err(NormalizeError::Malformed(reason)) => {
                tracing::warn!(reason = %reason, "Dropping malformed kline message");
                None
            }
            Err(NormalizeError::MissingSymbol) => {
                tracing::debug!(payload = %text, "Dropping message without symbol");
                None
            }
            Err(NormalizeError::UnknownSymbol(_)) | Err(NormalizeError::NotFinal) => None,
        }
    }

    /// Parse a frame into a closed candle or say why it was rejected.
    pub fn parse(&self, text: &str) -> Result<CandleClose, NormalizeError> {
        let root: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| NormalizeError::Malformed(format!("invalid JSON: {}", e)))?;
        self.parse_value(&root)
    }

    pub fn parse_value(&self, root: &serde_json::Value) -> Result<CandleClose, NormalizeError> {
        let data = root
            .get("data")
            .filter(|d| d.is_object())
            .unwrap_or(root);
        let header = KlineEventHeader::deserialize(data)
            .map_err(|e| NormalizeError::Malformed(format!("invalid event envelope: {}", e)))?;

        let symbol = header
            .symbol
            .as_deref()
            .or_else(|| header.kline.as_ref().and_then(|k| k.symbol.as_deref()))
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or(NormalizeError::MissingSymbol)?;

        if !self.watches(&symbol) {
            return Err(NormalizeError::UnknownSymbol(symbol));
        }
        if !header.kline.as_ref().is_some_and(|k| k.is_final) {
            return Err(NormalizeError::NotFinal);
        }

        let raw = data
            .get("k")
            .ok_or_else(|| NormalizeError::Malformed(format!("{}: missing kline object", symbol)))?;
        let kline = BinanceKline::deserialize(raw)
            .map_err(|e| NormalizeError::Malformed(format!("{}: {}", symbol, e)))?;

        if kline.high < kline.low {
            return Err(NormalizeError::Malformed(format!(
                "{}: high {} below low {}",
                symbol, kline.high, kline.low
            )));
        }

        Ok(CandleClose {
            symbol,
            open: kline.open.unwrap_or(kline.close),
            high: kline.high,
            low: kline.low,
            close: kline.close,
            close_time_ms: kline.close_time,
            is_final: kline.is_final,
        })
    }
}
