//! Human-readable alert text (Telegram HTML parse mode).

use chrono::DateTime;

use crate::model::signal::CrossoverEvent;

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn format_utc(ts_ms: i64) -> String {
    match DateTime::from_timestamp(ts_ms.div_euclid(1000), 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{}ms", ts_ms),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

pub fn render(event: &CrossoverEvent, interval: &str, sma_len: usize) -> String {
    format!(
        "{}\n<b>{}</b>  TF: <b>{}</b>\nClose: <code>{}</code>\nWAD: <code>{:.2}</code>   SMA({}): <code>{:.2}</code>\nTime: <code>{} UTC</code>",
        event.direction.label(),
        event.symbol,
        interval,
        round_to(event.close, 8),
        event.wad,
        sma_len,
        event.sma_value,
        format_utc(event.timestamp_ms),
    )
}

pub fn render_started(symbols: &[String], interval: &str, sma_len: usize) -> String {
    format!(
        "🚀 WAD watcher started. Tracking: <b>{}</b>  TF: <b>{}</b>  SMA: <b>{}</b>",
        symbols.join(", "),
        interval,
        sma_len
    )
}

pub fn render_stopped() -> String {
    "🛑 WAD watcher stopped manually.".to_string()
}

/// Strip the HTML tags used in alert text, for console logs.
pub fn plain_text(text: &str) -> String {
    ["<b>", "</b>", "<code>", "</code>"]
        .iter()
        .fold(text.to_string(), |acc, tag| acc.replace(tag, ""))
}
