use tokio::sync::{mpsc, watch};

use crate::alert;
use crate::event::{FeedEvent, WsConnectionStatus};
use crate::model::signal::CrossoverEvent;
use crate::notify::AlertSender;
use crate::state_store::SymbolStateStore;

/// Single consumer of the feed. Each event is handled to completion before
/// the next is taken, so symbol state is never seen half-updated.
pub struct Engine {
    store: SymbolStateStore,
    alerts: AlertSender,
    symbols: Vec<String>,
    interval: String,
}

impl Engine {
    pub fn new(
        store: SymbolStateStore,
        alerts: AlertSender,
        symbols: Vec<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            store,
            alerts,
            symbols,
            interval: interval.into(),
        }
    }

    pub fn store(&self) -> &SymbolStateStore {
        &self.store
    }

    pub fn handle(&mut self, event: FeedEvent) -> Option<CrossoverEvent> {
        match event {
            FeedEvent::Candle(candle) => {
                let crossover = self.store.on_candle(&candle)?;
                let text = alert::render(&crossover, &self.interval, self.store.sma_len());
                tracing::info!(
                    symbol = %crossover.symbol,
                    direction = ?crossover.direction,
                    close = crossover.close,
                    wad = crossover.wad,
                    sma = crossover.sma_value,
                    close_time_ms = crossover.timestamp_ms,
                    "WAD crossover"
                );
                tracing::info!("{}", alert::plain_text(&text));
                self.alerts.emit(text);
                Some(crossover)
            }
            FeedEvent::Status(WsConnectionStatus::Subscribed) => {
                tracing::info!(symbols = ?self.symbols, interval = %self.interval, "Kline stream subscribed");
                self.alerts.emit(alert::render_started(
                    &self.symbols,
                    &self.interval,
                    self.store.sma_len(),
                ));
                None
            }
            FeedEvent::Status(status) => {
                tracing::info!(status = %status, "Feed status");
                None
            }
        }
    }

    /// Consume feed events until shutdown or until the feed closes. Returns
    /// the engine so the caller decides when the store is dropped.
    pub async fn run(
        mut self,
        mut feed_rx: mpsc::Receiver<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    tracing::info!("Engine shutting down");
                    break;
                }
                event = feed_rx.recv() => match event {
                    Some(event) => {
                        self.handle(event);
                    }
                    None => {
                        tracing::info!("Feed closed, engine stopping");
                        break;
                    }
                },
            }
        }
        self
    }
}
