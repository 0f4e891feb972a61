use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

use super::normalize::CandleNormalizer;
use crate::config::Config;
use crate::event::{FeedEvent, WsConnectionStatus};

/// Reconnect delay as a pure function of the consecutive failure count.
///
/// `delay_for(n) = min(base * factor^(n-1), max)`. A factor of 1.0 gives a
/// fixed delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    base: Duration,
    max: Duration,
    factor: f64,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max: Duration, factor: f64) -> Self {
        Self {
            base,
            max: max.max(base),
            factor: factor.max(1.0),
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, 1.0)
    }

    pub fn delay_for(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(64) as i32;
        let secs = self.base.as_secs_f64() * self.factor.powi(exp);
        Duration::from_secs_f64(secs.min(self.max.as_secs_f64()))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Subscribed,
}

const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the kline stream connection: connect, keep alive, reconnect after a
/// delay. Normalized closes and status changes go to the engine in arrival
/// order. Indicator state lives in the engine and is never touched here.
pub struct FeedSupervisor {
    url: String,
    normalizer: CandleNormalizer,
    policy: ReconnectPolicy,
    ping_interval: Duration,
    ping_timeout: Duration,
}

impl FeedSupervisor {
    pub fn new(
        url: impl Into<String>,
        normalizer: CandleNormalizer,
        policy: ReconnectPolicy,
        ping_interval: Duration,
        ping_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            normalizer,
            policy,
            // tokio's interval panics on a zero period
            ping_interval: ping_interval.max(MIN_PING_INTERVAL),
            ping_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.binance.combined_stream_url(),
            CandleNormalizer::new(&config.binance.watch_list()),
            ReconnectPolicy::new(
                config.feed.reconnect_delay(),
                config.feed.reconnect_max_delay(),
                config.feed.reconnect_backoff_factor,
            ),
            config.feed.ping_interval(),
            config.feed.ping_timeout(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run until shutdown is signalled or the engine goes away.
    pub async fn run(
        &self,
        feed_tx: mpsc::Sender<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut state = FeedState::Disconnected;
        let mut failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }
            set_state(&mut state, FeedState::Connecting);
            let attempt = failures.saturating_add(1);
            if !publish(&feed_tx, WsConnectionStatus::Connecting { attempt }).await {
                break;
            }

            match self
                .connect_once(&feed_tx, &mut shutdown, &mut state, &mut failures)
                .await
            {
                Ok(()) => break,
                Err(e) => {
                    set_state(&mut state, FeedState::Disconnected);
                    failures = failures.saturating_add(1);
                    tracing::warn!(error = %e, failures, "Kline stream failed");
                    if !publish(&feed_tx, WsConnectionStatus::Disconnected).await {
                        break;
                    }

                    let delay = self.policy.delay_for(failures);
                    tracing::info!(
                        attempt = failures,
                        delay_ms = delay.as_millis() as u64,
                        "Reconnecting"
                    );
                    if !publish(
                        &feed_tx,
                        WsConnectionStatus::Reconnecting {
                            attempt: failures,
                            delay_ms: delay.as_millis() as u64,
                        },
                    )
                    .await
                    {
                        break;
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = shutdown.changed() => {
                            tracing::info!("Shutdown during reconnect");
                            break;
                        }
                    }
                }
            }
        }

        if state != FeedState::Disconnected {
            set_state(&mut state, FeedState::Disconnected);
            let _ = feed_tx.try_send(FeedEvent::Status(WsConnectionStatus::Disconnected));
        }
        Ok(())
    }

    /// One connection session. `Ok` means a deliberate stop; `Err` means the
    /// transport failed and a reconnect is due.
    async fn connect_once(
        &self,
        feed_tx: &mpsc::Sender<FeedEvent>,
        shutdown: &mut watch::Receiver<bool>,
        state: &mut FeedState,
        failures: &mut u32,
    ) -> Result<()> {
        tracing::info!(url = %self.url, "Connecting to kline stream");
        let (ws_stream, _resp) = tokio::select! {
            res = tokio_tungstenite::connect_async(&self.url) => {
                res.context("WebSocket connect failed")?
            }
            _ = shutdown.changed() => return Ok(()),
        };

        // The combined-stream URL subscribes on connect.
        set_state(state, FeedState::Subscribed);
        *failures = 0;
        if !publish(feed_tx, WsConnectionStatus::Subscribed).await {
            return Ok(());
        }

        let (mut write, mut read) = ws_stream.split();
        let mut ping_timer =
            tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pong_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(candle) = self.normalizer.normalize(&text) {
                                if feed_tx.send(FeedEvent::Candle(candle)).await.is_err() {
                                    return Ok(());
                                }
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_deadline = None;
                        }
                        Some(Ok(Message::Ping(_))) => {
                            // tokio-tungstenite answers pings itself
                        }
                        Some(Ok(Message::Close(frame))) => {
                            return Err(anyhow!("server closed the stream: {:?}", frame));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(anyhow!("WebSocket read error: {}", e));
                        }
                        None => {
                            return Err(anyhow!("WebSocket stream ended"));
                        }
                    }
                }
                _ = ping_timer.tick() => {
                    write
                        .send(Message::Ping(Vec::new()))
                        .await
                        .context("failed to send keep-alive ping")?;
                    if pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + self.ping_timeout);
                    }
                }
                _ = sleep_until_opt(pong_deadline) => {
                    bail!("no pong within {:?}", self.ping_timeout);
                }
                _ = shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }
}

fn set_state(state: &mut FeedState, next: FeedState) {
    if *state != next {
        tracing::debug!(from = ?*state, to = ?next, "Feed state change");
        *state = next;
    }
}

/// Returns false once the engine has stopped listening.
async fn publish(feed_tx: &mpsc::Sender<FeedEvent>, status: WsConnectionStatus) -> bool {
    feed_tx.send(FeedEvent::Status(status)).await.is_ok()
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policy_never_grows() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn exponential_policy_caps_at_max() {
        let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(10), 2.0);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn zero_ping_interval_is_clamped() {
        let supervisor = FeedSupervisor::new(
            "ws://127.0.0.1:1/stream",
            CandleNormalizer::new(&["BTCUSDT"]),
            ReconnectPolicy::default(),
            Duration::ZERO,
            Duration::from_secs(10),
        );
        assert_eq!(supervisor.ping_interval, MIN_PING_INTERVAL);
    }

    #[test]
    fn url_comes_from_config() {
        let mut config = Config::default();
        config.binance.symbols = vec!["btcusdt".to_string(), "ETHUSDT".to_string()];
        let supervisor = FeedSupervisor::from_config(&config);
        assert_eq!(
            supervisor.url(),
            "wss://stream.binance.com:9443/stream?streams=btcusdt@kline_1m/ethusdt@kline_1m"
        );
    }
}
