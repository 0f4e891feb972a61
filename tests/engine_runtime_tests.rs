use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use wad_watch::error::AppError;
use wad_watch::event::{FeedEvent, WsConnectionStatus};
use wad_watch::model::candle::CandleClose;
use wad_watch::notify::{alert_channel, run_dispatcher, Notifier};
use wad_watch::runtime::Engine;
use wad_watch::state_store::SymbolStateStore;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    reject: bool,
}

impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.reject {
            return Err(AppError::Notify {
                status: 403,
                body: "Forbidden".to_string(),
            });
        }
        Ok(())
    }
}

fn close(close: f64, high: f64, low: f64) -> FeedEvent {
    FeedEvent::Candle(CandleClose {
        symbol: "BTCUSDT".to_string(),
        open: close,
        high,
        low,
        close,
        close_time_ms: 1_700_000_059_999,
        is_final: true,
    })
}

fn worked_example() -> Vec<FeedEvent> {
    vec![
        FeedEvent::Status(WsConnectionStatus::Subscribed),
        close(100.0, 101.0, 99.0),
        close(101.0, 102.0, 100.0),
        close(101.0, 105.0, 96.0),
        close(100.0, 101.0, 98.0),
        close(102.0, 106.0, 100.0),
    ]
}

async fn run_to_completion(notifier: Arc<RecordingNotifier>) {
    let (feed_tx, feed_rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (alerts, alert_rx) = alert_channel(16);
    let dispatcher = tokio::spawn(run_dispatcher(alert_rx, notifier));

    for event in worked_example() {
        feed_tx.send(event).await.unwrap();
    }
    drop(feed_tx);

    let engine = Engine::new(
        SymbolStateStore::new(3),
        alerts,
        vec!["BTCUSDT".to_string()],
        "1m",
    )
    .run(feed_rx, shutdown_rx)
    .await;

    // the dispatcher finishes once the engine's sender is gone
    let tracked = engine.store().len();
    drop(engine);
    timeout(Duration::from_secs(2), dispatcher)
        .await
        .expect("dispatcher did not drain")
        .unwrap();
    assert_eq!(tracked, 1);
}

#[tokio::test]
async fn alerts_are_delivered_in_order() {
    let notifier = Arc::new(RecordingNotifier::default());
    run_to_completion(notifier.clone()).await;

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with("🚀"));
    assert!(sent[1].starts_with("⬆️ WAD crosses UP"));
    assert!(sent[1].contains("SMA(3): <code>2.00</code>"));
    assert!(sent[1].contains("WAD: <code>5.00</code>"));
    assert!(sent[1].contains("2023-11-14 22:14:19 UTC"));
}

#[tokio::test]
async fn rejected_delivery_does_not_stop_the_engine() {
    let notifier = Arc::new(RecordingNotifier {
        reject: true,
        ..Default::default()
    });
    run_to_completion(notifier.clone()).await;

    // each message attempted exactly once
    assert_eq!(notifier.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn shutdown_stops_engine_and_keeps_processed_state() {
    let (feed_tx, feed_rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (alerts, _alert_rx) = alert_channel(16);
    let engine = Engine::new(
        SymbolStateStore::new(3),
        alerts,
        vec!["BTCUSDT".to_string()],
        "1m",
    );
    let task = tokio::spawn(engine.run(feed_rx, shutdown_rx));

    feed_tx.send(close(100.0, 101.0, 99.0)).await.unwrap();
    feed_tx.send(close(101.0, 102.0, 100.0)).await.unwrap();
    // let the engine drain before signalling
    while feed_tx.capacity() < feed_tx.max_capacity() {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(true).unwrap();

    let engine = timeout(Duration::from_secs(2), task)
        .await
        .expect("engine did not stop")
        .unwrap();
    let state = engine.store().get("BTCUSDT").unwrap();
    assert_eq!(state.previous_close(), Some(101.0));
    assert!((state.cumulative_wad() - 2.0).abs() < f64::EPSILON);
}
