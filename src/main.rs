use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use wad_watch::alert;
use wad_watch::binance::FeedSupervisor;
use wad_watch::config::{Config, LoggingConfig};
use wad_watch::event::FeedEvent;
use wad_watch::notify::{alert_channel, deliver, run_dispatcher, TelegramNotifier};
use wad_watch::runtime::Engine;
use wad_watch::state_store::SymbolStateStore;

const ALERT_QUEUE_CAPACITY: usize = 256;

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        logging
            .level
            .parse()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging);

    let symbols = config.binance.watch_list();
    tracing::info!(
        symbols = ?symbols,
        interval = %config.binance.kline_interval,
        sma_len = config.indicator.sma_len,
        ws_url = %config.binance.ws_base_url,
        "Starting wad-watch"
    );

    let notifier = Arc::new(
        TelegramNotifier::new(&config.telegram).context("failed to build Telegram client")?,
    );
    if !notifier.is_configured() {
        tracing::warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, alerts will only be logged");
    }

    // Channels
    let (feed_tx, feed_rx) = mpsc::channel::<FeedEvent>(config.feed.channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (alerts, alert_rx) = alert_channel(ALERT_QUEUE_CAPACITY);

    let dispatcher = tokio::spawn(run_dispatcher(alert_rx, notifier.clone()));

    let supervisor = FeedSupervisor::from_config(&config);
    let feed_shutdown = shutdown_rx.clone();
    let feed = tokio::spawn(async move { supervisor.run(feed_tx, feed_shutdown).await });

    // Ctrl+C handler
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        let _ = shutdown_tx.send(true);
    });

    let stop_requested = shutdown_rx.clone();
    let engine = Engine::new(
        SymbolStateStore::new(config.indicator.sma_len),
        alerts,
        symbols,
        config.binance.kline_interval.clone(),
    );
    let engine = engine.run(feed_rx, shutdown_rx).await;
    tracing::info!(symbols_tracked = engine.store().len(), "Engine stopped");
    drop(engine);

    match feed.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Feed supervisor exited with error"),
        Err(e) => tracing::warn!(error = %e, "Feed supervisor task failed"),
    }

    let flush_timeout = Duration::from_secs(config.telegram.timeout_secs.saturating_add(1));
    if tokio::time::timeout(flush_timeout, dispatcher).await.is_err() {
        tracing::warn!("Timed out flushing pending alerts");
    }

    if *stop_requested.borrow() {
        deliver(notifier.as_ref(), &alert::render_stopped()).await;
    }
    tracing::info!("wad-watch stopped");
    Ok(())
}
