use std::time::Duration;

use serde::Serialize;

use super::Notifier;
use crate::config::TelegramConfig;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram Bot API `sendMessage` client.
///
/// Without a bot token or chat id every send is skipped with a warning.
pub struct TelegramNotifier {
    http: reqwest::Client,
    send_url: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let send_url = config.bot_token.as_ref().map(|token| {
            format!(
                "{}/bot{}/sendMessage",
                config.api_base_url.trim_end_matches('/'),
                token
            )
        });
        Ok(Self {
            http,
            send_url,
            chat_id: config.chat_id.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.send_url.is_some() && self.chat_id.is_some()
    }
}

impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), AppError> {
        let (Some(url), Some(chat_id)) = (&self.send_url, &self.chat_id) else {
            tracing::warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, skipping notification");
            return Ok(());
        };

        let resp = self
            .http
            .post(url)
            .json(&SendMessageRequest {
                chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await
            // The request URL embeds the bot token.
            .map_err(|e| AppError::Http(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Notify {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!("Telegram notification delivered");
        Ok(())
    }
}
