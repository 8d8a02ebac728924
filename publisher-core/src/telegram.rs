//! Telegram delivery.
//!
//! Renders a [`NotificationBatch`] as a single HTML message and posts it
//! through the Bot API `sendMessage` method. Transport failures are
//! retried with exponential backoff; any HTTP response ends the attempt
//! loop. [`TelegramNotifier::send`] reports the outcome as a bool.

use crate::config::TelegramConfig;
use crate::model::NotificationBatch;
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Errors that can occur while talking to Telegram
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram configuration is incomplete: {0}")]
    Config(String),
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

const DIVIDER: &str = "──────────────────";

/// Posts summary digests to a Telegram chat
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    max_retries: u32,
    backoff_unit: Duration,
}

impl TelegramNotifier {
    pub const DEFAULT_API_BASE: &'static str = "https://api.telegram.org";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_RETRIES: u32 = 5;

    /// Create a notifier with the default endpoint, timeout and retry policy
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, TelegramError> {
        Self::with_timeout(bot_token, chat_id, Self::DEFAULT_TIMEOUT)
    }

    fn with_timeout(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TelegramError> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(TelegramError::Config(
                "bot token and chat id are required".to_string(),
            ));
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            bot_token,
            chat_id,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            backoff_unit: Duration::from_secs(1),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self, TelegramError> {
        Ok(Self::with_timeout(
            &config.bot_token,
            &config.chat_id,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_api_base(&config.api_base)
        .with_max_retries(config.max_retries))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Backoff between attempts is `unit * 2^attempt`
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    /// Send the batch as one message. True iff Telegram answered 200.
    #[instrument(skip(self, batch), fields(items = batch.len()))]
    pub async fn send(&self, batch: &NotificationBatch) -> bool {
        let text = match render_message(batch) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to render Telegram message: {}", e);
                return false;
            }
        };

        for attempt in 0..self.max_retries {
            match self.post(&text).await {
                Ok(status) if status == StatusCode::OK => {
                    info!("Sent {} summaries to Telegram", batch.len());
                    return true;
                }
                Ok(_) => return false,
                Err(e) => {
                    if attempt + 1 == self.max_retries {
                        error!(
                            "Giving up on Telegram after {} attempts: {}",
                            self.max_retries, e
                        );
                        return false;
                    }
                    let backoff = self
                        .backoff_unit
                        .saturating_mul(2u32.saturating_pow(attempt));
                    warn!(
                        "Telegram attempt {}/{} failed, retrying in {:?}: {}",
                        attempt + 1,
                        self.max_retries,
                        backoff,
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        false
    }

    async fn post(&self, text: &str) -> Result<StatusCode, TelegramError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.http.post(self.endpoint()).json(&request).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("Telegram rejected the message with {}: {}", status, body);
        } else {
            debug!("Telegram accepted the message");
        }

        Ok(status)
    }
}

/// Render the digest: a header, then a numbered title and body per item,
/// each followed by a divider.
pub fn render_message(batch: &NotificationBatch) -> Result<String, std::fmt::Error> {
    let mut message = String::from("📚 <b>Today's Article </b>\n\n");

    for (idx, item) in batch.items().iter().enumerate() {
        write!(
            message,
            "#{} 📌 <b>{}</b>\n\n📝 {}\n\n{}\n\n",
            idx + 1,
            escape_html(&item.title),
            escape_html(&item.summary),
            DIVIDER
        )?;
    }

    Ok(message)
}

/// Escape the characters Telegram's HTML parse mode treats as markup
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
