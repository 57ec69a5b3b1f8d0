//! Telegram bot notifications with lazy chat-id discovery.
//!
//! The bot token comes from configuration; the chat id is resolved once
//! from `getUpdates` (the chat that last messaged the bot) and cached.
//! Sends are retried on transport errors and 5xx responses with
//! exponential backoff. A notifier built without a token is disabled and
//! every send is a no-op, so callers never need to branch.

use std::time::Duration;

use chrono::Utc;
use jobsweep_core::job::DataSource;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single Telegram API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for Telegram delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Telegram returned a non-2xx status code.
    #[error("Telegram returned HTTP {0}")]
    HttpStatus(u16),

    /// No chat has messaged the bot yet, so there is nowhere to send.
    #[error("No chat id available: send a message to the bot first")]
    NoChatId,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Per-source counters reported in the success message.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStats {
    pub scraped: usize,
    pub deleted: u64,
    pub inserted: u64,
    pub duration_secs: f64,
}

// ---------------------------------------------------------------------------
// Message formatting
// ---------------------------------------------------------------------------

fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Startup message for a source.
pub fn format_start(source: DataSource, timestamp: &str) -> String {
    format!("🚀 {source} scraper started at {timestamp}")
}

/// Completion message with the batch counters.
pub fn format_success(source: DataSource, stats: &RunStats, timestamp: &str) -> String {
    format!(
        "✅ {source} scraper completed at {timestamp}\n\
         Scraped {} jobs in {:.1}s\n\
         Database: {} old jobs deleted, {} new jobs inserted",
        stats.scraped, stats.duration_secs, stats.deleted, stats.inserted
    )
}

/// Failure message pinpointing where a run broke.
pub fn format_failure(location: &str, error: &str, timestamp: &str) -> String {
    format!("❌ SCRAPER FAILURE at {timestamp}\nLocation: {location}\nError: {error}")
}

// ---------------------------------------------------------------------------
// TelegramNotifier
// ---------------------------------------------------------------------------

struct Inner {
    client: reqwest::Client,
    token: String,
    chat_id: Mutex<Option<i64>>,
}

/// Best-effort Telegram notifier. Disabled (all sends no-ops) when
/// built without a token.
pub struct TelegramNotifier {
    inner: Option<Inner>,
}

impl TelegramNotifier {
    /// Build a notifier. `token` absent means notifications are off.
    pub fn new(token: Option<String>) -> Self {
        let inner = token.map(|token| {
            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build reqwest HTTP client");
            Inner {
                client,
                token,
                chat_id: Mutex::new(None),
            }
        });
        if inner.is_none() {
            tracing::info!("No Telegram token configured, notifications disabled");
        }
        Self { inner }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Report that a source's scrape has begun.
    pub async fn notify_start(&self, source: DataSource) {
        self.send_best_effort(&format_start(source, &timestamp_now()))
            .await;
    }

    /// Report a completed batch with its counters.
    pub async fn notify_success(&self, source: DataSource, stats: &RunStats) {
        self.send_best_effort(&format_success(source, stats, &timestamp_now()))
            .await;
    }

    /// Report a failure with its location. Never fails the run itself.
    pub async fn notify_failure(&self, location: &str, error: &str) {
        self.send_best_effort(&format_failure(location, error, &timestamp_now()))
            .await;
    }

    async fn send_best_effort(&self, text: &str) {
        if let Err(e) = self.send(text).await {
            tracing::warn!(error = %e, "Telegram notification failed");
        }
    }

    /// Send a message, resolving and caching the chat id on first use.
    ///
    /// Retries on transport errors and 5xx responses; a 4xx is treated
    /// as permanent and returned immediately.
    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };

        let chat_id = self.resolve_chat_id(inner).await?;
        let url = format!("{TELEGRAM_API_BASE}/bot{}/sendMessage", inner.token);

        let mut last_err: Option<NotifyError> = None;
        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match Self::try_send(inner, &url, chat_id, text).await {
                Ok(()) => return Ok(()),
                Err(NotifyError::HttpStatus(status)) if status < 500 => {
                    return Err(NotifyError::HttpStatus(status));
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Telegram send attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        match Self::try_send(inner, &url, chat_id, text).await {
            Ok(()) => Ok(()),
            Err(e) => Err(last_err.unwrap_or(e)),
        }
    }

    async fn try_send(
        inner: &Inner,
        url: &str,
        chat_id: i64,
        text: &str,
    ) -> Result<(), NotifyError> {
        let response = inner
            .client
            .post(url)
            .form(&[("chat_id", chat_id.to_string()), ("text", text.to_string())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }

    /// Resolve the chat id from the bot's latest update, caching it.
    async fn resolve_chat_id(&self, inner: &Inner) -> Result<i64, NotifyError> {
        let mut cached = inner.chat_id.lock().await;
        if let Some(id) = *cached {
            return Ok(id);
        }

        let url = format!("{TELEGRAM_API_BASE}/bot{}/getUpdates", inner.token);
        let response = inner.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        let updates: UpdatesResponse = response.json().await?;
        if !updates.ok {
            return Err(NotifyError::NoChatId);
        }

        // The most recent update wins, matching who messaged the bot last.
        let id = updates
            .result
            .iter()
            .filter_map(|u| u.message.as_ref())
            .map(|m| m.chat.id)
            .last()
            .ok_or(NotifyError::NoChatId)?;

        *cached = Some(id);
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
