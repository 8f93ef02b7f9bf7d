use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use digest_core::{format_message, Article};

/// Hard timeout for a single sendMessage call. A send that runs past this is
/// treated as failed and the dispatch loop moves on.
const SEND_TIMEOUT_SECS: u64 = 15;
const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// --- Telegram Wire Structs ---

#[derive(Serialize, Debug)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub disable_web_page_preview: bool,
}

#[derive(Deserialize, Debug)]
pub struct SendMessageResponse {
    pub ok: bool,
    pub description: Option<String>,
}

// --- Client ---

pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    /// The base URL can be overridden with TELEGRAM_BASE_URL, which the
    /// integration tests use to point the client at a mock server.
    pub fn new(client: reqwest::Client, bot_token: String, chat_id: String) -> Self {
        let base_url =
            std::env::var("TELEGRAM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            client,
            base_url,
            bot_token,
            chat_id,
        }
    }

    /// Build a client from TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID. Both are
    /// required before any send may be attempted; `None` signals the caller
    /// to report that and skip dispatch entirely.
    pub fn from_env(client: reqwest::Client) -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default();
        if bot_token.is_empty() || chat_id.is_empty() {
            return None;
        }
        Some(Self::new(client, bot_token, chat_id))
    }

    /// Deliver one message body. Non-2xx responses and transport-level
    /// rejections surface the raw error text from the API.
    pub async fn send_message(&self, text: &str) -> Result<(), BoxError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: false,
        };

        debug!(chars = text.len(), "Sending Telegram message");

        let res = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let error_body = res.text().await.unwrap_or_default();
            return Err(format!("Telegram API returned {}: {}", status, error_body).into());
        }

        let resp: SendMessageResponse = res.json().await?;
        if !resp.ok {
            let description = resp
                .description
                .unwrap_or_else(|| "no description".to_string());
            return Err(format!("Telegram API rejected message: {}", description).into());
        }

        Ok(())
    }

    /// Send up to `max_messages` articles as individual messages, in list
    /// order. Articles beyond the cap are never attempted. A failed send is
    /// logged and skipped without aborting the loop, and only sends the
    /// transport accepted count toward the returned total.
    pub async fn send_digest(&self, articles: &[Article], max_messages: usize) -> usize {
        let mut sent = 0;
        for (i, article) in articles.iter().take(max_messages).enumerate() {
            let text = format_message(article);
            match self.send_message(&text).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(message = i + 1, error = %e, "Failed to send message"),
            }
        }
        sent
    }
}
