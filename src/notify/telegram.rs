//! Telegram Bot API notifier

use crate::config::TelegramConfig;
use crate::notify::{NotifyError, Notifier};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wait used when Telegram says 429 but gives no retry hint
const DEFAULT_RETRY_AFTER: u64 = 5;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Posts messages through `sendMessage`
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    default_channel: String,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.token
            ),
            default_channel: normalize_channel(&config.channel),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send_one(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http {
                destination: chat_id.to_string(),
                source: e,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let header_retry = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        // Error bodies are best effort; a missing or odd body still yields an error
        let body: ApiResponse = response.json().await.unwrap_or_default();
        let body_retry = body.parameters.as_ref().and_then(|p| p.retry_after);

        if status == StatusCode::TOO_MANY_REQUESTS || body_retry.is_some() {
            return Err(NotifyError::RateLimited {
                retry_after: body_retry.or(header_retry).unwrap_or(DEFAULT_RETRY_AFTER),
            });
        }

        Err(NotifyError::Api {
            destination: chat_id.to_string(),
            status: status.as_u16(),
            description: body
                .description
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destinations: &[String], text: &str) -> Result<(), NotifyError> {
        if destinations.is_empty() {
            return self.send_one(&self.default_channel, text).await;
        }

        for destination in destinations {
            let chat_id = normalize_channel(destination);
            self.send_one(&chat_id, text).await?;
            tracing::trace!("Sent message to {}", chat_id);
        }

        Ok(())
    }
}

/// Public channels are addressed as `@name`; numeric chat ids are kept as is
fn normalize_channel(channel: &str) -> String {
    let channel = channel.trim();
    if channel.parse::<i64>().is_ok() {
        channel.to_string()
    } else {
        format!("@{}", channel.trim_start_matches('@'))
    }
}
