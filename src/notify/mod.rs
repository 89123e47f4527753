//! Notification delivery
//!
//! A [`Notifier`] sends one rendered message to a list of destinations. It
//! reports rate-limit feedback separately from other failures so the delivery
//! loop can back off.

mod format;
mod telegram;

pub use format::{format_tags, render_message};
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a notifier
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("HTTP error sending to {destination}: {source}")]
    Http {
        destination: String,
        source: reqwest::Error,
    },

    #[error("{destination} rejected the message ({status}): {description}")]
    Api {
        destination: String,
        status: u16,
        description: String,
    },
}

impl NotifyError {
    /// Seconds to wait when this is rate-limit feedback
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Sends rendered text to one or more destinations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `text` to every destination in order, stopping at the first
    /// error. An empty list means the notifier's default destination.
    async fn send(&self, destinations: &[String], text: &str) -> Result<(), NotifyError>;
}
