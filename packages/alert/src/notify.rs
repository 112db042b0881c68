//! Alert delivery.
//!
//! [`Notifier`] is the boundary to whatever actually delivers a message.
//! [`TextbeltNotifier`] sends SMS through the Textbelt HTTP API.

use async_trait::async_trait;
use serde::Deserialize;

/// Prefix added to every SMS body.
pub const ALERT_PREFIX: &str = "Geofence Alert: ";

/// Public Textbelt endpoint.
pub const DEFAULT_TEXTBELT_URL: &str = "https://textbelt.com/text";

/// Errors that can occur while delivering an alert.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway accepted the request but refused to send the message.
    #[error("Message to {recipient} rejected: {message}")]
    Rejected {
        /// Recipient the message was addressed to.
        recipient: String,
        /// Reason reported by the gateway.
        message: String,
    },

    /// Some recipients could not be notified.
    #[error("Alert delivery failed for {} of {total} recipients", .failed.len())]
    Partial {
        /// Recipients whose delivery failed.
        failed: Vec<String>,
        /// Number of recipients attempted.
        total: usize,
    },
}

/// Delivers a message to a recipient.
///
/// Callers may retry on transient failure; implementations do not retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `message` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message was not accepted for delivery.
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;
}

/// SMS delivery through Textbelt.
#[derive(Debug, Clone)]
pub struct TextbeltNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TextbeltNotifier {
    /// Creates a notifier using the public Textbelt endpoint.
    #[must_use]
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(api_key, DEFAULT_TEXTBELT_URL)
    }

    /// Creates a notifier posting to a custom endpoint.
    #[must_use]
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_owned(),
            api_key: api_key.to_owned(),
        }
    }
}

/// Body returned by the Textbelt API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextbeltResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    quota_remaining: Option<i64>,
    #[serde(default)]
    text_id: Option<String>,
}

fn interpret_response(recipient: &str, response: TextbeltResponse) -> Result<(), NotifyError> {
    if response.success {
        log::info!(
            "SMS sent to {recipient} (text id {:?}, quota remaining {:?})",
            response.text_id,
            response.quota_remaining
        );
        Ok(())
    } else {
        Err(NotifyError::Rejected {
            recipient: recipient.to_owned(),
            message: response
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

#[async_trait]
impl Notifier for TextbeltNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        let body = format!("{ALERT_PREFIX}{message}");
        let payload = [
            ("phone", recipient),
            ("message", body.as_str()),
            ("key", self.api_key.as_str()),
        ];

        let response: TextbeltResponse = self
            .client
            .post(&self.endpoint)
            .form(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        interpret_response(recipient, response)
    }
}

/// Sends `message` to every recipient, continuing past failures.
///
/// # Errors
///
/// Returns [`NotifyError::Partial`] naming every recipient that could not
/// be notified.
pub async fn notify_all(
    notifier: &dyn Notifier,
    recipients: &[String],
    message: &str,
) -> Result<(), NotifyError> {
    let mut failed = Vec::new();

    for recipient in recipients {
        log::debug!("Sending alert to {recipient}");
        if let Err(e) = notifier.send(recipient, message).await {
            log::error!("Failed to alert {recipient}: {e}");
            failed.push(recipient.clone());
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(NotifyError::Partial {
            failed,
            total: recipients.len(),
        })
    }
}
