//! Outbound notification capability.
//!
//! The credit ledger only knows the [`Notifier`] trait. One backend is
//! selected at startup from a configuration string (`none`, `log`,
//! `webhook`) by [`build_notifier`]; delivery failures are reported to the
//! caller, who decides whether they matter (issuance never fails because a
//! notice could not be sent).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::credits::AccessToken;
use crate::{NotaryError, Result};

/// A message for a recipient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Event name, e.g. `credential_issued`.
    pub event: String,
    /// Event payload.
    pub data: serde_json::Value,
}

impl Notification {
    /// Event sent to the payer when a credential is issued.
    ///
    /// Carries the credential itself: the recipient is its owner.
    pub fn credential_issued(token: &AccessToken) -> Self {
        Self {
            event: "credential_issued".to_string(),
            data: serde_json::json!({
                "accessToken": token.id.as_str(),
                "totalCredits": token.total_credits,
                "paidAmount": token.paid_amount,
                "paymentTxId": token.payment_tx_id,
            }),
        }
    }
}

/// Delivery capability for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Deliver `payload` to `recipient`.
    async fn send(&self, recipient: &str, payload: &Notification) -> Result<()>;
}

/// Discards every notification.
#[derive(Clone, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn send(&self, _recipient: &str, _payload: &Notification) -> Result<()> {
        Ok(())
    }
}

/// Writes notifications to the tracing log. Payload data is not logged.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, recipient: &str, payload: &Notification) -> Result<()> {
        info!(recipient, event = %payload.event, "notification");
        Ok(())
    }
}

/// POSTs notifications as JSON to a webhook (requires `http-executor`).
pub struct WebhookNotifier {
    url: String,
    #[cfg(feature = "http-executor")]
    client: reqwest::Client,
}

#[derive(Serialize)]
#[cfg_attr(not(feature = "http-executor"), allow(dead_code))]
struct WebhookBody<'a> {
    recipient: &'a str,
    #[serde(flatten)]
    notification: &'a Notification,
}

impl WebhookNotifier {
    /// Create a webhook notifier.
    #[cfg(feature = "http-executor")]
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotaryError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Create a webhook notifier (unavailable when feature disabled).
    #[cfg(not(feature = "http-executor"))]
    pub fn new(_url: impl Into<String>, _timeout: std::time::Duration) -> Result<Self> {
        Err(NotaryError::Unimplemented(
            "webhook notifier not compiled - enable the 'http-executor' feature",
        ))
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    #[cfg(feature = "http-executor")]
    async fn send(&self, recipient: &str, payload: &Notification) -> Result<()> {
        let body = WebhookBody {
            recipient,
            notification: payload,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotaryError::unavailable("webhook", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotaryError::unavailable(
                "webhook",
                format!("{} returned {}", self.url, status),
            ));
        }
        Ok(())
    }

    #[cfg(not(feature = "http-executor"))]
    async fn send(&self, _recipient: &str, _payload: &Notification) -> Result<()> {
        Err(NotaryError::Unimplemented(
            "webhook notifier not compiled - enable the 'http-executor' feature",
        ))
    }
}

/// Notification backend selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    /// Drop notifications.
    #[default]
    None,
    /// Log notifications.
    Log,
    /// POST notifications to a webhook.
    Webhook,
}

impl FromStr for NotifierKind {
    type Err = NotaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "log" => Ok(Self::Log),
            "webhook" => Ok(Self::Webhook),
            other => Err(NotaryError::validation(
                "notifier.backend",
                format!("unknown backend '{}' (expected none, log or webhook)", other),
            )),
        }
    }
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Log => "log",
            Self::Webhook => "webhook",
        };
        f.write_str(name)
    }
}

/// `[notifier]` configuration section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: NotifierKind,
    /// Target for the webhook backend.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Build the configured notifier once, at startup.
pub fn build_notifier(
    config: &NotifierConfig,
    timeout: std::time::Duration,
) -> Result<Arc<dyn Notifier>> {
    match config.backend {
        NotifierKind::None => Ok(Arc::new(NoopNotifier)),
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = config.webhook_url.as_deref().ok_or_else(|| {
                NotaryError::validation("notifier.webhook_url", "required for the webhook backend")
            })?;
            Ok(Arc::new(WebhookNotifier::new(url, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("LOG".parse::<NotifierKind>().unwrap(), NotifierKind::Log);
        assert_eq!("".parse::<NotifierKind>().unwrap(), NotifierKind::None);
        assert!("email".parse::<NotifierKind>().is_err());
        assert_eq!(NotifierKind::Webhook.to_string(), "webhook");
    }

    #[tokio::test]
    async fn test_build_selects_backend() {
        let timeout = Duration::from_secs(1);
        let log = build_notifier(
            &NotifierConfig {
                backend: NotifierKind::Log,
                webhook_url: None,
            },
            timeout,
        )
        .unwrap();
        assert_eq!(log.name(), "log");
        let payload = Notification {
            event: "ping".into(),
            data: serde_json::Value::Null,
        };
        log.send("ops@example.com", &payload).await.unwrap();

        let none = build_notifier(&NotifierConfig::default(), timeout).unwrap();
        assert_eq!(none.name(), "none");
    }

    #[test]
    fn test_webhook_requires_url() {
        let config = NotifierConfig {
            backend: NotifierKind::Webhook,
            webhook_url: None,
        };
        let err = build_notifier(&config, Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, NotaryError::Validation { .. }));
    }

    #[test]
    fn test_webhook_body_flattens_notification() {
        let notification = Notification {
            event: "credential_issued".into(),
            data: serde_json::json!({"totalCredits": 10}),
        };
        let body = WebhookBody {
            recipient: "a@example.com",
            notification: &notification,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["recipient"], "a@example.com");
        assert_eq!(value["event"], "credential_issued");
        assert_eq!(value["data"]["totalCredits"], 10);
    }
}
