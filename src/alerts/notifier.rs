//! Notification delivery for triggered alerts

use std::collections::HashMap;

use chrono::NaiveDateTime;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::calc::Evaluation;

/// A rendered plain-text notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// What a message about one alert is rendered from
#[derive(Debug, Clone, Copy)]
pub struct AlertSummary<'a> {
    pub definition_name: &'a str,
    pub level: &'a str,
    pub meter_name: &'a str,
    pub comparator: &'a str,
    pub evaluation: Evaluation,
    pub timestamp: NaiveDateTime,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn for_alert(to: &str, alert: &AlertSummary<'_>) -> Self {
        let subject = format!("[{}] Alert: {}", alert.level, alert.definition_name);
        let body = format!(
            "Alert '{}' triggered on meter '{}' at {}.\n\
             Observed value {} {} comparison value {}.\n",
            alert.definition_name,
            alert.meter_name,
            alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
            alert.evaluation.data,
            alert.comparator,
            alert.evaluation.value,
        );
        Self::new(to, subject, body)
    }
}

/// Outbound mail transport; returns whether the message was accepted
pub trait Mailer: Send + Sync {
    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, bool>;
}

/// Notification target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotifyTarget {
    /// Log to tracing
    Log,
    /// HTTP mail relay
    Webhook {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

/// Mailer that logs or posts messages to a relay webhook
pub struct Notifier {
    client: reqwest::Client,
    target: NotifyTarget,
}

impl Notifier {
    pub fn new(target: NotifyTarget) -> Self {
        Self {
            client: reqwest::Client::new(),
            target,
        }
    }

    pub fn log() -> Self {
        Self::new(NotifyTarget::Log)
    }

    pub fn target(&self) -> &NotifyTarget {
        &self.target
    }

    pub async fn notify(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        match &self.target {
            NotifyTarget::Log => {
                tracing::warn!(
                    to = %message.to,
                    subject = %message.subject,
                    "Alert notification: {}",
                    message.body.trim_end()
                );
                Ok(())
            }
            NotifyTarget::Webhook { url, headers } => self.send_webhook(url, headers, message).await,
        }
    }

    async fn send_webhook(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        message: &EmailMessage,
    ) -> Result<(), NotifierError> {
        let payload = serde_json::json!({
            "to": message.to,
            "subject": message.subject,
            "body": message.body,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut request = self.client.post(url).json(&payload);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifierError::Webhook(format!("Failed to send webhook: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(to = %message.to, url = %url, "Webhook notification sent");

        Ok(())
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::log()
    }
}

impl Mailer for Notifier {
    fn send<'a>(&'a self, message: &'a EmailMessage) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            match self.notify(message).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(to = %message.to, error = %e, "Failed to send notification");
                    false
                }
            }
        })
    }
}

/// Notifier errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Webhook error: {0}")]
    Webhook(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary() -> AlertSummary<'static> {
        AlertSummary {
            definition_name: "peak power",
            level: "HIGH",
            meter_name: "main board",
            comparator: ">",
            evaluation: Evaluation {
                data: 12.5,
                value: 10.0,
                is_alert: true,
            },
            timestamp: NaiveDate::from_ymd_opt(2019, 7, 31)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_message_for_alert() {
        let message = EmailMessage::for_alert("ops@example.com", &summary());
        assert_eq!(message.to, "ops@example.com");
        assert_eq!(message.subject, "[HIGH] Alert: peak power");
        assert!(message.body.contains("meter 'main board' at 2019-07-31 14:00:00"));
        assert!(message.body.contains("12.5 > comparison value 10"));
    }

    #[tokio::test]
    async fn test_log_notification() {
        let notifier = Notifier::log();
        let message = EmailMessage::for_alert("ops@example.com", &summary());
        assert!(notifier.send(&message).await);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_reports_failure() {
        let notifier = Notifier::new(NotifyTarget::Webhook {
            url: "http://127.0.0.1:9/relay".to_string(),
            headers: HashMap::new(),
        });
        let message = EmailMessage::new("ops@example.com", "subject", "body");
        assert!(!notifier.send(&message).await);
    }

    #[test]
    fn test_target_from_json() {
        let target: NotifyTarget =
            serde_json::from_str(r#"{"type": "Webhook", "url": "http://relay.local/mail"}"#).unwrap();
        assert!(matches!(target, NotifyTarget::Webhook { ref headers, .. } if headers.is_empty()));
    }
}
