use super::{backoff, MAX_ATTEMPTS};
use crate::error::NotifyError;
use crate::{ChannelDelivery, DeliveryOutcome, NotificationChannel};
use async_trait::async_trait;
use chrono::SecondsFormat;
use pulsemon_common::types::{Alert, AlertRule};
use serde_json::Value;

/// POSTs a JSON alert envelope to the rule's `webhook_url`.
pub struct WebhookChannel {
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn post_once(&self, url: &str, body: &Value) -> Result<(), NotifyError> {
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

impl Default for WebhookChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// The outbound envelope consumed by webhook receivers. Field names are
/// part of the wire contract; do not rename.
pub(crate) fn render_envelope(alert: &Alert, rule: &AlertRule) -> Value {
    serde_json::json!({
        "type": "alert",
        "alert": {
            "id": alert.id,
            "ruleName": rule.name,
            "description": rule.description,
            "severity": rule.severity,
            "metricValue": alert.metric_value,
            "threshold": alert.threshold,
            "triggeredAt": alert.triggered_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    })
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &Alert, rule: &AlertRule) -> Vec<ChannelDelivery> {
        let Some(url) = rule.webhook_url.as_deref() else {
            tracing::warn!(
                rule_id = %rule.id,
                "Webhook channel configured but rule has no webhook_url, skipping"
            );
            return Vec::new();
        };

        let body = render_envelope(alert, rule);
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.post_once(url, &body).await {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        alert_id = %alert.id,
                        error = %e,
                        "Webhook send failed, retrying"
                    );
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
            }
        }

        let outcome = match last_err {
            None => DeliveryOutcome::Sent,
            Some(e) => {
                tracing::error!(
                    alert_id = %alert.id,
                    rule_id = %rule.id,
                    error = %e,
                    "Webhook failed after retries"
                );
                DeliveryOutcome::Failed
            }
        };
        vec![ChannelDelivery {
            status_key: "webhook".to_string(),
            outcome,
        }]
    }

    fn channel_key(&self) -> &str {
        "webhook"
    }
}
