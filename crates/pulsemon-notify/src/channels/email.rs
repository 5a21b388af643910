use super::{backoff, MAX_ATTEMPTS};
use crate::error::{NotifyError, Result};
use crate::{ChannelDelivery, DeliveryOutcome, NotificationChannel};
use async_trait::async_trait;
use chrono::SecondsFormat;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pulsemon_common::types::{Alert, AlertRule};

/// Sends alert email to each of the rule's recipients over SMTP.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl EmailChannel {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(smtp_port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
        })
    }

    async fn send_one(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| NotifyError::Address(self.from.clone()))?,
            )
            .to(recipient
                .parse()
                .map_err(|_| NotifyError::Address(recipient.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        Ok(())
    }
}

/// Subject line contract: `[<SEVERITY>] Alert: <ruleName>`.
pub(crate) fn format_subject(rule: &AlertRule) -> String {
    format!("[{}] Alert: {}", rule.severity, rule.name)
}

pub(crate) fn format_body(alert: &Alert, rule: &AlertRule) -> String {
    let description_line = match rule.description.as_deref() {
        Some(d) if !d.is_empty() => format!("\nDescription: {d}"),
        _ => String::new(),
    };
    format!(
        "Alert: {name}{description_line}\nSeverity: {severity}\nMetric value: {value:.2}\nThreshold: {threshold:.2}\nTriggered at: {time}",
        name = rule.name,
        description_line = description_line,
        severity = rule.severity,
        value = alert.metric_value,
        threshold = alert.threshold,
        time = alert.triggered_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, alert: &Alert, rule: &AlertRule) -> Vec<ChannelDelivery> {
        if rule.recipients.is_empty() {
            tracing::warn!(
                rule_id = %rule.id,
                "Email channel configured but rule has no recipients, skipping"
            );
            return Vec::new();
        }

        let subject = format_subject(rule);
        let body = format_body(alert, rule);
        let mut deliveries = Vec::with_capacity(rule.recipients.len());

        for recipient in &rule.recipients {
            let mut last_err = None;
            for attempt in 0..MAX_ATTEMPTS {
                match self.send_one(recipient, &subject, &body).await {
                    Ok(()) => {
                        last_err = None;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            recipient = %recipient,
                            error = %e,
                            "Email send failed, retrying"
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
                        recipient = %recipient,
                        alert_id = %alert.id,
                        error = %e,
                        "Email failed after retries"
                    );
                    DeliveryOutcome::Failed
                }
            };
            deliveries.push(ChannelDelivery {
                status_key: format!("email:{recipient}"),
                outcome,
            });
        }

        deliveries
    }

    fn channel_key(&self) -> &str {
        "email"
    }
}
