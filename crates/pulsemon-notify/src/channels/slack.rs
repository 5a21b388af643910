use crate::{ChannelDelivery, NotificationChannel};
use async_trait::async_trait;
use pulsemon_common::types::{Alert, AlertRule};

/// Placeholder for the chat integration. Rules may already list the
/// `"slack"` key; until a transport lands this channel delivers nothing
/// and records nothing.
pub struct SlackChannel;

#[async_trait]
impl NotificationChannel for SlackChannel {
    async fn send(&self, alert: &Alert, rule: &AlertRule) -> Vec<ChannelDelivery> {
        tracing::info!(
            alert_id = %alert.id,
            rule_id = %rule.id,
            "Slack channel is a placeholder, nothing sent"
        );
        Vec::new()
    }

    fn channel_key(&self) -> &str {
        "slack"
    }
}
