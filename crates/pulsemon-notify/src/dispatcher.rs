use crate::NotificationChannel;
use async_trait::async_trait;
use pulsemon_engine::repo::AlertNotifier;
use pulsemon_common::types::{Alert, AlertRule};
use std::collections::HashMap;

/// Fans one alert out to every channel key the rule names.
///
/// Channels are attempted independently and in order; a failing channel
/// contributes `"failed"` entries to the status map and the loop moves
/// on. Keys with no registered implementation are skipped. The dispatch
/// itself never errors, so alert creation is never rolled back by a
/// delivery problem.
#[derive(Default)]
pub struct NotificationDispatcher {
    channels: HashMap<String, Box<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Box<dyn NotificationChannel>) {
        self.channels
            .insert(channel.channel_key().to_string(), channel);
    }

    pub fn has_channel(&self, key: &str) -> bool {
        self.channels.contains_key(key)
    }

    pub fn channel_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.channels.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}

#[async_trait]
impl AlertNotifier for NotificationDispatcher {
    async fn dispatch(&self, alert: &Alert, rule: &AlertRule) -> HashMap<String, String> {
        let mut status = HashMap::new();

        for key in &rule.channels {
            let Some(channel) = self.channels.get(key.as_str()) else {
                tracing::debug!(
                    channel = %key,
                    rule_id = %rule.id,
                    "No implementation registered for channel, skipping"
                );
                continue;
            };

            for delivery in channel.send(alert, rule).await {
                status.insert(
                    delivery.status_key,
                    delivery.outcome.as_str().to_string(),
                );
            }
        }

        tracing::info!(
            alert_id = %alert.id,
            rule_id = %rule.id,
            channels = rule.channels.len(),
            entries = status.len(),
            "Notification dispatch finished"
        );
        status
    }
}
