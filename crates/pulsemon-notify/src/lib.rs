//! Notification delivery for fired alerts.
//!
//! Each rule names the channel keys it wants (`"email"`, `"webhook"`,
//! `"slack"`); the [`dispatcher::NotificationDispatcher`] looks up the
//! registered [`NotificationChannel`] per key and sends through each one
//! independently, aggregating `(status_key, outcome)` pairs into the
//! alert's notification-status map. Delivery is best-effort: a channel
//! failure is recorded, never raised.

pub mod channels;
pub mod dispatcher;
pub mod error;


use async_trait::async_trait;
use pulsemon_common::types::{Alert, AlertRule};

/// Outcome of one delivery attempt, as recorded on the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Sent => "sent",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

/// One entry for the alert's notification-status map.
///
/// `status_key` is the map key (`"webhook"`, `"email:<address>"`, …).
#[derive(Debug, Clone)]
pub struct ChannelDelivery {
    pub status_key: String,
    pub outcome: DeliveryOutcome,
}

/// A notification transport (SMTP, webhook, chat).
///
/// `send` must not fail: implementations catch their own transport
/// errors and report them as [`DeliveryOutcome::Failed`] entries so one
/// channel can never block another or roll back the alert.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the alert, returning one outcome per status key. A
    /// channel that has nothing to do (placeholder, missing target)
    /// returns an empty vec.
    async fn send(&self, alert: &Alert, rule: &AlertRule) -> Vec<ChannelDelivery>;

    /// The channel key rules use to select this channel (e.g., `"email"`).
    fn channel_key(&self) -> &str;
}
