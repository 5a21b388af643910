use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulsemon_common::types::{Alert, AlertRule};
use std::collections::HashMap;

/// Durable store for alert rules.
///
/// Implementations must be safe to share across tasks (`Send + Sync`);
/// the evaluator, lifecycle manager, and mute controller all hold the
/// same instance. Counter updates (`record_trigger`) must be atomic
/// single-statement increments, not read-modify-write.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Returns all rules with `is_active = true`. Mute filtering happens
    /// in the evaluator via the eligibility predicate.
    async fn list_active(&self) -> Result<Vec<AlertRule>>;

    async fn get(&self, id: &str) -> Result<Option<AlertRule>>;

    /// Stamps `last_checked_at`, whether or not the rule triggered.
    async fn mark_checked(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Atomically increments `trigger_count` and sets `last_triggered_at`.
    async fn record_trigger(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Sets the mute flag and expiry. Returns false when the rule does
    /// not exist.
    async fn set_mute(
        &self,
        id: &str,
        muted: bool,
        until: Option<DateTime<Utc>>,
    ) -> Result<bool>;
}

/// Durable store for fired alerts. Alerts are an append-only event log:
/// rows are inserted at trigger time and mutated only through the
/// state-machine operations, never deleted.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: &Alert) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Alert>>;

    /// Persists the state-machine fields of an already-inserted alert.
    async fn update_state(&self, alert: &Alert) -> Result<()>;

    /// Records the post-dispatch delivery outcome.
    async fn record_notification(
        &self,
        id: &str,
        notified_at: DateTime<Utc>,
        status: &HashMap<String, String>,
    ) -> Result<()>;
}

/// Fans a freshly created alert out to the rule's configured channels.
///
/// Dispatch is best-effort by contract: implementations record failures
/// in the returned status map (`"sent"` / `"failed"` per status key)
/// instead of returning an error, so alert creation is never rolled back
/// by a delivery problem.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn dispatch(&self, alert: &Alert, rule: &AlertRule) -> HashMap<String, String>;
}
