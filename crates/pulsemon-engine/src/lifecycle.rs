use crate::error::{EngineError, Result};
use crate::repo::{AlertNotifier, AlertRepository, RuleRepository};
use chrono::{DateTime, Utc};
use pulsemon_common::types::{Alert, AlertRule, AlertStatus};
use std::collections::HashMap;
use std::sync::Arc;

/// Owns alert creation and the TRIGGERED → ACKNOWLEDGED → RESOLVED
/// state machine.
///
/// Transitions are forward-only: acknowledging is legal only from
/// TRIGGERED, resolving from TRIGGERED or ACKNOWLEDGED, and nothing
/// leaves RESOLVED. A fresh firing of the same rule always creates a
/// brand-new alert row.
pub struct LifecycleManager {
    rules: Arc<dyn RuleRepository>,
    alerts: Arc<dyn AlertRepository>,
    notifier: Arc<dyn AlertNotifier>,
}

impl LifecycleManager {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        alerts: Arc<dyn AlertRepository>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            rules,
            alerts,
            notifier,
        }
    }

    /// Materializes a TRIGGERED alert for a positive evaluation.
    ///
    /// The alert row is committed and the rule's trigger counters are
    /// updated before any notification is attempted; channel failures and
    /// even a failed status write leave the alert in place.
    pub async fn trigger(
        &self,
        rule: &AlertRule,
        metric_value: f64,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        let mut alert = Alert {
            id: pulsemon_common::id::next_id(),
            rule_id: rule.id.clone(),
            metric_value,
            threshold: rule.threshold,
            status: AlertStatus::Triggered,
            triggered_at: now,
            notified_at: None,
            notification_status: HashMap::new(),
            acknowledged_by_id: None,
            acknowledged_at: None,
            resolution: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };

        self.alerts.insert(&alert).await?;
        self.rules.record_trigger(&rule.id, now).await?;

        tracing::info!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            alert_id = %alert.id,
            metric_value,
            threshold = rule.threshold,
            severity = %rule.severity,
            "Alert triggered"
        );

        let status = self.notifier.dispatch(&alert, rule).await;
        let notified_at = Utc::now();
        if let Err(e) = self
            .alerts
            .record_notification(&alert.id, notified_at, &status)
            .await
        {
            tracing::error!(alert_id = %alert.id, error = %e, "Failed to record notification status");
        }
        alert.notified_at = Some(notified_at);
        alert.notification_status = status;

        Ok(alert)
    }

    /// Marks a TRIGGERED alert as acknowledged by `user_id`.
    pub async fn acknowledge(
        &self,
        alert_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        let mut alert = self.get_alert(alert_id).await?;
        if alert.status != AlertStatus::Triggered {
            return Err(EngineError::InvalidState {
                from: alert.status,
                to: AlertStatus::Acknowledged,
            });
        }
        alert.status = AlertStatus::Acknowledged;
        alert.acknowledged_by_id = Some(user_id.to_string());
        alert.acknowledged_at = Some(now);
        alert.updated_at = now;
        self.alerts.update_state(&alert).await?;
        tracing::info!(alert_id, user_id, "Alert acknowledged");
        Ok(alert)
    }

    /// Resolves an alert from TRIGGERED or ACKNOWLEDGED.
    pub async fn resolve(
        &self,
        alert_id: &str,
        resolution: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        let mut alert = self.get_alert(alert_id).await?;
        if alert.status == AlertStatus::Resolved {
            return Err(EngineError::InvalidState {
                from: alert.status,
                to: AlertStatus::Resolved,
            });
        }
        alert.status = AlertStatus::Resolved;
        alert.resolution = resolution;
        alert.resolved_at = Some(now);
        alert.updated_at = now;
        self.alerts.update_state(&alert).await?;
        tracing::info!(alert_id, "Alert resolved");
        Ok(alert)
    }

    async fn get_alert(&self, alert_id: &str) -> Result<Alert> {
        self.alerts
            .get(alert_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "alert",
                id: alert_id.to_string(),
            })
    }
}
