use crate::error::{EngineError, Result};
use crate::repo::RuleRepository;
use chrono::{DateTime, Duration, Utc};
use pulsemon_common::types::AlertRule;
use std::sync::Arc;

/// Whether a rule may be evaluated at `now`.
///
/// A muted rule becomes eligible again the moment `muted_until` passes;
/// expiry is implicit, no unmute write happens. A mute without an expiry
/// holds until an explicit unmute.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use pulsemon_common::types::{Aggregation, AlertCondition, AlertRule, Severity};
/// use pulsemon_engine::mute::is_eligible;
///
/// let now = Utc::now();
/// let mut rule = AlertRule {
///     id: "r1".into(), name: "failed payments".into(), description: None,
///     metric_type: "failed_payments".into(), metric_query: Default::default(),
///     condition: AlertCondition::GreaterThan, threshold: 5.0, compare_value: None,
///     time_window_minutes: 60, aggregation: Aggregation::Count,
///     severity: Severity::Warning, channels: vec![], recipients: vec![],
///     webhook_url: None, is_active: true, is_muted: false, muted_until: None,
///     last_checked_at: None, last_triggered_at: None, trigger_count: 0,
///     created_by_id: "u1".into(), created_at: now, updated_at: now,
/// };
///
/// rule.is_muted = true;
/// rule.muted_until = Some(now - Duration::minutes(1));
/// assert!(is_eligible(&rule, now));
///
/// rule.muted_until = None;
/// assert!(!is_eligible(&rule, now));
/// ```
pub fn is_eligible(rule: &AlertRule, now: DateTime<Utc>) -> bool {
    if !rule.is_active {
        return false;
    }
    if !rule.is_muted {
        return true;
    }
    rule.muted_until.is_some_and(|until| until <= now)
}

/// Suppresses and restores rule eligibility.
pub struct MuteController {
    rules: Arc<dyn RuleRepository>,
}

impl MuteController {
    pub fn new(rules: Arc<dyn RuleRepository>) -> Self {
        Self { rules }
    }

    /// Mutes a rule. With a duration, `muted_until = now + duration`
    /// (re-muting overwrites any previous expiry); without one the mute
    /// is indefinite.
    pub async fn mute(
        &self,
        rule_id: &str,
        duration_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let until = duration_minutes.map(|m| now + Duration::minutes(m));
        let found = self.rules.set_mute(rule_id, true, until).await?;
        if !found {
            return Err(EngineError::NotFound {
                entity: "alert_rule",
                id: rule_id.to_string(),
            });
        }
        tracing::info!(rule_id, until = ?until, "Rule muted");
        Ok(())
    }

    /// Clears both the mute flag and its expiry.
    pub async fn unmute(&self, rule_id: &str) -> Result<()> {
        let found = self.rules.set_mute(rule_id, false, None).await?;
        if !found {
            return Err(EngineError::NotFound {
                entity: "alert_rule",
                id: rule_id.to_string(),
            });
        }
        tracing::info!(rule_id, "Rule unmuted");
        Ok(())
    }
}
