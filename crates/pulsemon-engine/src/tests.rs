use crate::aggregate::resolve;
use crate::condition::is_met;
use crate::error::EngineError;
use crate::evaluator::{Evaluator, EvaluatorConfig};
use crate::lifecycle::LifecycleManager;
use crate::mute::{is_eligible, MuteController};
use crate::repo::{AlertNotifier, AlertRepository, RuleRepository};
use crate::source::{MetricCatalog, MetricFetcher};
use crate::validate::validate_rule;
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pulsemon_common::types::{
    Aggregation, Alert, AlertCondition, AlertRule, AlertStatus, MetricComponents, Severity,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn make_rule(id: &str, condition: AlertCondition, threshold: f64) -> AlertRule {
    let now = Utc::now();
    AlertRule {
        id: id.to_string(),
        name: format!("rule {id}"),
        description: None,
        metric_type: "failed_payments".to_string(),
        metric_query: HashMap::new(),
        condition,
        threshold,
        compare_value: None,
        time_window_minutes: 60,
        aggregation: Aggregation::Count,
        severity: Severity::Warning,
        channels: vec!["webhook".to_string()],
        recipients: vec![],
        webhook_url: Some("https://hooks.example.com/x".to_string()),
        is_active: true,
        is_muted: false,
        muted_until: None,
        last_checked_at: None,
        last_triggered_at: None,
        trigger_count: 0,
        created_by_id: "user-1".to_string(),
        created_at: now,
        updated_at: now,
    }
}

// ---- In-memory fakes ----

#[derive(Default)]
struct InMemoryRules {
    rules: Mutex<HashMap<String, AlertRule>>,
}

impl InMemoryRules {
    fn with(rules: Vec<AlertRule>) -> Arc<Self> {
        let map = rules.into_iter().map(|r| (r.id.clone(), r)).collect();
        Arc::new(Self {
            rules: Mutex::new(map),
        })
    }

    fn get_sync(&self, id: &str) -> Option<AlertRule> {
        self.rules.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl RuleRepository for InMemoryRules {
    async fn list_active(&self) -> AnyResult<Vec<AlertRule>> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> AnyResult<Option<AlertRule>> {
        Ok(self.get_sync(id))
    }

    async fn mark_checked(&self, id: &str, at: DateTime<Utc>) -> AnyResult<()> {
        if let Some(rule) = self.rules.lock().unwrap().get_mut(id) {
            rule.last_checked_at = Some(at);
        }
        Ok(())
    }

    async fn record_trigger(&self, id: &str, at: DateTime<Utc>) -> AnyResult<()> {
        if let Some(rule) = self.rules.lock().unwrap().get_mut(id) {
            rule.trigger_count += 1;
            rule.last_triggered_at = Some(at);
        }
        Ok(())
    }

    async fn set_mute(
        &self,
        id: &str,
        muted: bool,
        until: Option<DateTime<Utc>>,
    ) -> AnyResult<bool> {
        let mut rules = self.rules.lock().unwrap();
        match rules.get_mut(id) {
            Some(rule) => {
                rule.is_muted = muted;
                rule.muted_until = until;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
struct InMemoryAlerts {
    alerts: Mutex<HashMap<String, Alert>>,
    fail_notification_write: bool,
}

impl InMemoryAlerts {
    fn all(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlerts {
    async fn insert(&self, alert: &Alert) -> AnyResult<()> {
        self.alerts
            .lock()
            .unwrap()
            .insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> AnyResult<Option<Alert>> {
        Ok(self.alerts.lock().unwrap().get(id).cloned())
    }

    async fn update_state(&self, alert: &Alert) -> AnyResult<()> {
        self.alerts
            .lock()
            .unwrap()
            .insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn record_notification(
        &self,
        id: &str,
        notified_at: DateTime<Utc>,
        status: &HashMap<String, String>,
    ) -> AnyResult<()> {
        if self.fail_notification_write {
            anyhow::bail!("simulated write failure");
        }
        if let Some(alert) = self.alerts.lock().unwrap().get_mut(id) {
            alert.notified_at = Some(notified_at);
            alert.notification_status = status.clone();
        }
        Ok(())
    }
}

struct StaticFetcher(MetricComponents);

#[async_trait]
impl MetricFetcher for StaticFetcher {
    async fn fetch(
        &self,
        _query: &HashMap<String, String>,
        _window_minutes: i64,
        _now: DateTime<Utc>,
    ) -> AnyResult<MetricComponents> {
        Ok(self.0)
    }
}

struct FailingFetcher;

#[async_trait]
impl MetricFetcher for FailingFetcher {
    async fn fetch(
        &self,
        _query: &HashMap<String, String>,
        _window_minutes: i64,
        _now: DateTime<Utc>,
    ) -> AnyResult<MetricComponents> {
        anyhow::bail!("metric store unavailable")
    }
}

struct RecordingNotifier {
    statuses: HashMap<String, String>,
    dispatched: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn returning(statuses: HashMap<String, String>) -> Arc<Self> {
        Arc::new(Self {
            statuses,
            dispatched: Mutex::new(Vec::new()),
        })
    }

    fn sent_webhook() -> Arc<Self> {
        Self::returning(HashMap::from([("webhook".to_string(), "sent".to_string())]))
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn dispatch(&self, alert: &Alert, _rule: &AlertRule) -> HashMap<String, String> {
        self.dispatched.lock().unwrap().push(alert.id.clone());
        self.statuses.clone()
    }
}

fn count_components(count: u64) -> MetricComponents {
    MetricComponents {
        sum: count as f64,
        avg: 1.0,
        count,
        min: Some(1.0),
        max: Some(1.0),
    }
}

struct Harness {
    rules: Arc<InMemoryRules>,
    alerts: Arc<InMemoryAlerts>,
    notifier: Arc<RecordingNotifier>,
    evaluator: Arc<Evaluator>,
}

fn harness(rules: Vec<AlertRule>, fetcher: Box<dyn MetricFetcher>) -> Harness {
    let rules = InMemoryRules::with(rules);
    let alerts = Arc::new(InMemoryAlerts::default());
    let notifier = RecordingNotifier::sent_webhook();
    let mut catalog = MetricCatalog::new();
    catalog.register("failed_payments", fetcher);
    let lifecycle = Arc::new(LifecycleManager::new(
        rules.clone(),
        alerts.clone(),
        notifier.clone(),
    ));
    let evaluator = Arc::new(Evaluator::new(
        rules.clone(),
        Arc::new(catalog),
        lifecycle,
        EvaluatorConfig::default(),
    ));
    Harness {
        rules,
        alerts,
        notifier,
        evaluator,
    }
}

// ---- Condition evaluator ----

#[test]
fn greater_than_is_strict_complement_of_less_than_or_equal() {
    let samples = [
        (0.0, 0.0),
        (1.0, 0.0),
        (-1.0, 0.0),
        (5.0, 5.0),
        (5.000001, 5.0),
        (-3.5, 2.5),
    ];
    for (value, threshold) in samples {
        let gt = is_met(value, AlertCondition::GreaterThan, threshold, None);
        let lte = is_met(value, AlertCondition::LessThanOrEqual, threshold, None);
        assert_eq!(gt, value > threshold, "value={value} threshold={threshold}");
        assert_ne!(gt, lte, "GT and LTE must partition value={value}");
    }
}

#[test]
fn equality_conditions() {
    assert!(is_met(5.0, AlertCondition::Equals, 5.0, None));
    assert!(!is_met(5.1, AlertCondition::Equals, 5.0, None));
    assert!(is_met(5.1, AlertCondition::NotEquals, 5.0, None));
    assert!(is_met(4.0, AlertCondition::LessThan, 5.0, None));
    assert!(is_met(5.0, AlertCondition::GreaterThanOrEqual, 5.0, None));
}

#[test]
fn percentage_increase_triggers_at_or_above_threshold() {
    // 150 over a baseline of 100 is a 50% increase, at least the 40% bar.
    assert!(is_met(
        150.0,
        AlertCondition::PercentageIncrease,
        40.0,
        Some(100.0)
    ));
    assert!(!is_met(
        130.0,
        AlertCondition::PercentageIncrease,
        40.0,
        Some(100.0)
    ));
    // Exactly at threshold counts.
    assert!(is_met(
        140.0,
        AlertCondition::PercentageIncrease,
        40.0,
        Some(100.0)
    ));
}

#[test]
fn percentage_decrease_triggers_on_drop() {
    assert!(is_met(
        50.0,
        AlertCondition::PercentageDecrease,
        40.0,
        Some(100.0)
    ));
    assert!(!is_met(
        80.0,
        AlertCondition::PercentageDecrease,
        40.0,
        Some(100.0)
    ));
}

#[test]
fn percentage_conditions_never_trigger_without_usable_baseline() {
    for condition in [
        AlertCondition::PercentageIncrease,
        AlertCondition::PercentageDecrease,
    ] {
        assert!(!is_met(1_000_000.0, condition, 0.0, Some(0.0)));
        assert!(!is_met(1_000_000.0, condition, 0.0, None));
        assert!(!is_met(-1_000_000.0, condition, 0.0, Some(0.0)));
    }
}

#[test]
fn anomaly_never_triggers() {
    for value in [-1.0, 0.0, 1.0, f64::MAX] {
        assert!(!is_met(value, AlertCondition::Anomaly, 0.0, Some(100.0)));
    }
}

// ---- Aggregation resolver ----

#[test]
fn aggregation_resolves_to_matching_component() {
    let c = MetricComponents {
        sum: 210.0,
        avg: 30.0,
        count: 7,
        min: Some(10.0),
        max: Some(55.0),
    };
    assert_eq!(resolve(Aggregation::Sum, &c), 210.0);
    assert_eq!(resolve(Aggregation::Avg, &c), 30.0);
    assert_eq!(resolve(Aggregation::Count, &c), 7.0);
    assert_eq!(resolve(Aggregation::Min, &c), 10.0);
    assert_eq!(resolve(Aggregation::Max, &c), 55.0);
    assert_eq!(resolve(Aggregation::DistinctCount, &c), 7.0);
}

#[test]
fn aggregation_missing_extrema_resolve_to_zero() {
    let c = MetricComponents {
        sum: 0.0,
        avg: 0.0,
        count: 0,
        min: None,
        max: None,
    };
    assert_eq!(resolve(Aggregation::Min, &c), 0.0);
    assert_eq!(resolve(Aggregation::Max, &c), 0.0);
}

// ---- Eligibility predicate ----

#[test]
fn eligibility_respects_active_and_mute_state() {
    let now = Utc::now();
    let mut rule = make_rule("r1", AlertCondition::GreaterThan, 5.0);
    assert!(is_eligible(&rule, now));

    rule.is_active = false;
    assert!(!is_eligible(&rule, now));

    rule.is_active = true;
    rule.is_muted = true;
    rule.muted_until = None;
    assert!(!is_eligible(&rule, now), "indefinite mute never expires");

    rule.muted_until = Some(now + Duration::minutes(10));
    assert!(!is_eligible(&rule, now));

    // A past expiry makes the rule eligible even though is_muted is still set.
    rule.muted_until = Some(now - Duration::minutes(1));
    assert!(is_eligible(&rule, now));
}

// ---- Rule validation ----

#[test]
fn validation_rejects_malformed_rules() {
    let rule = make_rule("r1", AlertCondition::GreaterThan, 5.0);
    assert!(validate_rule(&rule).is_ok());

    let mut bad = rule.clone();
    bad.time_window_minutes = 0;
    assert!(matches!(
        validate_rule(&bad),
        Err(EngineError::InvalidRule(_))
    ));

    let mut bad = rule.clone();
    bad.threshold = f64::NAN;
    assert!(validate_rule(&bad).is_err());

    let mut bad = rule.clone();
    bad.name = "  ".to_string();
    assert!(validate_rule(&bad).is_err());

    let mut bad = rule.clone();
    bad.condition = AlertCondition::PercentageIncrease;
    bad.compare_value = None;
    assert!(validate_rule(&bad).is_err());
    bad.compare_value = Some(100.0);
    assert!(validate_rule(&bad).is_ok());
}

// ---- Mute controller ----

#[tokio::test]
async fn mute_overwrites_expiry_and_unmute_clears() {
    let rules = InMemoryRules::with(vec![make_rule("r1", AlertCondition::GreaterThan, 5.0)]);
    let controller = MuteController::new(rules.clone());
    let now = Utc::now();

    controller.mute("r1", Some(30), now).await.unwrap();
    let rule = rules.get_sync("r1").unwrap();
    assert!(rule.is_muted);
    assert_eq!(rule.muted_until, Some(now + Duration::minutes(30)));

    // Re-muting with a new duration overwrites the previous expiry.
    controller.mute("r1", Some(120), now).await.unwrap();
    let rule = rules.get_sync("r1").unwrap();
    assert_eq!(rule.muted_until, Some(now + Duration::minutes(120)));

    // No duration means indefinite.
    controller.mute("r1", None, now).await.unwrap();
    let rule = rules.get_sync("r1").unwrap();
    assert!(rule.is_muted);
    assert_eq!(rule.muted_until, None);

    controller.unmute("r1").await.unwrap();
    let rule = rules.get_sync("r1").unwrap();
    assert!(!rule.is_muted);
    assert_eq!(rule.muted_until, None);
}

#[tokio::test]
async fn mute_unknown_rule_is_not_found() {
    let rules = InMemoryRules::with(vec![]);
    let controller = MuteController::new(rules);
    let err = controller.mute("ghost", Some(5), Utc::now()).await;
    assert!(matches!(err, Err(EngineError::NotFound { .. })));
}

// ---- Lifecycle state machine ----

fn lifecycle_harness() -> (Arc<InMemoryRules>, Arc<InMemoryAlerts>, LifecycleManager) {
    let rules = InMemoryRules::with(vec![make_rule("r1", AlertCondition::GreaterThan, 5.0)]);
    let alerts = Arc::new(InMemoryAlerts::default());
    let manager = LifecycleManager::new(
        rules.clone(),
        alerts.clone(),
        RecordingNotifier::sent_webhook(),
    );
    (rules, alerts, manager)
}

#[tokio::test]
async fn trigger_snapshots_value_and_updates_rule_bookkeeping() {
    let (rules, alerts, manager) = lifecycle_harness();
    let rule = rules.get_sync("r1").unwrap();
    let now = Utc::now();

    let alert = manager.trigger(&rule, 7.0, now).await.unwrap();
    assert_eq!(alert.status, AlertStatus::Triggered);
    assert_eq!(alert.metric_value, 7.0);
    assert_eq!(alert.threshold, 5.0);
    assert_eq!(alert.triggered_at, now);
    assert_eq!(
        alert.notification_status.get("webhook").map(String::as_str),
        Some("sent")
    );
    assert!(alert.notified_at.is_some());

    let rule = rules.get_sync("r1").unwrap();
    assert_eq!(rule.trigger_count, 1);
    assert_eq!(rule.last_triggered_at, Some(now));
    assert_eq!(alerts.all().len(), 1);
}

#[tokio::test]
async fn repeated_firings_append_new_alerts() {
    let (rules, alerts, manager) = lifecycle_harness();
    let rule = rules.get_sync("r1").unwrap();
    let now = Utc::now();

    let first = manager.trigger(&rule, 7.0, now).await.unwrap();
    manager
        .resolve(&first.id, Some("fixed".into()), now)
        .await
        .unwrap();
    let second = manager.trigger(&rule, 9.0, now).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(alerts.all().len(), 2);
    assert_eq!(rules.get_sync("r1").unwrap().trigger_count, 2);
}

#[tokio::test]
async fn acknowledge_then_resolve_walks_forward() {
    let (rules, _alerts, manager) = lifecycle_harness();
    let rule = rules.get_sync("r1").unwrap();
    let now = Utc::now();

    let alert = manager.trigger(&rule, 7.0, now).await.unwrap();
    let acked = manager.acknowledge(&alert.id, "ops-1", now).await.unwrap();
    assert_eq!(acked.status, AlertStatus::Acknowledged);
    assert_eq!(acked.acknowledged_by_id.as_deref(), Some("ops-1"));
    assert_eq!(acked.acknowledged_at, Some(now));

    let resolved = manager
        .resolve(&alert.id, Some("false positive".into()), now)
        .await
        .unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert_eq!(resolved.resolution.as_deref(), Some("false positive"));
    assert_eq!(resolved.resolved_at, Some(now));
}

#[tokio::test]
async fn resolve_directly_from_triggered() {
    let (rules, _alerts, manager) = lifecycle_harness();
    let rule = rules.get_sync("r1").unwrap();
    let now = Utc::now();

    let alert = manager.trigger(&rule, 7.0, now).await.unwrap();
    let resolved = manager.resolve(&alert.id, None, now).await.unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
}

#[tokio::test]
async fn status_never_moves_backward() {
    let (rules, alerts, manager) = lifecycle_harness();
    let rule = rules.get_sync("r1").unwrap();
    let now = Utc::now();

    let alert = manager.trigger(&rule, 7.0, now).await.unwrap();
    manager.resolve(&alert.id, None, now).await.unwrap();

    let err = manager.acknowledge(&alert.id, "ops-1", now).await;
    assert!(matches!(err, Err(EngineError::InvalidState { .. })));
    let err = manager.resolve(&alert.id, None, now).await;
    assert!(matches!(err, Err(EngineError::InvalidState { .. })));

    // The stored alert is unchanged by the rejected transitions.
    let stored = alerts.all().pop().unwrap();
    assert_eq!(stored.status, AlertStatus::Resolved);
    assert!(stored.acknowledged_by_id.is_none());
}

#[tokio::test]
async fn acknowledge_twice_is_rejected() {
    let (rules, _alerts, manager) = lifecycle_harness();
    let rule = rules.get_sync("r1").unwrap();
    let now = Utc::now();

    let alert = manager.trigger(&rule, 7.0, now).await.unwrap();
    manager.acknowledge(&alert.id, "ops-1", now).await.unwrap();
    let err = manager.acknowledge(&alert.id, "ops-2", now).await;
    assert!(matches!(err, Err(EngineError::InvalidState { .. })));
}

#[tokio::test]
async fn unknown_alert_is_not_found() {
    let (_rules, _alerts, manager) = lifecycle_harness();
    let err = manager.acknowledge("ghost", "ops-1", Utc::now()).await;
    assert!(matches!(err, Err(EngineError::NotFound { .. })));
}

#[tokio::test]
async fn failed_status_write_does_not_roll_back_alert() {
    let rules = InMemoryRules::with(vec![make_rule("r1", AlertCondition::GreaterThan, 5.0)]);
    let alerts = Arc::new(InMemoryAlerts {
        fail_notification_write: true,
        ..InMemoryAlerts::default()
    });
    let manager = LifecycleManager::new(
        rules.clone(),
        alerts.clone(),
        RecordingNotifier::sent_webhook(),
    );
    let rule = rules.get_sync("r1").unwrap();

    let alert = manager.trigger(&rule, 7.0, Utc::now()).await.unwrap();
    assert_eq!(alert.status, AlertStatus::Triggered);
    assert_eq!(alerts.all().len(), 1);
}

// ---- Batch evaluator ----

#[tokio::test]
async fn quiet_rule_updates_last_checked_only() {
    let h = harness(
        vec![make_rule("r1", AlertCondition::GreaterThan, 5.0)],
        Box::new(StaticFetcher(count_components(3))),
    );
    let now = Utc::now();

    let summary = h.evaluator.run_batch(now).await;
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.triggered, 0);
    assert_eq!(summary.failed, 0);

    let rule = h.rules.get_sync("r1").unwrap();
    assert_eq!(rule.last_checked_at, Some(now));
    assert_eq!(rule.trigger_count, 0);
    assert!(rule.last_triggered_at.is_none());
    assert!(h.alerts.all().is_empty());
}

#[tokio::test]
async fn breaching_rule_creates_alert_and_notifies() {
    let h = harness(
        vec![make_rule("r1", AlertCondition::GreaterThan, 5.0)],
        Box::new(StaticFetcher(count_components(7))),
    );
    let now = Utc::now();

    let summary = h.evaluator.run_batch(now).await;
    assert_eq!(summary.triggered, 1);

    let alerts = h.alerts.all();
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.rule_id, "r1");
    assert_eq!(alert.metric_value, 7.0);
    assert_eq!(alert.threshold, 5.0);
    assert_eq!(alert.status, AlertStatus::Triggered);
    assert_eq!(
        alert.notification_status.get("webhook").map(String::as_str),
        Some("sent")
    );
    assert_eq!(h.notifier.dispatched.lock().unwrap().len(), 1);

    let rule = h.rules.get_sync("r1").unwrap();
    assert_eq!(rule.trigger_count, 1);
    assert_eq!(rule.last_checked_at, Some(now));
}

#[tokio::test]
async fn failing_metric_source_does_not_abort_batch() {
    let mut bad = make_rule("bad", AlertCondition::GreaterThan, 5.0);
    bad.metric_type = "broken_metric".to_string();
    let good = make_rule("good", AlertCondition::GreaterThan, 5.0);

    let rules = InMemoryRules::with(vec![bad, good]);
    let alerts = Arc::new(InMemoryAlerts::default());
    let notifier = RecordingNotifier::sent_webhook();
    let mut catalog = MetricCatalog::new();
    catalog.register("failed_payments", Box::new(StaticFetcher(count_components(7))));
    catalog.register("broken_metric", Box::new(FailingFetcher));
    let lifecycle = Arc::new(LifecycleManager::new(
        rules.clone(),
        alerts.clone(),
        notifier,
    ));
    let evaluator = Arc::new(Evaluator::new(
        rules.clone(),
        Arc::new(catalog),
        lifecycle,
        EvaluatorConfig::default(),
    ));

    let now = Utc::now();
    let summary = evaluator.run_batch(now).await;
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.triggered, 1);
    assert_eq!(summary.failed, 1);

    // Both rules were attempted, so both got last_checked_at.
    assert_eq!(rules.get_sync("bad").unwrap().last_checked_at, Some(now));
    assert_eq!(rules.get_sync("good").unwrap().last_checked_at, Some(now));
    assert_eq!(alerts.all().len(), 1);
    assert_eq!(alerts.all()[0].rule_id, "good");
}

#[tokio::test]
async fn unknown_metric_type_fails_only_that_rule() {
    let mut rule = make_rule("r1", AlertCondition::GreaterThan, 5.0);
    rule.metric_type = "no_such_metric".to_string();
    let h = harness(vec![rule], Box::new(StaticFetcher(count_components(7))));

    let now = Utc::now();
    let summary = h.evaluator.run_batch(now).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(h.rules.get_sync("r1").unwrap().last_checked_at, Some(now));
    assert!(h.alerts.all().is_empty());
}

#[tokio::test]
async fn muted_rules_are_skipped_until_expiry() {
    let mut muted = make_rule("muted", AlertCondition::GreaterThan, 5.0);
    muted.is_muted = true;
    muted.muted_until = Some(Utc::now() + Duration::hours(1));
    let mut expired = make_rule("expired", AlertCondition::GreaterThan, 5.0);
    expired.is_muted = true;
    expired.muted_until = Some(Utc::now() - Duration::hours(1));

    let h = harness(
        vec![muted, expired],
        Box::new(StaticFetcher(count_components(7))),
    );
    let summary = h.evaluator.run_batch(Utc::now()).await;

    // Only the expired-mute rule is evaluated, and it fires.
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.triggered, 1);
    assert_eq!(h.alerts.all()[0].rule_id, "expired");
    assert!(h.rules.get_sync("muted").unwrap().last_checked_at.is_none());
}

#[tokio::test]
async fn percentage_rule_without_baseline_stays_quiet_in_batch() {
    let mut rule = make_rule("r1", AlertCondition::PercentageIncrease, 40.0);
    rule.compare_value = None;
    let h = harness(
        vec![rule],
        Box::new(StaticFetcher(count_components(1_000_000))),
    );

    let summary = h.evaluator.run_batch(Utc::now()).await;
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.triggered, 0);
    assert_eq!(summary.failed, 0);
    assert!(h.alerts.all().is_empty());
}

// End-to-end: failed_payments > 5 over 60 minutes with COUNT aggregation.
#[tokio::test]
async fn failed_payments_scenario_fires_webhook() {
    let mut rule = make_rule("r1", AlertCondition::GreaterThan, 5.0);
    rule.metric_type = "failed_payments".to_string();
    rule.time_window_minutes = 60;
    rule.aggregation = Aggregation::Count;
    rule.channels = vec!["webhook".to_string()];
    rule.webhook_url = Some("https://x".to_string());

    let h = harness(vec![rule], Box::new(StaticFetcher(count_components(7))));
    let summary = h.evaluator.run_batch(Utc::now()).await;
    assert_eq!(summary.triggered, 1);

    let alert = h.alerts.all().pop().unwrap();
    assert_eq!(alert.metric_value, 7.0);
    assert_eq!(alert.threshold, 5.0);
    assert_eq!(alert.status, AlertStatus::Triggered);
    assert_eq!(
        alert.notification_status,
        HashMap::from([("webhook".to_string(), "sent".to_string())])
    );
}
