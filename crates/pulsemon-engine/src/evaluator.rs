use crate::error::{EngineError, Result};
use crate::lifecycle::LifecycleManager;
use crate::mute::is_eligible;
use crate::repo::RuleRepository;
use crate::source::MetricCatalog;
use crate::{aggregate, condition};
use chrono::{DateTime, Utc};
use pulsemon_common::types::{Alert, AlertRule};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Bounds for one evaluation batch.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Max rules evaluated concurrently within a batch.
    pub max_concurrent: usize,
    /// Per-rule timeout on the metric source call.
    pub fetch_timeout: Duration,
    /// Overall deadline for the batch; stragglers are aborted.
    pub batch_deadline: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            fetch_timeout: Duration::from_secs(10),
            batch_deadline: Duration::from_secs(300),
        }
    }
}

/// Counts for one batch tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub evaluated: usize,
    pub triggered: usize,
    pub failed: usize,
    /// True when the tick was dropped because a batch was still running.
    pub skipped: bool,
}

enum RuleOutcome {
    Triggered,
    Quiet,
    Failed,
}

/// Runs the per-rule pipeline (metric fetch → aggregation → condition →
/// lifecycle) over all eligible rules.
///
/// Rules are independent: a failing rule is logged and the batch moves
/// on, and every attempted rule gets its `last_checked_at` stamped
/// whether or not it triggered. Overlapping ticks are rejected by a
/// single-batch-at-a-time gate so no rule is evaluated twice in flight.
pub struct Evaluator {
    rules: Arc<dyn RuleRepository>,
    source: Arc<MetricCatalog>,
    lifecycle: Arc<LifecycleManager>,
    config: EvaluatorConfig,
    batch_gate: Mutex<()>,
}

impl Evaluator {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        source: Arc<MetricCatalog>,
        lifecycle: Arc<LifecycleManager>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            rules,
            source,
            lifecycle,
            config,
            batch_gate: Mutex::new(()),
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.source
    }

    /// Evaluates one batch at `now` and returns its counts.
    pub async fn run_batch(&self, now: DateTime<Utc>) -> BatchSummary {
        let Ok(_gate) = self.batch_gate.try_lock() else {
            tracing::warn!("Evaluation batch still in flight, skipping tick");
            return BatchSummary {
                skipped: true,
                ..BatchSummary::default()
            };
        };

        let rules = match self.rules.list_active().await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load active rules");
                return BatchSummary::default();
            }
        };

        let eligible: Vec<AlertRule> = rules
            .into_iter()
            .filter(|rule| is_eligible(rule, now))
            .collect();
        if eligible.is_empty() {
            return BatchSummary::default();
        }

        tracing::debug!(count = eligible.len(), "Evaluating eligible rules");

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks = JoinSet::new();

        for rule in eligible {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let rules = self.rules.clone();
            let source = self.source.clone();
            let lifecycle = self.lifecycle.clone();
            let fetch_timeout = self.config.fetch_timeout;
            tasks.spawn(async move {
                let outcome =
                    evaluate_rule(&source, &lifecycle, fetch_timeout, &rule, now).await;

                // The rule was attempted; stamp it regardless of outcome.
                if let Err(e) = rules.mark_checked(&rule.id, now).await {
                    tracing::error!(rule_id = %rule.id, error = %e, "Failed to update last_checked_at");
                }

                let result = match outcome {
                    Ok(Some(_)) => RuleOutcome::Triggered,
                    Ok(None) => RuleOutcome::Quiet,
                    Err(e) => {
                        tracing::error!(
                            rule_id = %rule.id,
                            rule_name = %rule.name,
                            error = %e,
                            "Rule evaluation failed"
                        );
                        RuleOutcome::Failed
                    }
                };
                drop(permit);
                result
            });
        }

        let mut summary = BatchSummary::default();
        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => {
                        summary.evaluated += 1;
                        match outcome {
                            RuleOutcome::Triggered => summary.triggered += 1,
                            RuleOutcome::Failed => summary.failed += 1,
                            RuleOutcome::Quiet => {}
                        }
                    }
                    Err(e) => {
                        summary.evaluated += 1;
                        summary.failed += 1;
                        tracing::error!(error = %e, "Rule evaluation task panicked");
                    }
                }
            }
        };
        if tokio::time::timeout(self.config.batch_deadline, drain)
            .await
            .is_err()
        {
            tasks.abort_all();
            tracing::warn!(
                deadline_secs = self.config.batch_deadline.as_secs(),
                "Evaluation batch exceeded deadline, aborting remaining rules"
            );
        }

        summary
    }
}

/// Strict per-rule pipeline: fetch, resolve, compare, trigger.
async fn evaluate_rule(
    source: &MetricCatalog,
    lifecycle: &LifecycleManager,
    fetch_timeout: Duration,
    rule: &AlertRule,
    now: DateTime<Utc>,
) -> Result<Option<Alert>> {
    let components = tokio::time::timeout(
        fetch_timeout,
        source.fetch(
            &rule.metric_type,
            &rule.metric_query,
            rule.time_window_minutes,
            now,
        ),
    )
    .await
    .map_err(|_| EngineError::MetricTimeout(fetch_timeout))??;

    let value = aggregate::resolve(rule.aggregation, &components);
    tracing::debug!(
        rule_id = %rule.id,
        metric_type = %rule.metric_type,
        value,
        threshold = rule.threshold,
        "Rule evaluated"
    );

    if condition::is_met(value, rule.condition, rule.threshold, rule.compare_value) {
        let alert = lifecycle.trigger(rule, value, now).await?;
        return Ok(Some(alert));
    }
    Ok(None)
}
