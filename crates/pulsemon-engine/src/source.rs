use crate::error::{EngineError, Result};
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulsemon_common::types::MetricComponents;
use std::collections::HashMap;

/// Computes the raw aggregate components of one metric type over
/// `[now - window_minutes, now]`.
///
/// `query` is the rule's opaque key-value filter, passed through
/// untouched. Implementations are read-only.
#[async_trait]
pub trait MetricFetcher: Send + Sync {
    async fn fetch(
        &self,
        query: &HashMap<String, String>,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> AnyResult<MetricComponents>;
}

/// Lookup table from metric-type key to its fetcher.
///
/// New metric types are added by registering a fetcher; the evaluator's
/// control flow never changes. A rule referencing an unregistered key is
/// a configuration error that fails only that rule's evaluation.
#[derive(Default)]
pub struct MetricCatalog {
    fetchers: HashMap<String, Box<dyn MetricFetcher>>,
}

impl MetricCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metric_type: impl Into<String>, fetcher: Box<dyn MetricFetcher>) {
        self.fetchers.insert(metric_type.into(), fetcher);
    }

    pub fn has_metric(&self, metric_type: &str) -> bool {
        self.fetchers.contains_key(metric_type)
    }

    pub fn metric_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.fetchers.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    pub async fn fetch(
        &self,
        metric_type: &str,
        query: &HashMap<String, String>,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<MetricComponents> {
        let fetcher = self
            .fetchers
            .get(metric_type)
            .ok_or_else(|| EngineError::UnknownMetricType(metric_type.to_string()))?;
        fetcher
            .fetch(query, window_minutes, now)
            .await
            .map_err(|e| EngineError::MetricSource(e.to_string()))
    }
}
