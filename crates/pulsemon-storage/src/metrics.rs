use crate::store::Store;
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulsemon_common::types::MetricComponents;
use pulsemon_engine::source::{MetricCatalog, MetricFetcher};
use std::collections::HashMap;
use std::sync::Arc;

/// Metric fetcher backed by the `metric_events` table.
///
/// One instance per metric-type key; the catalog owns the key → fetcher
/// mapping so adding a metric type is a registration, not an engine
/// change.
pub struct EventMetricFetcher {
    store: Arc<Store>,
    metric_type: String,
}

impl EventMetricFetcher {
    pub fn new(store: Arc<Store>, metric_type: impl Into<String>) -> Self {
        Self {
            store,
            metric_type: metric_type.into(),
        }
    }
}

#[async_trait]
impl MetricFetcher for EventMetricFetcher {
    async fn fetch(
        &self,
        query: &HashMap<String, String>,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> AnyResult<MetricComponents> {
        Ok(self
            .store
            .metric_window_components(&self.metric_type, query, window_minutes, now)
            .await?)
    }
}

/// Builds the catalog for the configured metric-type keys, all backed by
/// the event store.
pub fn build_catalog(store: &Arc<Store>, metric_types: &[String]) -> MetricCatalog {
    let mut catalog = MetricCatalog::new();
    for metric_type in metric_types {
        catalog.register(
            metric_type.clone(),
            Box::new(EventMetricFetcher::new(store.clone(), metric_type.clone())),
        );
    }
    catalog
}
