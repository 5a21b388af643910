use crate::entities::metric_event::{self, Column, Entity};
use crate::error::Result;
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use pulsemon_common::types::{MetricComponents, MetricEvent};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use std::collections::HashMap;

fn to_domain(m: metric_event::Model) -> Result<MetricEvent> {
    Ok(MetricEvent {
        id: m.id,
        metric_type: m.metric_type,
        value: m.value,
        entity_id: m.entity_id,
        labels: serde_json::from_str(&m.labels_json)?,
        occurred_at: m.occurred_at.with_timezone(&Utc),
        created_at: m.created_at.with_timezone(&Utc),
    })
}

impl Store {
    pub async fn insert_metric_events(&self, events: &[MetricEvent]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }
        let models: Vec<metric_event::ActiveModel> = events
            .iter()
            .map(|e| {
                Ok(metric_event::ActiveModel {
                    id: Set(e.id.clone()),
                    metric_type: Set(e.metric_type.clone()),
                    value: Set(e.value),
                    entity_id: Set(e.entity_id.clone()),
                    labels_json: Set(serde_json::to_string(&e.labels)?),
                    occurred_at: Set(e.occurred_at.fixed_offset()),
                    created_at: Set(e.created_at.fixed_offset()),
                })
            })
            .collect::<Result<_>>()?;
        Entity::insert_many(models).exec(self.db()).await?;
        Ok(events.len() as u64)
    }

    /// Raw aggregate components of one metric type over
    /// `[now - window, now]`. Entries of `query` must all match the
    /// event's labels for the event to count.
    pub async fn metric_window_components(
        &self,
        metric_type: &str,
        query: &HashMap<String, String>,
        window_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<MetricComponents> {
        let from = now - Duration::minutes(window_minutes);
        let rows = Entity::find()
            .filter(Column::MetricType.eq(metric_type))
            .filter(Column::OccurredAt.gte(from.fixed_offset()))
            .filter(Column::OccurredAt.lte(now.fixed_offset()))
            .all(self.db())
            .await?;

        let mut components = MetricComponents::default();
        for row in rows {
            let event = to_domain(row)?;
            if !query
                .iter()
                .all(|(k, v)| event.labels.get(k) == Some(v))
            {
                continue;
            }
            components.sum += event.value;
            components.count += 1;
            components.min = Some(match components.min {
                Some(min) => min.min(event.value),
                None => event.value,
            });
            components.max = Some(match components.max {
                Some(max) => max.max(event.value),
                None => event.value,
            });
        }
        if components.count > 0 {
            components.avg = components.sum / components.count as f64;
        }
        Ok(components)
    }

    /// Removes metric events older than `retention_days`. Returns the
    /// number of rows deleted. Alerts are never cleaned up.
    pub async fn cleanup_metric_events(&self, retention_days: u32) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(retention_days as i64);
        let res = Entity::delete_many()
            .filter(Column::OccurredAt.lt(cutoff.fixed_offset()))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }
}
