use crate::entities::alert::{self, Column, Entity};
use crate::entities::alert_rule;
use crate::error::{Result, StorageError};
use crate::store::Store;
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulsemon_common::types::{Alert, AlertStatus, Severity};
use pulsemon_engine::repo::AlertRepository;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, FromQueryResult, JoinType,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use std::collections::HashMap;

/// 告警事件列表过滤器
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status_eq: Option<AlertStatus>,
    /// 按所属规则的告警级别过滤（需要联表）
    pub severity_eq: Option<Severity>,
    pub rule_id_eq: Option<String>,
    pub triggered_from: Option<DateTime<Utc>>,
    pub triggered_to: Option<DateTime<Utc>>,
}

/// 按告警级别分组的计数
#[derive(Debug, Clone, serde::Serialize, FromQueryResult)]
pub struct SeverityCount {
    pub severity: String,
    pub count: i64,
}

fn to_domain(m: alert::Model) -> Result<Alert> {
    let status = m.status.parse().map_err(|_| StorageError::Decode {
        column: "status",
        value: m.status.clone(),
    })?;
    Ok(Alert {
        id: m.id,
        rule_id: m.rule_id,
        metric_value: m.metric_value,
        threshold: m.threshold,
        status,
        triggered_at: m.triggered_at.with_timezone(&Utc),
        notified_at: m.notified_at.map(|t| t.with_timezone(&Utc)),
        notification_status: serde_json::from_str(&m.notification_status_json)?,
        acknowledged_by_id: m.acknowledged_by_id,
        acknowledged_at: m.acknowledged_at.map(|t| t.with_timezone(&Utc)),
        resolution: m.resolution,
        resolved_at: m.resolved_at.map(|t| t.with_timezone(&Utc)),
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn apply_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &AlertFilter,
) -> sea_orm::Select<Entity> {
    if let Some(status) = filter.status_eq {
        q = q.filter(Column::Status.eq(status.to_string()));
    }
    if let Some(rule_id) = &filter.rule_id_eq {
        q = q.filter(Column::RuleId.eq(rule_id));
    }
    if let Some(from) = filter.triggered_from {
        q = q.filter(Column::TriggeredAt.gte(from.fixed_offset()));
    }
    if let Some(to) = filter.triggered_to {
        q = q.filter(Column::TriggeredAt.lte(to.fixed_offset()));
    }
    if let Some(severity) = filter.severity_eq {
        q = q
            .join(JoinType::InnerJoin, alert::Relation::Rule.def())
            .filter(alert_rule::Column::Severity.eq(severity.to_string()));
    }
    q
}

impl Store {
    pub async fn insert_alert(&self, a: &Alert) -> Result<Alert> {
        let am = alert::ActiveModel {
            id: Set(a.id.clone()),
            rule_id: Set(a.rule_id.clone()),
            metric_value: Set(a.metric_value),
            threshold: Set(a.threshold),
            status: Set(a.status.to_string()),
            triggered_at: Set(a.triggered_at.fixed_offset()),
            notified_at: Set(a.notified_at.map(|t| t.fixed_offset())),
            notification_status_json: Set(serde_json::to_string(&a.notification_status)?),
            acknowledged_by_id: Set(a.acknowledged_by_id.clone()),
            acknowledged_at: Set(a.acknowledged_at.map(|t| t.fixed_offset())),
            resolution: Set(a.resolution.clone()),
            resolved_at: Set(a.resolved_at.map(|t| t.fixed_offset())),
            created_at: Set(a.created_at.fixed_offset()),
            updated_at: Set(a.updated_at.fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        to_domain(model)
    }

    pub async fn get_alert(&self, id: &str) -> Result<Option<Alert>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_domain).transpose()
    }

    pub async fn list_alerts(
        &self,
        filter: &AlertFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Alert>> {
        let rows = apply_filter(Entity::find(), filter)
            .order_by(Column::TriggeredAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_domain).collect()
    }

    pub async fn count_alerts(&self, filter: &AlertFilter) -> Result<u64> {
        Ok(apply_filter(Entity::find(), filter)
            .count(self.db())
            .await?)
    }

    /// Persists the state-machine fields after a lifecycle transition.
    pub async fn update_alert_state(&self, a: &Alert) -> Result<()> {
        let Some(model) = Entity::find_by_id(&a.id).one(self.db()).await? else {
            return Err(StorageError::NotFound {
                entity: "alert",
                id: a.id.clone(),
            });
        };
        let mut am: alert::ActiveModel = model.into();
        am.status = Set(a.status.to_string());
        am.acknowledged_by_id = Set(a.acknowledged_by_id.clone());
        am.acknowledged_at = Set(a.acknowledged_at.map(|t| t.fixed_offset()));
        am.resolution = Set(a.resolution.clone());
        am.resolved_at = Set(a.resolved_at.map(|t| t.fixed_offset()));
        am.updated_at = Set(a.updated_at.fixed_offset());
        am.update(self.db()).await?;
        Ok(())
    }

    pub async fn record_alert_notification(
        &self,
        id: &str,
        notified_at: DateTime<Utc>,
        status: &HashMap<String, String>,
    ) -> Result<()> {
        let Some(model) = Entity::find_by_id(id).one(self.db()).await? else {
            return Err(StorageError::NotFound {
                entity: "alert",
                id: id.to_string(),
            });
        };
        let mut am: alert::ActiveModel = model.into();
        am.notified_at = Set(Some(notified_at.fixed_offset()));
        am.notification_status_json = Set(serde_json::to_string(status)?);
        am.updated_at = Set(notified_at.fixed_offset());
        am.update(self.db()).await?;
        Ok(())
    }

    pub async fn count_all_alerts(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }

    pub async fn count_alerts_by_status(&self, status: AlertStatus) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::Status.eq(status.to_string()))
            .count(self.db())
            .await?)
    }

    pub async fn count_alerts_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::TriggeredAt.gte(since.fixed_offset()))
            .count(self.db())
            .await?)
    }

    /// Alert counts grouped by the owning rule's severity.
    pub async fn count_alerts_by_severity(&self) -> Result<Vec<SeverityCount>> {
        let rows = Entity::find()
            .select_only()
            .column_as(alert_rule::Column::Severity, "severity")
            .column_as(Column::Id.count(), "count")
            .join(JoinType::InnerJoin, alert::Relation::Rule.def())
            .group_by(alert_rule::Column::Severity)
            .into_model::<SeverityCount>()
            .all(self.db())
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl AlertRepository for Store {
    async fn insert(&self, a: &Alert) -> AnyResult<()> {
        self.insert_alert(a).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> AnyResult<Option<Alert>> {
        Ok(self.get_alert(id).await?)
    }

    async fn update_state(&self, a: &Alert) -> AnyResult<()> {
        Ok(self.update_alert_state(a).await?)
    }

    async fn record_notification(
        &self,
        id: &str,
        notified_at: DateTime<Utc>,
        status: &HashMap<String, String>,
    ) -> AnyResult<()> {
        Ok(self.record_alert_notification(id, notified_at, status).await?)
    }
}
