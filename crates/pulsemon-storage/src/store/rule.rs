use crate::entities::alert_rule::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::Store;
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulsemon_common::types::{AlertRule, Severity};
use pulsemon_engine::repo::RuleRepository;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

/// 告警规则列表过滤器
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    /// 归属用户精确匹配（非管理员查询时由边界层填入）
    pub created_by_eq: Option<String>,
    pub is_active_eq: Option<bool>,
    pub severity_eq: Option<Severity>,
}

fn to_domain(m: alert_rule::Model) -> Result<AlertRule> {
    let condition = m.condition.parse().map_err(|_| StorageError::Decode {
        column: "condition",
        value: m.condition.clone(),
    })?;
    let aggregation = m.aggregation.parse().map_err(|_| StorageError::Decode {
        column: "aggregation",
        value: m.aggregation.clone(),
    })?;
    let severity = m.severity.parse().map_err(|_| StorageError::Decode {
        column: "severity",
        value: m.severity.clone(),
    })?;
    Ok(AlertRule {
        id: m.id,
        name: m.name,
        description: m.description,
        metric_type: m.metric_type,
        metric_query: serde_json::from_str(&m.metric_query_json)?,
        condition,
        threshold: m.threshold,
        compare_value: m.compare_value,
        time_window_minutes: m.time_window_minutes,
        aggregation,
        severity,
        channels: serde_json::from_str(&m.channels_json)?,
        recipients: serde_json::from_str(&m.recipients_json)?,
        webhook_url: m.webhook_url,
        is_active: m.is_active,
        is_muted: m.is_muted,
        muted_until: m.muted_until.map(|t| t.with_timezone(&Utc)),
        last_checked_at: m.last_checked_at.map(|t| t.with_timezone(&Utc)),
        last_triggered_at: m.last_triggered_at.map(|t| t.with_timezone(&Utc)),
        trigger_count: m.trigger_count,
        created_by_id: m.created_by_id,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn apply_filter(
    mut q: sea_orm::Select<Entity>,
    filter: &RuleFilter,
) -> sea_orm::Select<Entity> {
    if let Some(owner) = &filter.created_by_eq {
        q = q.filter(Column::CreatedById.eq(owner));
    }
    if let Some(active) = filter.is_active_eq {
        q = q.filter(Column::IsActive.eq(active));
    }
    if let Some(severity) = filter.severity_eq {
        q = q.filter(Column::Severity.eq(severity.to_string()));
    }
    q
}

impl Store {
    pub async fn insert_rule(&self, rule: &AlertRule) -> Result<AlertRule> {
        let am = alert_rule::ActiveModel {
            id: Set(rule.id.clone()),
            name: Set(rule.name.clone()),
            description: Set(rule.description.clone()),
            metric_type: Set(rule.metric_type.clone()),
            metric_query_json: Set(serde_json::to_string(&rule.metric_query)?),
            condition: Set(rule.condition.to_string()),
            threshold: Set(rule.threshold),
            compare_value: Set(rule.compare_value),
            time_window_minutes: Set(rule.time_window_minutes),
            aggregation: Set(rule.aggregation.to_string()),
            severity: Set(rule.severity.to_string()),
            channels_json: Set(serde_json::to_string(&rule.channels)?),
            recipients_json: Set(serde_json::to_string(&rule.recipients)?),
            webhook_url: Set(rule.webhook_url.clone()),
            is_active: Set(rule.is_active),
            is_muted: Set(rule.is_muted),
            muted_until: Set(rule.muted_until.map(|t| t.fixed_offset())),
            last_checked_at: Set(rule.last_checked_at.map(|t| t.fixed_offset())),
            last_triggered_at: Set(rule.last_triggered_at.map(|t| t.fixed_offset())),
            trigger_count: Set(rule.trigger_count),
            created_by_id: Set(rule.created_by_id.clone()),
            created_at: Set(rule.created_at.fixed_offset()),
            updated_at: Set(rule.updated_at.fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        to_domain(model)
    }

    pub async fn get_rule(&self, id: &str) -> Result<Option<AlertRule>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_domain).transpose()
    }

    pub async fn list_rules(
        &self,
        filter: &RuleFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<AlertRule>> {
        let rows = apply_filter(Entity::find(), filter)
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit)
            .offset(offset)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_domain).collect()
    }

    pub async fn count_rules(&self, filter: &RuleFilter) -> Result<u64> {
        Ok(apply_filter(Entity::find(), filter)
            .count(self.db())
            .await?)
    }

    /// Rewrites the rule's definition fields. Trigger bookkeeping and
    /// mute state are owned by the evaluator and mute controller and are
    /// left untouched.
    pub async fn update_rule(&self, rule: &AlertRule) -> Result<Option<AlertRule>> {
        let Some(model) = Entity::find_by_id(&rule.id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut am: alert_rule::ActiveModel = model.into();
        am.name = Set(rule.name.clone());
        am.description = Set(rule.description.clone());
        am.metric_type = Set(rule.metric_type.clone());
        am.metric_query_json = Set(serde_json::to_string(&rule.metric_query)?);
        am.condition = Set(rule.condition.to_string());
        am.threshold = Set(rule.threshold);
        am.compare_value = Set(rule.compare_value);
        am.time_window_minutes = Set(rule.time_window_minutes);
        am.aggregation = Set(rule.aggregation.to_string());
        am.severity = Set(rule.severity.to_string());
        am.channels_json = Set(serde_json::to_string(&rule.channels)?);
        am.recipients_json = Set(serde_json::to_string(&rule.recipients)?);
        am.webhook_url = Set(rule.webhook_url.clone());
        am.is_active = Set(rule.is_active);
        am.updated_at = Set(Utc::now().fixed_offset());
        let updated = am.update(self.db()).await?;
        Ok(Some(to_domain(updated)?))
    }

    /// Deletes the rule; its alerts cascade at the database level.
    pub async fn delete_rule(&self, id: &str) -> Result<bool> {
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn list_active_rules(&self) -> Result<Vec<AlertRule>> {
        let rows = Entity::find()
            .filter(Column::IsActive.eq(true))
            .order_by(Column::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_domain).collect()
    }

    pub async fn mark_rule_checked(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        Entity::update_many()
            .col_expr(Column::LastCheckedAt, Expr::value(Some(at.fixed_offset())))
            .filter(Column::Id.eq(id))
            .exec(self.db())
            .await?;
        Ok(())
    }

    /// Single-statement increment so concurrent evaluations cannot lose
    /// counts to a read-modify-write race.
    pub async fn record_rule_trigger(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        Entity::update_many()
            .col_expr(Column::TriggerCount, Expr::cust("trigger_count + 1"))
            .col_expr(
                Column::LastTriggeredAt,
                Expr::value(Some(at.fixed_offset())),
            )
            .col_expr(Column::UpdatedAt, Expr::value(at.fixed_offset()))
            .filter(Column::Id.eq(id))
            .exec(self.db())
            .await?;
        Ok(())
    }

    pub async fn set_rule_mute(
        &self,
        id: &str,
        muted: bool,
        until: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let res = Entity::update_many()
            .col_expr(Column::IsMuted, Expr::value(muted))
            .col_expr(
                Column::MutedUntil,
                Expr::value(until.map(|t| t.fixed_offset())),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(Column::Id.eq(id))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected > 0)
    }
}

#[async_trait]
impl RuleRepository for Store {
    async fn list_active(&self) -> AnyResult<Vec<AlertRule>> {
        Ok(self.list_active_rules().await?)
    }

    async fn get(&self, id: &str) -> AnyResult<Option<AlertRule>> {
        Ok(self.get_rule(id).await?)
    }

    async fn mark_checked(&self, id: &str, at: DateTime<Utc>) -> AnyResult<()> {
        Ok(self.mark_rule_checked(id, at).await?)
    }

    async fn record_trigger(&self, id: &str, at: DateTime<Utc>) -> AnyResult<()> {
        Ok(self.record_rule_trigger(id, at).await?)
    }

    async fn set_mute(
        &self,
        id: &str,
        muted: bool,
        until: Option<DateTime<Utc>>,
    ) -> AnyResult<bool> {
        Ok(self.set_rule_mute(id, muted, until).await?)
    }
}
