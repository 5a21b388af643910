use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 按依赖顺序建表
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS alert_rules (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    metric_type TEXT NOT NULL,
    metric_query_json TEXT NOT NULL DEFAULT '{}',
    condition TEXT NOT NULL,
    threshold REAL NOT NULL,
    compare_value REAL,
    time_window_minutes INTEGER NOT NULL,
    aggregation TEXT NOT NULL,
    severity TEXT NOT NULL,
    channels_json TEXT NOT NULL DEFAULT '[]',
    recipients_json TEXT NOT NULL DEFAULT '[]',
    webhook_url TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_muted INTEGER NOT NULL DEFAULT 0,
    muted_until TEXT,
    last_checked_at TEXT,
    last_triggered_at TEXT,
    trigger_count INTEGER NOT NULL DEFAULT 0,
    created_by_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alert_rules_is_active ON alert_rules(is_active);
CREATE INDEX IF NOT EXISTS idx_alert_rules_created_by ON alert_rules(created_by_id);
CREATE INDEX IF NOT EXISTS idx_alert_rules_metric_type ON alert_rules(metric_type);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY NOT NULL,
    rule_id TEXT NOT NULL REFERENCES alert_rules(id) ON DELETE CASCADE,
    metric_value REAL NOT NULL,
    threshold REAL NOT NULL,
    status TEXT NOT NULL,
    triggered_at TEXT NOT NULL,
    notified_at TEXT,
    notification_status_json TEXT NOT NULL DEFAULT '{}',
    acknowledged_by_id TEXT,
    acknowledged_at TEXT,
    resolution TEXT,
    resolved_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_rule_id ON alerts(rule_id);
CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(status);
CREATE INDEX IF NOT EXISTS idx_alerts_triggered_at ON alerts(triggered_at DESC);

CREATE TABLE IF NOT EXISTS metric_events (
    id TEXT PRIMARY KEY NOT NULL,
    metric_type TEXT NOT NULL,
    value REAL NOT NULL DEFAULT 1,
    entity_id TEXT,
    labels_json TEXT NOT NULL DEFAULT '{}',
    occurred_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_metric_events_type_time ON metric_events(metric_type, occurred_at);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS metric_events;
DROP TABLE IF EXISTS alerts;
DROP TABLE IF EXISTS alert_rules;
";
