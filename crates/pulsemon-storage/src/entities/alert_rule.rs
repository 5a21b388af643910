use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alert_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub metric_type: String,
    pub metric_query_json: String,
    pub condition: String,
    pub threshold: f64,
    pub compare_value: Option<f64>,
    pub time_window_minutes: i64,
    pub aggregation: String,
    pub severity: String,
    pub channels_json: String,
    pub recipients_json: String,
    pub webhook_url: Option<String>,
    pub is_active: bool,
    pub is_muted: bool,
    pub muted_until: Option<DateTimeWithTimeZone>,
    pub last_checked_at: Option<DateTimeWithTimeZone>,
    pub last_triggered_at: Option<DateTimeWithTimeZone>,
    pub trigger_count: i64,
    pub created_by_id: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::alert::Entity")]
    Alert,
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alert.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
