use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use pulsemon_common::types::Severity;
///
/// let sev: Severity = "WARNING".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "WARNING");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARNING" => Ok(Severity::Warning),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Comparison operator applied to the aggregated metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCondition {
    GreaterThan,
    LessThan,
    Equals,
    NotEquals,
    GreaterThanOrEqual,
    LessThanOrEqual,
    /// Percent growth of `value` over `compare_value`, against `threshold`.
    PercentageIncrease,
    /// Percent drop of `value` under `compare_value`, against `threshold`.
    PercentageDecrease,
    /// Reserved. No detection method is implemented; never triggers.
    Anomaly,
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GreaterThan => "GREATER_THAN",
            Self::LessThan => "LESS_THAN",
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Self::PercentageIncrease => "PERCENTAGE_INCREASE",
            Self::PercentageDecrease => "PERCENTAGE_DECREASE",
            Self::Anomaly => "ANOMALY",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AlertCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GREATER_THAN" => Ok(Self::GreaterThan),
            "LESS_THAN" => Ok(Self::LessThan),
            "EQUALS" => Ok(Self::Equals),
            "NOT_EQUALS" => Ok(Self::NotEquals),
            "GREATER_THAN_OR_EQUAL" => Ok(Self::GreaterThanOrEqual),
            "LESS_THAN_OR_EQUAL" => Ok(Self::LessThanOrEqual),
            "PERCENTAGE_INCREASE" => Ok(Self::PercentageIncrease),
            "PERCENTAGE_DECREASE" => Ok(Self::PercentageDecrease),
            "ANOMALY" => Ok(Self::Anomaly),
            _ => Err(format!("unknown alert condition: {s}")),
        }
    }
}

impl AlertCondition {
    /// True for the percentage-delta conditions that need `compare_value`.
    pub fn is_percentage(&self) -> bool {
        matches!(self, Self::PercentageIncrease | Self::PercentageDecrease)
    }
}

/// Scalar reduction applied to the raw metric components of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    Sum,
    Avg,
    Count,
    Min,
    Max,
    DistinctCount,
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::DistinctCount => "DISTINCT_COUNT",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUM" => Ok(Self::Sum),
            "AVG" => Ok(Self::Avg),
            "COUNT" => Ok(Self::Count),
            "MIN" => Ok(Self::Min),
            "MAX" => Ok(Self::Max),
            "DISTINCT_COUNT" => Ok(Self::DistinctCount),
            _ => Err(format!("unknown aggregation: {s}")),
        }
    }
}

/// Lifecycle state of a fired alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Triggered,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Triggered => "TRIGGERED",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Resolved => "RESOLVED",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRIGGERED" => Ok(Self::Triggered),
            "ACKNOWLEDGED" => Ok(Self::Acknowledged),
            "RESOLVED" => Ok(Self::Resolved),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

/// A standing definition of a metric threshold to watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Key into the metric catalog (e.g., `"failed_payments"`).
    pub metric_type: String,
    /// Opaque key-value filter passed through to the metric source.
    pub metric_query: HashMap<String, String>,
    pub condition: AlertCondition,
    pub threshold: f64,
    /// Baseline for the percentage conditions; unused otherwise.
    pub compare_value: Option<f64>,
    /// Evaluation window in minutes, counted back from "now".
    pub time_window_minutes: i64,
    pub aggregation: Aggregation,
    pub severity: Severity,
    /// Channel keys to notify (e.g., `["email", "webhook"]`).
    pub channels: Vec<String>,
    /// Email recipients; only the email channel reads these.
    pub recipients: Vec<String>,
    pub webhook_url: Option<String>,
    pub is_active: bool,
    pub is_muted: bool,
    /// Mute expiry; `None` while muted means muted until explicit unmute.
    pub muted_until: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub trigger_count: i64,
    /// 规则归属用户（边界层做所有权校验，引擎不感知）
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One materialized occurrence of a rule firing.
///
/// `metric_value` and `threshold` are snapshotted at trigger time so later
/// rule edits do not rewrite history. Alerts are append-only; the engine
/// never deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub metric_value: f64,
    pub threshold: f64,
    pub status: AlertStatus,
    pub triggered_at: DateTime<Utc>,
    pub notified_at: Option<DateTime<Utc>>,
    /// 渠道投递状态（key 为 `email:<addr>` / `webhook` 等，value 为 sent / failed）
    pub notification_status: HashMap<String, String>,
    pub acknowledged_by_id: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw aggregate components of one metric over one window, as returned by
/// the metric source before the aggregation resolver picks a scalar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricComponents {
    pub sum: f64,
    pub avg: f64,
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// One recorded business metric event (e.g., a signup, a failed payment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEvent {
    pub id: String,
    pub metric_type: String,
    pub value: f64,
    /// 业务实体标识（用户 ID、订单 ID 等，可选）
    pub entity_id: Option<String>,
    pub labels: HashMap<String, String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
