use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS 允许的 origins 列表，为空时允许所有来源（开发模式）
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// SMTP 未配置时邮件渠道不注册
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            evaluation: EvaluationConfig::default(),
            retention: RetentionConfig::default(),
            metrics: MetricsConfig::default(),
            smtp: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_evaluation_enabled")]
    pub enabled: bool,
    /// 评估批次触发间隔（秒）
    #[serde(default = "default_evaluation_tick_secs")]
    pub tick_secs: u64,
    /// 单批次内并发评估的规则数上限
    #[serde(default = "default_evaluation_max_concurrent")]
    pub max_concurrent: usize,
    /// 单条规则指标查询超时（秒）
    #[serde(default = "default_evaluation_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// 整批评估截止时间（秒）
    #[serde(default = "default_evaluation_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: default_evaluation_enabled(),
            tick_secs: default_evaluation_tick_secs(),
            max_concurrent: default_evaluation_max_concurrent(),
            fetch_timeout_secs: default_evaluation_fetch_timeout_secs(),
            batch_timeout_secs: default_evaluation_batch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// 指标事件保留天数（告警历史永不清理）
    #[serde(default = "default_metric_event_days")]
    pub metric_event_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            metric_event_days: default_metric_event_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// 指标目录中注册的指标类型键
    #[serde(default = "default_metric_types")]
    pub types: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            types: default_metric_types(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub from: String,
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_url() -> String {
    "sqlite://data/pulsemon.db?mode=rwc".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_evaluation_enabled() -> bool {
    true
}

fn default_evaluation_tick_secs() -> u64 {
    60
}

fn default_evaluation_max_concurrent() -> usize {
    8
}

fn default_evaluation_fetch_timeout_secs() -> u64 {
    10
}

fn default_evaluation_batch_timeout_secs() -> u64 {
    300
}

fn default_metric_event_days() -> u32 {
    90
}

fn default_smtp_port() -> u16 {
    587
}

fn default_metric_types() -> Vec<String> {
    [
        "new_users",
        "active_users",
        "revenue",
        "failed_payments",
        "refunds",
        "cancelled_subscriptions",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
