use pulsemon_common::types::AlertStatus;
use std::time::Duration;

/// Errors produced by the alert engine.
///
/// Evaluation-side failures (`UnknownMetricType`, `MetricSource`,
/// `MetricTimeout`) are caught per rule inside the batch evaluator and
/// logged; only request-shaped failures (`NotFound`, `InvalidState`,
/// `InvalidRule`) are meant to reach an API caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A required record was not found.
    #[error("engine: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An illegal alert state-machine transition was requested. The alert
    /// is left unchanged.
    #[error("engine: illegal alert transition {from} -> {to}")]
    InvalidState { from: AlertStatus, to: AlertStatus },

    /// The rule definition is malformed (e.g., a percentage condition
    /// without a compare value).
    #[error("engine: invalid rule definition: {0}")]
    InvalidRule(String),

    /// The rule references a metric type with no registered fetcher.
    #[error("engine: unknown metric type '{0}'")]
    UnknownMetricType(String),

    /// The metric source failed to produce window components.
    #[error("engine: metric source failure: {0}")]
    MetricSource(String),

    /// The metric source call exceeded the per-call timeout.
    #[error("engine: metric source timed out after {0:?}")]
    MetricTimeout(Duration),

    /// A rule or alert repository operation failed.
    #[error("engine: repository failure: {0}")]
    Repository(anyhow::Error),
}

impl From<anyhow::Error> for EngineError {
    fn from(e: anyhow::Error) -> Self {
        EngineError::Repository(e)
    }
}

/// Convenience `Result` alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
