//! Metric-threshold alert engine.
//!
//! Rules are evaluated in batches against a time-windowed metric
//! aggregate: the [`source::MetricCatalog`] fetches raw components for
//! the rule's metric type, [`aggregate::resolve`] reduces them to one
//! scalar, and [`condition::is_met`] decides whether the rule fires.
//! Positive evaluations go through the [`lifecycle::LifecycleManager`],
//! which materializes an [`pulsemon_common::types::Alert`], updates the
//! rule's trigger bookkeeping, and hands the alert to the notifier.
//!
//! Persistence is abstracted behind [`repo::RuleRepository`] and
//! [`repo::AlertRepository`] so tests can substitute in-memory fakes.

pub mod aggregate;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod lifecycle;
pub mod mute;
pub mod repo;
pub mod source;
pub mod validate;

#[cfg(test)]
mod tests;

pub use error::{EngineError, Result};
