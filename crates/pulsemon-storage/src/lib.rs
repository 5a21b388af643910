//! Persistence layer for rules, alerts, and metric events.
//!
//! [`Store`] wraps a SeaORM connection (SQLite by default, WAL mode) and
//! implements the engine's `RuleRepository` / `AlertRepository` traits,
//! so the evaluator, lifecycle manager, and mute controller receive an
//! injected handle instead of touching a global client. Metric events
//! back the [`metrics::EventMetricFetcher`] that feeds the engine's
//! metric catalog.

pub mod entities;
pub mod error;
pub mod metrics;
pub mod store;


pub use error::{Result, StorageError};
pub use store::{AlertFilter, RuleFilter, SeverityCount, Store};
