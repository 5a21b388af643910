use crate::error::{EngineError, Result};
use pulsemon_common::types::AlertRule;

/// Validates a rule definition before it is accepted into the store.
///
/// The evaluator additionally guards the percentage conditions at
/// evaluation time, so a rule that decays into an invalid state (e.g. a
/// direct DB edit clearing `compare_value`) degrades to "never triggers"
/// rather than failing the batch.
pub fn validate_rule(rule: &AlertRule) -> Result<()> {
    if rule.name.trim().is_empty() {
        return Err(EngineError::InvalidRule("name must not be empty".into()));
    }
    if rule.time_window_minutes <= 0 {
        return Err(EngineError::InvalidRule(format!(
            "timeWindow must be positive, got {}",
            rule.time_window_minutes
        )));
    }
    if !rule.threshold.is_finite() {
        return Err(EngineError::InvalidRule("threshold must be finite".into()));
    }
    if rule.condition.is_percentage() {
        match rule.compare_value {
            Some(v) if v.is_finite() => {}
            Some(_) => {
                return Err(EngineError::InvalidRule(
                    "compareValue must be finite".into(),
                ))
            }
            None => {
                return Err(EngineError::InvalidRule(format!(
                    "compareValue is required for condition {}",
                    rule.condition
                )))
            }
        }
    }
    Ok(())
}
