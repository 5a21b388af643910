use pulsemon_common::types::AlertCondition;

/// Decides whether an aggregated metric value meets a rule's condition.
///
/// Pure predicate; the percentage conditions guard against a missing or
/// zero baseline and evaluate to `false` instead of dividing by zero.
/// `ANOMALY` is reserved in the type system but has no detection method
/// and never triggers.
///
/// # Examples
///
/// ```
/// use pulsemon_common::types::AlertCondition;
/// use pulsemon_engine::condition::is_met;
///
/// assert!(is_met(7.0, AlertCondition::GreaterThan, 5.0, None));
/// assert!(is_met(150.0, AlertCondition::PercentageIncrease, 40.0, Some(100.0)));
/// assert!(!is_met(150.0, AlertCondition::PercentageIncrease, 40.0, Some(0.0)));
/// ```
#[allow(clippy::float_cmp)]
pub fn is_met(
    value: f64,
    condition: AlertCondition,
    threshold: f64,
    compare_value: Option<f64>,
) -> bool {
    match condition {
        AlertCondition::GreaterThan => value > threshold,
        AlertCondition::LessThan => value < threshold,
        AlertCondition::Equals => value == threshold,
        AlertCondition::NotEquals => value != threshold,
        AlertCondition::GreaterThanOrEqual => value >= threshold,
        AlertCondition::LessThanOrEqual => value <= threshold,
        AlertCondition::PercentageIncrease => match compare_value {
            Some(base) if base != 0.0 => ((value - base) / base) * 100.0 >= threshold,
            _ => false,
        },
        AlertCondition::PercentageDecrease => match compare_value {
            Some(base) if base != 0.0 => ((base - value) / base) * 100.0 >= threshold,
            _ => false,
        },
        // Intentionally unimplemented: no statistical method is wired up.
        AlertCondition::Anomaly => false,
    }
}
