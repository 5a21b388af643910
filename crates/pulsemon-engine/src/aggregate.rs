use pulsemon_common::types::{Aggregation, MetricComponents};

/// Picks one scalar out of the raw window components per the rule's
/// aggregation kind. Total function: absent `min`/`max` resolve to 0.
///
/// `DISTINCT_COUNT` reads the same `count` field as `COUNT`; whether that
/// count is distinct is up to the metric source producing the components.
///
/// # Examples
///
/// ```
/// use pulsemon_common::types::{Aggregation, MetricComponents};
/// use pulsemon_engine::aggregate::resolve;
///
/// let c = MetricComponents { sum: 12.0, avg: 4.0, count: 3, min: None, max: Some(6.0) };
/// assert_eq!(resolve(Aggregation::Sum, &c), 12.0);
/// assert_eq!(resolve(Aggregation::Min, &c), 0.0);
/// assert_eq!(resolve(Aggregation::Max, &c), 6.0);
/// ```
pub fn resolve(aggregation: Aggregation, components: &MetricComponents) -> f64 {
    match aggregation {
        Aggregation::Sum => components.sum,
        Aggregation::Avg => components.avg,
        Aggregation::Count => components.count as f64,
        Aggregation::Min => components.min.unwrap_or(0.0),
        Aggregation::Max => components.max.unwrap_or(0.0),
        Aggregation::DistinctCount => components.count as f64,
    }
}
