use crate::aggregation::aggregate_window;
use crate::allocation::{Allocation, validate_range};
use crate::calendar::days_in_range;
use crate::conflict::is_over_capacity;
use crate::error::{EngineError, EngineResult};
use crate::resource::Resource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramPoint {
    pub date: NaiveDate,
    pub allocated: f64,
    pub capacity: f64,
    pub utilization_percent: f64,
    pub over_allocated: bool,
}

/// Dense daily load-versus-capacity series for one resource over `start..=end`.
///
/// Days without allocations are reported with zero load. Allocations are
/// clipped to the window, but each one is still checked against the span limit.
pub fn build_histogram(
    resource: &Resource,
    allocations: &[&Allocation],
    start: NaiveDate,
    end: NaiveDate,
    max_span_days: i64,
) -> EngineResult<Vec<HistogramPoint>> {
    validate_range(start, end, max_span_days)?;
    if !resource.has_positive_capacity() {
        return Err(EngineError::NonPositiveCapacity {
            resource_id: resource.id.clone(),
            capacity: resource.daily_capacity,
        });
    }

    let capacity = resource.daily_capacity;
    let loads = aggregate_window(allocations, capacity, max_span_days, Some((start, end)))?;
    let points = days_in_range(start, end)
        .map(|date| {
            let allocated = loads.get(&date).map(|load| load.total).unwrap_or(0.0);
            HistogramPoint {
                date,
                allocated,
                capacity,
                utilization_percent: allocated / capacity * 100.0,
                over_allocated: is_over_capacity(allocated, capacity),
            }
        })
        .collect();
    Ok(points)
}
