use crate::allocation::Allocation;
use crate::calendar::days_in_range;
use crate::error::EngineResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Committed load on one day and the allocations behind it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    pub total: f64,
    pub allocation_ids: BTreeSet<String>,
    pub activity_ids: BTreeSet<String>,
}

impl DailyLoad {
    fn add(&mut self, allocation: &Allocation, quantity: f64) {
        self.total += quantity;
        self.allocation_ids.insert(allocation.id.clone());
        self.activity_ids.insert(allocation.activity_id.clone());
    }
}

/// Sparse per-day totals, ascending by date.
pub type DailyLoadMap = BTreeMap<NaiveDate, DailyLoad>;

/// Sum each allocation's daily load over its inclusive span.
///
/// Every allocation is validated against `max_span_days` before any day is
/// accumulated, so an invalid input produces no partial map.
pub fn aggregate(
    allocations: &[&Allocation],
    daily_capacity: f64,
    max_span_days: i64,
) -> EngineResult<DailyLoadMap> {
    aggregate_window(allocations, daily_capacity, max_span_days, None)
}

/// Like [`aggregate`], restricted to days inside `window` (inclusive).
pub fn aggregate_window(
    allocations: &[&Allocation],
    daily_capacity: f64,
    max_span_days: i64,
    window: Option<(NaiveDate, NaiveDate)>,
) -> EngineResult<DailyLoadMap> {
    for allocation in allocations {
        allocation.validate(max_span_days)?;
    }

    let mut loads = DailyLoadMap::new();
    for allocation in allocations {
        let (start, end) = match window {
            Some((from, to)) => (allocation.date_start.max(from), allocation.date_end.min(to)),
            None => (allocation.date_start, allocation.date_end),
        };
        let quantity = allocation.daily_load(daily_capacity);
        for date in days_in_range(start, end) {
            loads.entry(date).or_default().add(allocation, quantity);
        }
    }
    Ok(loads)
}
