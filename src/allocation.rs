use crate::calendar::span_days;
use crate::error::{EngineError, EngineResult};
use crate::resource::RateType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resource's fractional daily commitment to an activity over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: String,
    pub resource_id: String,
    pub activity_id: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    /// Percent of the resource's daily capacity. Values above 100 are intentional overtime.
    pub percent_units: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_reference: Option<String>,
    #[serde(default)]
    pub rate_type: RateType,
}

impl Allocation {
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        activity_id: impl Into<String>,
        date_start: NaiveDate,
        date_end: NaiveDate,
        percent_units: f64,
    ) -> Self {
        Self {
            id: id.into(),
            resource_id: resource_id.into(),
            activity_id: activity_id.into(),
            date_start,
            date_end,
            percent_units,
            curve_reference: None,
            rate_type: RateType::Standard,
        }
    }

    pub fn with_curve(mut self, curve_reference: impl Into<String>) -> Self {
        self.curve_reference = Some(curve_reference.into());
        self
    }

    pub fn with_rate_type(mut self, rate_type: RateType) -> Self {
        self.rate_type = rate_type;
        self
    }

    pub fn span_days(&self) -> i64 {
        span_days(self.date_start, self.date_end)
    }

    /// Committed units per day given the resource's daily capacity.
    pub fn daily_load(&self, daily_capacity: f64) -> f64 {
        daily_capacity * (self.percent_units / 100.0)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    pub fn validate(&self, max_span_days: i64) -> EngineResult<()> {
        if !self.percent_units.is_finite() {
            return Err(EngineError::InvalidUnits {
                allocation_id: self.id.clone(),
                percent_units: self.percent_units,
            });
        }
        validate_range(self.date_start, self.date_end, max_span_days)
    }
}

/// Rejects reversed ranges and spans longer than `max_span_days`.
pub fn validate_range(start: NaiveDate, end: NaiveDate, max_span_days: i64) -> EngineResult<()> {
    if end < start {
        return Err(EngineError::InvalidDateRange { start, end });
    }
    let days = span_days(start, end);
    if days > max_span_days {
        return Err(EngineError::UnboundedRange {
            start,
            end,
            days,
            max_days: max_span_days,
        });
    }
    Ok(())
}

/// Allocations grouped by owning resource id, each group in input order.
pub type AllocationsByResource<'a> = BTreeMap<&'a str, Vec<&'a Allocation>>;

pub fn group_by_resource(allocations: &[Allocation]) -> AllocationsByResource<'_> {
    let mut grouped: AllocationsByResource<'_> = BTreeMap::new();
    for allocation in allocations {
        grouped
            .entry(allocation.resource_id.as_str())
            .or_default()
            .push(allocation);
    }
    grouped
}
