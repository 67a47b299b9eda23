use chrono::NaiveDate;
use thiserror::Error;

/// Validation failures raised by the capacity and distribution computations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid distribution curve: {0}")]
    InvalidCurve(String),
    #[error("date range end {end} precedes start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("resource {resource_id} has non-positive daily capacity {capacity}")]
    NonPositiveCapacity { resource_id: String, capacity: f64 },
    #[error("date range {start}..={end} spans {days} days (limit {max_days})")]
    UnboundedRange {
        start: NaiveDate,
        end: NaiveDate,
        days: i64,
        max_days: i64,
    },
    #[error("allocation {allocation_id} has non-finite percent units {percent_units}")]
    InvalidUnits {
        allocation_id: String,
        percent_units: f64,
    },
    #[error("resource {0} not found")]
    UnknownResource(String),
    #[error("allocation {0} not found")]
    UnknownAllocation(String),
    #[error("curve '{0}' is neither a preset nor a registered custom curve")]
    UnknownCurve(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
