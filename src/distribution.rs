//! Spreads a total quantity across a date span along a progress curve.

use crate::allocation::{Allocation, validate_range};
use crate::calendar::{WorkWeek, days_in_range};
use crate::config::{DEFAULT_MAX_SPAN_DAYS, EngineConfig};
use crate::curve::DistributionCurve;
use crate::error::EngineResult;
use crate::period::{AssignmentPeriod, GroupBy};
use crate::resource::Resource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyIncrement {
    pub date: NaiveDate,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodIncrement {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub quantity: f64,
}

/// Spread `total` over every calendar day of `start..=end` with the default span limit.
pub fn distribute(
    total: f64,
    start: NaiveDate,
    end: NaiveDate,
    curve: &DistributionCurve,
) -> EngineResult<Vec<DailyIncrement>> {
    CurveDistributor::default().distribute(total, start, end, curve)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDistributor {
    work_week: WorkWeek,
    max_span_days: i64,
}

impl Default for CurveDistributor {
    fn default() -> Self {
        Self {
            work_week: WorkWeek::all_days(),
            max_span_days: DEFAULT_MAX_SPAN_DAYS,
        }
    }
}

impl CurveDistributor {
    pub fn new(work_week: WorkWeek, max_span_days: i64) -> Self {
        Self {
            work_week,
            max_span_days,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            WorkWeek {
                skip_weekends: config.skip_weekends,
            },
            config.max_span_days,
        )
    }

    pub fn work_week(&self) -> WorkWeek {
        self.work_week
    }

    /// Days that receive a share of the quantity. Falls back to every calendar
    /// day when the span holds no working day (e.g. a weekend-only span).
    fn distribution_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let days = self.work_week.working_days_in_range(start, end);
        if days.is_empty() {
            days_in_range(start, end).collect()
        } else {
            days
        }
    }

    pub fn distribute(
        &self,
        total: f64,
        start: NaiveDate,
        end: NaiveDate,
        curve: &DistributionCurve,
    ) -> EngineResult<Vec<DailyIncrement>> {
        validate_range(start, end, self.max_span_days)?;
        let days = self.distribution_days(start, end);
        Ok(spread_over_days(total, &days, curve))
    }

    /// Same as [`CurveDistributor::distribute`], summed into day/week/month buckets.
    pub fn distribute_into_periods(
        &self,
        total: f64,
        start: NaiveDate,
        end: NaiveDate,
        curve: &DistributionCurve,
        group_by: GroupBy,
    ) -> EngineResult<Vec<PeriodIncrement>> {
        let daily = self.distribute(total, start, end, curve)?;
        let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for increment in &daily {
            *buckets
                .entry(group_by.bucket_start(increment.date))
                .or_insert(0.0) += increment.quantity;
        }
        Ok(buckets
            .into_iter()
            .map(|(bucket, quantity)| PeriodIncrement {
                period_start: bucket.max(start),
                period_end: group_by.bucket_end(bucket).min(end),
                quantity,
            })
            .collect())
    }

    /// Planned time-phasing of one allocation.
    ///
    /// The planned quantity is the allocation's daily load times the number of
    /// distribution days; it is spread along `curve` and priced with the
    /// allocation's rate tier. Per-use cost lands in the first period and fixed
    /// cost follows the quantity. Actual and earned values are left at zero and
    /// remaining equals planned.
    pub fn phase_allocation(
        &self,
        allocation: &Allocation,
        resource: &Resource,
        curve: &DistributionCurve,
        group_by: GroupBy,
    ) -> EngineResult<Vec<AssignmentPeriod>> {
        allocation.validate(self.max_span_days)?;
        let days = self.distribution_days(allocation.date_start, allocation.date_end);
        let total = allocation.daily_load(resource.daily_capacity) * days.len() as f64;
        let daily = spread_over_days(total, &days, curve);

        let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for increment in &daily {
            *buckets
                .entry(group_by.bucket_start(increment.date))
                .or_insert(0.0) += increment.quantity;
        }

        let rates = &resource.cost_rates;
        let unit_rate = rates.unit_rate(allocation.rate_type);
        let per_use = rates.per_use_cost.unwrap_or(0.0);
        let fixed = rates.fixed_cost.unwrap_or(0.0);

        let mut periods = Vec::with_capacity(buckets.len());
        for (idx, (bucket, quantity)) in buckets.into_iter().enumerate() {
            let fixed_share = if total != 0.0 {
                fixed * quantity / total
            } else if idx == 0 {
                fixed
            } else {
                0.0
            };
            let mut cost = quantity * unit_rate + fixed_share;
            if idx == 0 {
                cost += per_use;
            }

            let mut period = AssignmentPeriod::new(
                allocation.id.clone(),
                bucket.max(allocation.date_start),
                group_by.bucket_end(bucket).min(allocation.date_end),
            );
            period.planned_quantity = quantity;
            period.remaining_quantity = quantity;
            period.planned_cost = cost;
            period.remaining_cost = cost;
            periods.push(period);
        }
        Ok(periods)
    }
}

fn spread_over_days(total: f64, days: &[NaiveDate], curve: &DistributionCurve) -> Vec<DailyIncrement> {
    let duration = days.len();
    if duration == 1 {
        return vec![DailyIncrement {
            date: days[0],
            quantity: total,
        }];
    }

    let mut increments = Vec::with_capacity(duration);
    let mut assigned = 0.0;
    for (idx, date) in days.iter().enumerate() {
        let quantity = if idx + 1 == duration {
            // Final day takes the residual so the increments sum to `total`.
            let residual = total - assigned;
            if total >= 0.0 {
                residual.max(0.0)
            } else {
                residual.min(0.0)
            }
        } else {
            let from = curve.percent_at(idx as f64 / duration as f64);
            let to = curve.percent_at(((idx + 1) as f64 / duration as f64).min(1.0));
            total * (to - from).max(0.0) / 100.0
        };
        assigned += quantity;
        increments.push(DailyIncrement {
            date: *date,
            quantity,
        });
    }
    increments
}
