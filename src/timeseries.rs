//! Cumulative S-curve and earned-value metrics over time-phased periods.

use crate::period::{AssignmentPeriod, GroupBy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub planned: f64,
    pub actual: f64,
    pub remaining: f64,
    pub earned_value: f64,
}

impl AddAssign for PeriodTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.planned += rhs.planned;
        self.actual += rhs.actual;
        self.remaining += rhs.remaining;
        self.earned_value += rhs.earned_value;
    }
}

impl From<&AssignmentPeriod> for PeriodTotals {
    fn from(period: &AssignmentPeriod) -> Self {
        Self {
            planned: period.planned_cost,
            actual: period.actual_cost,
            remaining: period.remaining_cost,
            earned_value: period.earned_value,
        }
    }
}

/// Sum period costs into buckets keyed by bucket start date.
pub fn bucket_periods<'a, I>(periods: I, group_by: GroupBy) -> BTreeMap<NaiveDate, PeriodTotals>
where
    I: IntoIterator<Item = &'a AssignmentPeriod>,
{
    let mut buckets: BTreeMap<NaiveDate, PeriodTotals> = BTreeMap::new();
    for period in periods {
        *buckets
            .entry(group_by.bucket_start(period.period_start))
            .or_default() += PeriodTotals::from(period);
    }
    buckets
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvmMetrics {
    pub planned_value: f64,
    pub actual_cost: f64,
    pub earned_value: f64,
    pub spi: f64,
    pub cpi: f64,
    pub cost_variance: f64,
    pub schedule_variance: f64,
    pub bac: f64,
    pub eac: f64,
    pub vac: f64,
    pub etc: f64,
    pub percent_complete: f64,
}

impl EvmMetrics {
    /// Derive the index and forecast figures from cumulative values.
    pub fn compute(planned_value: f64, actual_cost: f64, earned_value: f64, bac: f64) -> Self {
        let spi = if planned_value == 0.0 {
            1.0
        } else {
            earned_value / planned_value
        };
        let cpi = if actual_cost == 0.0 {
            1.0
        } else {
            earned_value / actual_cost
        };
        let eac = if cpi == 0.0 { bac } else { bac / cpi };
        let percent_complete = if bac == 0.0 {
            0.0
        } else {
            100.0 * earned_value / bac
        };
        Self {
            planned_value,
            actual_cost,
            earned_value,
            spi,
            cpi,
            cost_variance: earned_value - actual_cost,
            schedule_variance: earned_value - planned_value,
            bac,
            eac,
            vac: bac - eac,
            etc: eac - actual_cost,
            percent_complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SCurvePoint {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub label: String,
    pub planned: f64,
    pub actual: f64,
    pub remaining: f64,
    pub earned_value: f64,
    pub cumulative_planned: f64,
    pub cumulative_actual: f64,
    pub cumulative_remaining: f64,
    pub cumulative_earned_value: f64,
    pub spi: f64,
    pub cpi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SCurve {
    pub group_by: GroupBy,
    pub points: Vec<SCurvePoint>,
    pub metrics: EvmMetrics,
}

impl SCurve {
    pub fn bac(&self) -> f64 {
        self.metrics.bac
    }

    /// Metrics from the last bucket starting on or before `data_date`; BAC stays the full plan.
    pub fn metrics_as_of(&self, data_date: NaiveDate) -> EvmMetrics {
        let bac = self.bac();
        match self
            .points
            .iter()
            .rev()
            .find(|point| point.period_start <= data_date)
        {
            Some(point) => EvmMetrics::compute(
                point.cumulative_planned,
                point.cumulative_actual,
                point.cumulative_earned_value,
                bac,
            ),
            None => EvmMetrics::compute(0.0, 0.0, 0.0, bac),
        }
    }
}

/// Bucket, sort, and accumulate planned/actual/remaining/earned cost.
pub fn build_s_curve<'a, I>(periods: I, group_by: GroupBy) -> SCurve
where
    I: IntoIterator<Item = &'a AssignmentPeriod>,
{
    let buckets = bucket_periods(periods, group_by);
    let mut running = PeriodTotals::default();
    let mut points = Vec::with_capacity(buckets.len());
    for (bucket, totals) in buckets {
        running += totals;
        let snapshot = EvmMetrics::compute(
            running.planned,
            running.actual,
            running.earned_value,
            running.planned,
        );
        points.push(SCurvePoint {
            period_start: bucket,
            period_end: group_by.bucket_end(bucket),
            label: group_by.label(bucket),
            planned: totals.planned,
            actual: totals.actual,
            remaining: totals.remaining,
            earned_value: totals.earned_value,
            cumulative_planned: running.planned,
            cumulative_actual: running.actual,
            cumulative_remaining: running.remaining,
            cumulative_earned_value: running.earned_value,
            spi: snapshot.spi,
            cpi: snapshot.cpi,
        });
    }

    let metrics = EvmMetrics::compute(
        running.planned,
        running.actual,
        running.earned_value,
        running.planned,
    );
    SCurve {
        group_by,
        points,
        metrics,
    }
}
