//! Planned cost per resource category over time.

use crate::period::{AssignmentPeriod, GroupBy};
use crate::resource::ResourceCategory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityPoint {
    pub period_start: NaiveDate,
    pub label: String,
    pub value: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommoditySeries {
    pub category: ResourceCategory,
    pub points: Vec<CommodityPoint>,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: ResourceCategory,
    pub total: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityCurves {
    pub group_by: GroupBy,
    /// Bucket starts shared by every series, ascending.
    pub buckets: Vec<NaiveDate>,
    pub series: Vec<CommoditySeries>,
    pub combined: Vec<CommodityPoint>,
    pub grand_total: f64,
    pub shares: Vec<CategoryShare>,
}

impl CommodityCurves {
    pub fn series_for(&self, category: ResourceCategory) -> Option<&CommoditySeries> {
        self.series.iter().find(|series| series.category == category)
    }
}

fn cumulative_points(
    buckets: &[NaiveDate],
    values: &BTreeMap<NaiveDate, f64>,
    group_by: GroupBy,
) -> Vec<CommodityPoint> {
    let mut running = 0.0;
    buckets
        .iter()
        .map(|bucket| {
            let value = values.get(bucket).copied().unwrap_or(0.0);
            running += value;
            CommodityPoint {
                period_start: *bucket,
                label: group_by.label(*bucket),
                value,
                cumulative: running,
            }
        })
        .collect()
}

/// Bucket planned cost by category.
///
/// Every series covers the same buckets (zero-filled) so they line up when
/// stacked. Categories with no periods are left out.
pub fn build_commodity_curves<'a, I>(entries: I, group_by: GroupBy) -> CommodityCurves
where
    I: IntoIterator<Item = (ResourceCategory, &'a AssignmentPeriod)>,
{
    let mut by_category: BTreeMap<ResourceCategory, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    let mut combined: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut buckets: BTreeSet<NaiveDate> = BTreeSet::new();

    for (category, period) in entries {
        let bucket = group_by.bucket_start(period.period_start);
        buckets.insert(bucket);
        *by_category
            .entry(category)
            .or_default()
            .entry(bucket)
            .or_insert(0.0) += period.planned_cost;
        *combined.entry(bucket).or_insert(0.0) += period.planned_cost;
    }

    let buckets: Vec<NaiveDate> = buckets.into_iter().collect();
    let series: Vec<CommoditySeries> = by_category
        .iter()
        .map(|(category, values)| {
            let points = cumulative_points(&buckets, values, group_by);
            let total = points.last().map(|p| p.cumulative).unwrap_or(0.0);
            CommoditySeries {
                category: *category,
                points,
                total,
            }
        })
        .collect();
    let combined = cumulative_points(&buckets, &combined, group_by);
    let grand_total = series.iter().map(|s| s.total).sum::<f64>();

    let shares = series
        .iter()
        .map(|s| CategoryShare {
            category: s.category,
            total: s.total,
            percent: if grand_total == 0.0 {
                0.0
            } else {
                s.total / grand_total * 100.0
            },
        })
        .collect();

    CommodityCurves {
        group_by,
        buckets,
        series,
        combined,
        grand_total,
        shares,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cost(start: NaiveDate, planned: f64) -> AssignmentPeriod {
        let mut period = AssignmentPeriod::new("a", start, start);
        period.planned_cost = planned;
        period
    }

    #[test]
    fn series_share_buckets_and_accumulate() {
        let labor = [cost(d(2025, 1, 2), 100.0), cost(d(2025, 2, 3), 50.0)];
        let material = [cost(d(2025, 2, 10), 50.0)];
        let entries = labor
            .iter()
            .map(|p| (ResourceCategory::Labor, p))
            .chain(material.iter().map(|p| (ResourceCategory::Material, p)));
        let curves = build_commodity_curves(entries, GroupBy::Month);

        assert_eq!(curves.buckets, vec![d(2025, 1, 1), d(2025, 2, 1)]);
        let material = curves.series_for(ResourceCategory::Material).unwrap();
        assert_eq!(material.points.len(), 2);
        assert_eq!(material.points[0].value, 0.0);
        assert_eq!(material.points[1].cumulative, 50.0);
        assert_eq!(curves.combined[1].cumulative, 200.0);
        assert_eq!(curves.grand_total, 200.0);
        assert!(curves.series_for(ResourceCategory::Equipment).is_none());
    }

    #[test]
    fn shares_sum_to_hundred() {
        let periods = [cost(d(2025, 1, 1), 30.0), cost(d(2025, 1, 1), 70.0)];
        let curves = build_commodity_curves(
            [
                (ResourceCategory::Labor, &periods[0]),
                (ResourceCategory::Equipment, &periods[1]),
            ],
            GroupBy::Day,
        );
        let sum: f64 = curves.shares.iter().map(|s| s.percent).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_total_gives_zero_shares() {
        let periods = [cost(d(2025, 1, 1), 0.0)];
        let curves =
            build_commodity_curves([(ResourceCategory::Other, &periods[0])], GroupBy::Week);
        assert_eq!(curves.shares[0].percent, 0.0);
    }
}
