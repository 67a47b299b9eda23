//! Polars views of engine results for reporting.

use crate::commodity::CommodityCurves;
use crate::conflict::ConflictEpisode;
use crate::distribution::DailyIncrement;
use crate::histogram::HistogramPoint;
use crate::timeseries::SCurve;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Convert NaiveDate to Polars i32 date
fn date_to_i32(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn date_column(name: &'static str, dates: impl Iterator<Item = NaiveDate>) -> PolarsResult<Column> {
    let values: Vec<i32> = dates.map(date_to_i32).collect();
    Ok(Series::new(PlSmallStr::from_static(name), values)
        .cast(&DataType::Date)?
        .into_column())
}

fn f64_column(name: &'static str, values: Vec<f64>) -> Column {
    Series::new(PlSmallStr::from_static(name), values).into_column()
}

fn string_column<T>(name: &'static str, items: &[T], f: impl Fn(&T) -> String) -> Column {
    Series::new(
        PlSmallStr::from_static(name),
        items.iter().map(f).collect::<Vec<String>>(),
    )
    .into_column()
}

fn f64s<T>(items: &[T], f: impl Fn(&T) -> f64) -> Vec<f64> {
    items.iter().map(f).collect()
}

pub fn histogram_frame(points: &[HistogramPoint]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        date_column("date", points.iter().map(|p| p.date))?,
        f64_column("allocated", f64s(points, |p| p.allocated)),
        f64_column("capacity", f64s(points, |p| p.capacity)),
        f64_column("utilization_percent", f64s(points, |p| p.utilization_percent)),
        Series::new(
            PlSmallStr::from_static("over_allocated"),
            points.iter().map(|p| p.over_allocated).collect::<Vec<bool>>(),
        )
        .into_column(),
    ])
}

pub fn increments_frame(increments: &[DailyIncrement]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        date_column("date", increments.iter().map(|i| i.date))?,
        f64_column("quantity", f64s(increments, |i| i.quantity)),
    ])
}

pub fn conflicts_frame(episodes: &[ConflictEpisode]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        string_column("resource_id", episodes, |e| e.resource_id.clone()),
        date_column("date_start", episodes.iter().map(|e| e.date_start))?,
        date_column("date_end", episodes.iter().map(|e| e.date_end))?,
        Series::new(
            PlSmallStr::from_static("day_count"),
            episodes.iter().map(|e| e.day_count).collect::<Vec<i64>>(),
        )
        .into_column(),
        date_column("peak_date", episodes.iter().map(|e| e.peak_date))?,
        f64_column("peak_load", f64s(episodes, |e| e.peak_load)),
        f64_column("max_excess", f64s(episodes, |e| e.max_excess)),
        string_column("severity", episodes, |e| e.severity.as_str().to_string()),
        string_column("allocation_ids", episodes, |e| e.allocation_ids.join(",")),
    ])
}

pub fn s_curve_frame(curve: &SCurve) -> PolarsResult<DataFrame> {
    let points = &curve.points;
    DataFrame::new(vec![
        date_column("period_start", points.iter().map(|p| p.period_start))?,
        date_column("period_end", points.iter().map(|p| p.period_end))?,
        string_column("label", points, |p| p.label.clone()),
        f64_column("planned", f64s(points, |p| p.planned)),
        f64_column("actual", f64s(points, |p| p.actual)),
        f64_column("remaining", f64s(points, |p| p.remaining)),
        f64_column("earned_value", f64s(points, |p| p.earned_value)),
        f64_column("cumulative_planned", f64s(points, |p| p.cumulative_planned)),
        f64_column("cumulative_actual", f64s(points, |p| p.cumulative_actual)),
        f64_column("cumulative_remaining", f64s(points, |p| p.cumulative_remaining)),
        f64_column("cumulative_earned_value", f64s(points, |p| p.cumulative_earned_value)),
        f64_column("spi", f64s(points, |p| p.spi)),
        f64_column("cpi", f64s(points, |p| p.cpi)),
    ])
}

/// One row per bucket: the cumulative cost of each category plus `total`.
pub fn commodity_frame(curves: &CommodityCurves) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        date_column("period_start", curves.buckets.iter().copied())?,
        string_column("label", &curves.combined, |p| p.label.clone()),
    ];
    for series in &curves.series {
        columns.push(
            Series::new(
                PlSmallStr::from_static(series.category.as_str()),
                f64s(&series.points, |p| p.cumulative),
            )
            .into_column(),
        );
    }
    columns.push(f64_column(
        "total",
        f64s(&curves.combined, |p| p.cumulative),
    ));
    DataFrame::new(columns)
}
