use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucket size for time-phased series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Day,
    /// ISO week, starting Monday.
    Week,
    Month,
}

impl GroupBy {
    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            GroupBy::Day => date,
            GroupBy::Week => date
                .checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
                .unwrap_or(NaiveDate::MIN),
            GroupBy::Month => date.with_day(1).unwrap_or(date),
        }
    }

    /// Last day of the bucket starting at `bucket_start`.
    pub fn bucket_end(&self, bucket_start: NaiveDate) -> NaiveDate {
        match self {
            GroupBy::Day => bucket_start,
            GroupBy::Week => bucket_start
                .checked_add_signed(Duration::days(6))
                .unwrap_or(NaiveDate::MAX),
            GroupBy::Month => {
                let (year, month) = if bucket_start.month() == 12 {
                    (bucket_start.year() + 1, 1)
                } else {
                    (bucket_start.year(), bucket_start.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .map(|next| next - Duration::days(1))
                    .unwrap_or(bucket_start)
            }
        }
    }

    pub fn label(&self, bucket_start: NaiveDate) -> String {
        match self {
            GroupBy::Day => bucket_start.format("%Y-%m-%d").to_string(),
            GroupBy::Week => {
                let week = bucket_start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            GroupBy::Month => bucket_start.format("%Y-%m").to_string(),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupBy::Day => "day",
            GroupBy::Week => "week",
            GroupBy::Month => "month",
        };
        f.write_str(name)
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "daily" => Ok(GroupBy::Day),
            "week" | "weekly" => Ok(GroupBy::Week),
            "month" | "monthly" => Ok(GroupBy::Month),
            other => Err(format!("unknown grouping '{other}' (expected day, week or month)")),
        }
    }
}

/// Time-phased quantities and costs of one allocation for one bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentPeriod {
    pub allocation_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub planned_quantity: f64,
    #[serde(default)]
    pub actual_quantity: f64,
    #[serde(default)]
    pub remaining_quantity: f64,
    #[serde(default)]
    pub planned_cost: f64,
    #[serde(default)]
    pub actual_cost: f64,
    #[serde(default)]
    pub remaining_cost: f64,
    #[serde(default)]
    pub earned_value: f64,
}

impl AssignmentPeriod {
    pub fn new(allocation_id: impl Into<String>, period_start: NaiveDate, period_end: NaiveDate) -> Self {
        Self {
            allocation_id: allocation_id.into(),
            period_start,
            period_end,
            ..Self::default()
        }
    }
}
