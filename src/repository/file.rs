use super::{
    AllocationRepository, Dataset, RepositoryError, RepositoryResult, ResourceRepository,
};
use crate::allocation::Allocation;
use crate::period::AssignmentPeriod;
use crate::resource::{CostRates, RateType, Resource, ResourceCategory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub fn save_dataset_to_json<P: AsRef<Path>>(dataset: &Dataset, path: P) -> RepositoryResult<()> {
    dataset.validate()?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, dataset)?;
    Ok(())
}

pub fn load_dataset_from_json<P: AsRef<Path>>(path: P) -> RepositoryResult<Dataset> {
    let file = File::open(path)?;
    let dataset: Dataset = serde_json::from_reader(file)?;
    dataset.validate()?;
    Ok(dataset)
}

pub const RESOURCES_CSV: &str = "resources.csv";
pub const ALLOCATIONS_CSV: &str = "allocations.csv";
pub const PERIODS_CSV: &str = "periods.csv";

#[derive(Default, Serialize, Deserialize)]
struct ResourceCsvRecord {
    id: String,
    #[serde(default)]
    name: String,
    daily_capacity: f64,
    #[serde(default)]
    category: String,
    #[serde(default)]
    hourly_rate: String,
    #[serde(default)]
    overtime_rate: String,
    #[serde(default)]
    per_use_cost: String,
    #[serde(default)]
    fixed_cost: String,
    #[serde(default)]
    additional_rates: String,
}

impl ResourceCsvRecord {
    fn into_resource(self) -> RepositoryResult<Resource> {
        let category = ResourceCategory::from_str(&self.category)
            .map_err(RepositoryError::InvalidData)?;
        let cost_rates = CostRates {
            hourly_rate: parse_f64(&self.hourly_rate)?.unwrap_or(0.0),
            overtime_rate: parse_f64(&self.overtime_rate)?,
            per_use_cost: parse_f64(&self.per_use_cost)?,
            fixed_cost: parse_f64(&self.fixed_cost)?,
            additional_rates: split_f64(&self.additional_rates)?,
        };
        Ok(Resource::new(self.id, self.daily_capacity)
            .with_name(self.name)
            .with_category(category)
            .with_cost_rates(cost_rates))
    }
}

#[derive(Default, Serialize, Deserialize)]
struct AllocationCsvRecord {
    id: String,
    resource_id: String,
    #[serde(default)]
    activity_id: String,
    date_start: String,
    date_end: String,
    percent_units: f64,
    #[serde(default)]
    curve_reference: String,
    #[serde(default)]
    rate_type: String,
}

impl AllocationCsvRecord {
    fn into_allocation(self) -> RepositoryResult<Allocation> {
        let rate_type =
            RateType::from_str(&self.rate_type).map_err(RepositoryError::InvalidData)?;
        let mut allocation = Allocation::new(
            self.id,
            self.resource_id,
            self.activity_id,
            parse_date(&self.date_start)?,
            parse_date(&self.date_end)?,
            self.percent_units,
        )
        .with_rate_type(rate_type);
        if !self.curve_reference.trim().is_empty() {
            allocation = allocation.with_curve(self.curve_reference.trim());
        }
        Ok(allocation)
    }
}

#[derive(Default, Serialize, Deserialize)]
struct PeriodCsvRecord {
    allocation_id: String,
    period_start: String,
    period_end: String,
    #[serde(default)]
    planned_quantity: String,
    #[serde(default)]
    actual_quantity: String,
    #[serde(default)]
    remaining_quantity: String,
    #[serde(default)]
    planned_cost: String,
    #[serde(default)]
    actual_cost: String,
    #[serde(default)]
    remaining_cost: String,
    #[serde(default)]
    earned_value: String,
}

impl PeriodCsvRecord {
    fn into_period(self) -> RepositoryResult<AssignmentPeriod> {
        let mut period = AssignmentPeriod::new(
            self.allocation_id,
            parse_date(&self.period_start)?,
            parse_date(&self.period_end)?,
        );
        period.planned_quantity = parse_f64(&self.planned_quantity)?.unwrap_or(0.0);
        period.actual_quantity = parse_f64(&self.actual_quantity)?.unwrap_or(0.0);
        period.remaining_quantity = parse_f64(&self.remaining_quantity)?.unwrap_or(0.0);
        period.planned_cost = parse_f64(&self.planned_cost)?.unwrap_or(0.0);
        period.actual_cost = parse_f64(&self.actual_cost)?.unwrap_or(0.0);
        period.remaining_cost = parse_f64(&self.remaining_cost)?.unwrap_or(0.0);
        period.earned_value = parse_f64(&self.earned_value)?.unwrap_or(0.0);
        Ok(period)
    }
}

/// Reads `resources.csv`, `allocations.csv` and an optional `periods.csv` from a directory.
#[derive(Debug, Clone)]
pub struct CsvDirectoryRepository {
    dir: PathBuf,
}

impl CsvDirectoryRepository {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn load_dataset(&self) -> RepositoryResult<Dataset> {
        let dataset = Dataset {
            resources: self.resources()?,
            allocations: self.allocations()?,
            periods: self.assignment_periods()?,
            ..Dataset::default()
        };
        dataset.validate()?;
        Ok(dataset)
    }

    fn read_records<T, R, F>(&self, file_name: &str, convert: F) -> RepositoryResult<Vec<T>>
    where
        R: for<'de> Deserialize<'de>,
        F: Fn(R) -> RepositoryResult<T>,
    {
        let file = File::open(self.dir.join(file_name))?;
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
        let mut out = Vec::new();
        for record in reader.deserialize::<R>() {
            out.push(convert(record?)?);
        }
        Ok(out)
    }
}

impl ResourceRepository for CsvDirectoryRepository {
    fn resources(&self) -> RepositoryResult<Vec<Resource>> {
        self.read_records(RESOURCES_CSV, ResourceCsvRecord::into_resource)
    }
}

impl AllocationRepository for CsvDirectoryRepository {
    fn allocations(&self) -> RepositoryResult<Vec<Allocation>> {
        self.read_records(ALLOCATIONS_CSV, AllocationCsvRecord::into_allocation)
    }

    fn assignment_periods(&self) -> RepositoryResult<Vec<AssignmentPeriod>> {
        if !self.dir.join(PERIODS_CSV).exists() {
            return Ok(Vec::new());
        }
        self.read_records(PERIODS_CSV, PeriodCsvRecord::into_period)
    }
}

fn parse_date(input: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| RepositoryError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_f64(input: &str) -> RepositoryResult<Option<f64>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|e| RepositoryError::InvalidData(format!("invalid float '{input}': {e}")))
}

fn split_f64(input: &str) -> RepositoryResult<Vec<f64>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(';')
        .map(|part| {
            part.trim().parse::<f64>().map_err(|e| {
                RepositoryError::InvalidData(format!("invalid float '{part}': {e}"))
            })
        })
        .collect()
}
