//! Entry point tying the repositories to the capacity computations.

use crate::aggregation::aggregate;
use crate::allocation::{Allocation, group_by_resource};
use crate::commodity::{CommodityCurves, build_commodity_curves};
use crate::config::EngineConfig;
use crate::conflict::{ConflictEpisode, detect};
use crate::curve::{CurveLibrary, DistributionCurve};
use crate::distribution::{CurveDistributor, DailyIncrement};
use crate::error::{EngineError, EngineResult};
use crate::histogram::{HistogramPoint, build_histogram};
use crate::period::{AssignmentPeriod, GroupBy};
use crate::repository::{AllocationRepository, RepositoryResult, ResourceRepository};
use crate::resource::{Resource, ResourceCategory};
use crate::timeseries::{SCurve, build_s_curve};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Which periods feed an S-curve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "id")]
pub enum SCurveScope {
    #[default]
    Project,
    Resource(String),
    Activity(String),
}

/// A resource left out of batch conflict detection and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDiagnostic {
    pub resource_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub episodes: Vec<ConflictEpisode>,
    pub diagnostics: Vec<ResourceDiagnostic>,
}

impl ConflictReport {
    pub fn is_clean(&self) -> bool {
        self.episodes.is_empty() && self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapacityEngine {
    config: EngineConfig,
    resources: Vec<Resource>,
    allocations: Vec<Allocation>,
    periods: Vec<AssignmentPeriod>,
    curves: CurveLibrary,
}

impl CapacityEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn from_parts(
        config: EngineConfig,
        resources: Vec<Resource>,
        allocations: Vec<Allocation>,
        periods: Vec<AssignmentPeriod>,
    ) -> Self {
        Self {
            config,
            resources,
            allocations,
            periods,
            curves: CurveLibrary::new(),
        }
    }

    pub fn with_curves(mut self, curves: CurveLibrary) -> Self {
        self.curves = curves;
        self
    }

    /// Reads everything from `source` once; later calls work on the snapshot.
    pub fn load<S>(config: EngineConfig, source: &S) -> RepositoryResult<Self>
    where
        S: ResourceRepository + AllocationRepository,
    {
        let engine = Self::from_parts(
            config,
            source.resources()?,
            source.allocations()?,
            source.assignment_periods()?,
        )
        .with_curves(source.curves()?);
        debug!(
            resources = engine.resources.len(),
            allocations = engine.allocations.len(),
            periods = engine.periods.len(),
            "capacity engine loaded"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn periods(&self) -> &[AssignmentPeriod] {
        &self.periods
    }

    pub fn curves(&self) -> &CurveLibrary {
        &self.curves
    }

    pub fn resource(&self, resource_id: &str) -> EngineResult<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.id == resource_id)
            .ok_or_else(|| EngineError::UnknownResource(resource_id.to_string()))
    }

    pub fn allocation(&self, allocation_id: &str) -> EngineResult<&Allocation> {
        self.allocations
            .iter()
            .find(|allocation| allocation.id == allocation_id)
            .ok_or_else(|| EngineError::UnknownAllocation(allocation_id.to_string()))
    }

    pub fn allocations_for(&self, resource_id: &str) -> Vec<&Allocation> {
        self.allocations
            .iter()
            .filter(|allocation| allocation.resource_id == resource_id)
            .collect()
    }

    pub fn distributor(&self) -> CurveDistributor {
        CurveDistributor::from_config(&self.config)
    }

    /// Curve for a name, or the configured default when `reference` is empty.
    pub fn resolve_curve(&self, reference: Option<&str>) -> EngineResult<DistributionCurve> {
        self.curves.resolve(reference, self.config.default_curve)
    }

    fn conflicts_for(
        &self,
        resource: &Resource,
        allocations: &[&Allocation],
    ) -> EngineResult<Vec<ConflictEpisode>> {
        if !resource.has_positive_capacity() {
            return Err(EngineError::NonPositiveCapacity {
                resource_id: resource.id.clone(),
                capacity: resource.daily_capacity,
            });
        }
        let loads = aggregate(allocations, resource.daily_capacity, self.config.max_span_days)?;
        detect(&resource.id, &loads, resource.daily_capacity)
    }

    /// Over-allocation episodes for one resource, or for every resource.
    ///
    /// A single-resource request returns that resource's validation error.
    /// In batch mode invalid resources are skipped and listed in
    /// `diagnostics`; episodes keep resource order.
    pub fn detect_conflicts(&self, resource_id: Option<&str>) -> EngineResult<ConflictReport> {
        if let Some(resource_id) = resource_id {
            let resource = self.resource(resource_id)?;
            let allocations = self.allocations_for(resource_id);
            let episodes = self.conflicts_for(resource, &allocations)?;
            debug!(resource_id, episodes = episodes.len(), "conflict detection finished");
            return Ok(ConflictReport {
                episodes,
                diagnostics: Vec::new(),
            });
        }

        let grouped = group_by_resource(&self.allocations);
        let results: Vec<(&str, EngineResult<Vec<ConflictEpisode>>)> = self
            .resources
            .par_iter()
            .map(|resource| {
                let allocations = grouped
                    .get(resource.id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                (resource.id.as_str(), self.conflicts_for(resource, allocations))
            })
            .collect();

        let mut report = ConflictReport::default();
        for (resource_id, result) in results {
            match result {
                Ok(episodes) => report.episodes.extend(episodes),
                Err(err) => {
                    warn!(resource_id, error = %err, "resource skipped in conflict detection");
                    report.diagnostics.push(ResourceDiagnostic {
                        resource_id: resource_id.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let known: HashSet<&str> = self.resources.iter().map(|r| r.id.as_str()).collect();
        for orphan in grouped.keys().filter(|id| !known.contains(*id)) {
            let err = EngineError::UnknownResource(orphan.to_string());
            warn!(resource_id = *orphan, "allocations reference an unknown resource");
            report.diagnostics.push(ResourceDiagnostic {
                resource_id: orphan.to_string(),
                reason: err.to_string(),
            });
        }

        debug!(
            resources = self.resources.len(),
            episodes = report.episodes.len(),
            skipped = report.diagnostics.len(),
            "conflict detection finished"
        );
        Ok(report)
    }

    pub fn distribute(
        &self,
        total: f64,
        start: NaiveDate,
        end: NaiveDate,
        curve: &DistributionCurve,
    ) -> EngineResult<Vec<DailyIncrement>> {
        self.distributor().distribute(total, start, end, curve)
    }

    pub fn build_histogram(
        &self,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Vec<HistogramPoint>> {
        let resource = self.resource(resource_id)?;
        let allocations = self.allocations_for(resource_id);
        build_histogram(resource, &allocations, start, end, self.config.max_span_days)
    }

    /// Planned periods for one allocation, using its curve reference.
    pub fn phase_allocation(
        &self,
        allocation_id: &str,
        group_by: GroupBy,
    ) -> EngineResult<Vec<AssignmentPeriod>> {
        let allocation = self.allocation(allocation_id)?;
        let resource = self.resource(&allocation.resource_id)?;
        let curve = self.resolve_curve(allocation.curve_reference.as_deref())?;
        self.distributor()
            .phase_allocation(allocation, resource, &curve, group_by)
    }

    pub fn build_s_curve(&self, group_by: GroupBy) -> SCurve {
        build_s_curve(&self.periods, group_by)
    }

    pub fn build_s_curve_for(&self, group_by: GroupBy, scope: &SCurveScope) -> EngineResult<SCurve> {
        let allocation_ids: HashSet<&str> = match scope {
            SCurveScope::Project => return Ok(self.build_s_curve(group_by)),
            SCurveScope::Resource(resource_id) => {
                self.resource(resource_id)?;
                self.allocations
                    .iter()
                    .filter(|a| &a.resource_id == resource_id)
                    .map(|a| a.id.as_str())
                    .collect()
            }
            SCurveScope::Activity(activity_id) => self
                .allocations
                .iter()
                .filter(|a| &a.activity_id == activity_id)
                .map(|a| a.id.as_str())
                .collect(),
        };
        let periods = self
            .periods
            .iter()
            .filter(|p| allocation_ids.contains(p.allocation_id.as_str()));
        Ok(build_s_curve(periods, group_by))
    }

    /// Planned cost per resource category. Periods whose allocation or
    /// resource is unknown count as [`ResourceCategory::Other`].
    pub fn build_commodity_curves(&self, group_by: GroupBy) -> CommodityCurves {
        let categories: HashMap<&str, ResourceCategory> = self
            .resources
            .iter()
            .map(|r| (r.id.as_str(), r.category))
            .collect();
        let by_allocation: HashMap<&str, ResourceCategory> = self
            .allocations
            .iter()
            .map(|a| {
                let category = categories
                    .get(a.resource_id.as_str())
                    .copied()
                    .unwrap_or_default();
                (a.id.as_str(), category)
            })
            .collect();

        let entries = self.periods.iter().map(|period| {
            let category = by_allocation
                .get(period.allocation_id.as_str())
                .copied()
                .unwrap_or_default();
            (category, period)
        });
        build_commodity_curves(entries, group_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine() -> CapacityEngine {
        CapacityEngine::from_parts(
            EngineConfig::default(),
            vec![Resource::new("welder", 8.0)],
            vec![
                Allocation::new("a1", "welder", "act-1", d(2025, 3, 3), d(2025, 3, 5), 60.0),
                Allocation::new("a2", "welder", "act-2", d(2025, 3, 3), d(2025, 3, 5), 60.0),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn unknown_resource_is_an_error() {
        assert!(matches!(
            engine().detect_conflicts(Some("crane")),
            Err(EngineError::UnknownResource(id)) if id == "crane"
        ));
    }

    #[test]
    fn single_resource_report_has_no_diagnostics() {
        let report = engine().detect_conflicts(Some("welder")).unwrap();
        assert_eq!(report.episodes.len(), 1);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn phase_allocation_resolves_resource_and_curve() {
        let periods = engine().phase_allocation("a1", GroupBy::Day).unwrap();
        assert_eq!(periods.len(), 3);
        let total: f64 = periods.iter().map(|p| p.planned_quantity).sum();
        assert!((total - 14.4).abs() < 1e-9);
        assert!(matches!(
            engine().phase_allocation("zzz", GroupBy::Day),
            Err(EngineError::UnknownAllocation(_))
        ));
    }
}
