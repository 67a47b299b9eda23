use crate::allocation::Allocation;
use crate::curve::{CurveLibrary, DistributionCurve};
use crate::error::EngineError;
use crate::period::AssignmentPeriod;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

pub trait ResourceRepository {
    fn resources(&self) -> RepositoryResult<Vec<Resource>>;
}

/// Source of allocations and their already time-phased periods.
pub trait AllocationRepository {
    fn allocations(&self) -> RepositoryResult<Vec<Allocation>>;

    fn assignment_periods(&self) -> RepositoryResult<Vec<AssignmentPeriod>>;

    /// Custom curves referenced by allocations. Presets are always available.
    fn curves(&self) -> RepositoryResult<CurveLibrary> {
        Ok(CurveLibrary::new())
    }
}

/// Everything the engine needs, as stored in a JSON dataset file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub periods: Vec<AssignmentPeriod>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub curves: BTreeMap<String, DistributionCurve>,
}

impl Dataset {
    /// Rejects duplicate resource or allocation ids.
    pub fn validate(&self) -> RepositoryResult<()> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if resource.id.trim().is_empty() {
                return Err(RepositoryError::InvalidData("resource id cannot be empty".into()));
            }
            if !seen.insert(resource.id.as_str()) {
                return Err(RepositoryError::InvalidData(format!(
                    "duplicate resource id '{}'",
                    resource.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for allocation in &self.allocations {
            if !seen.insert(allocation.id.as_str()) {
                return Err(RepositoryError::InvalidData(format!(
                    "duplicate allocation id '{}'",
                    allocation.id
                )));
            }
        }
        Ok(())
    }

    pub fn curve_library(&self) -> CurveLibrary {
        let mut library = CurveLibrary::new();
        for (name, curve) in &self.curves {
            library.register(name.clone(), curve.clone());
        }
        library
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    dataset: Dataset,
}

impl InMemoryRepository {
    pub fn new(resources: Vec<Resource>, allocations: Vec<Allocation>) -> Self {
        Self {
            dataset: Dataset {
                resources,
                allocations,
                ..Dataset::default()
            },
        }
    }

    pub fn with_periods(mut self, periods: Vec<AssignmentPeriod>) -> Self {
        self.dataset.periods = periods;
        self
    }

    pub fn with_curve(mut self, name: impl Into<String>, curve: DistributionCurve) -> Self {
        self.dataset.curves.insert(name.into(), curve);
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl From<Dataset> for InMemoryRepository {
    fn from(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

impl ResourceRepository for InMemoryRepository {
    fn resources(&self) -> RepositoryResult<Vec<Resource>> {
        Ok(self.dataset.resources.clone())
    }
}

impl AllocationRepository for InMemoryRepository {
    fn allocations(&self) -> RepositoryResult<Vec<Allocation>> {
        Ok(self.dataset.allocations.clone())
    }

    fn assignment_periods(&self) -> RepositoryResult<Vec<AssignmentPeriod>> {
        Ok(self.dataset.periods.clone())
    }

    fn curves(&self) -> RepositoryResult<CurveLibrary> {
        Ok(self.dataset.curve_library())
    }
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{CsvDirectoryRepository, load_dataset_from_json, save_dataset_to_json};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
