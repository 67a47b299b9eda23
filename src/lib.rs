pub mod aggregation;
pub mod allocation;
pub mod calendar;
pub mod commodity;
pub mod config;
pub mod conflict;
pub mod curve;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod frames;
pub mod histogram;
#[cfg(feature = "cli")]
pub mod logging;
pub mod period;
pub mod repository;
pub mod resource;
pub mod timeseries;

pub use allocation::Allocation;
pub use calendar::WorkWeek;
pub use commodity::{CategoryShare, CommodityCurves};
pub use config::EngineConfig;
pub use conflict::{ConflictEpisode, Severity};
pub use curve::{CurveLibrary, CurvePreset, DistributionCurve};
pub use distribution::{CurveDistributor, DailyIncrement, distribute};
pub use engine::{CapacityEngine, ConflictReport, ResourceDiagnostic, SCurveScope};
pub use error::{EngineError, EngineResult};
pub use histogram::HistogramPoint;
pub use period::{AssignmentPeriod, GroupBy};
pub use resource::{CostRates, RateType, Resource, ResourceCategory};
pub use timeseries::{EvmMetrics, SCurve, SCurvePoint};
