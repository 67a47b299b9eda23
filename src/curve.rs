//! Cumulative progress curves.
//!
//! A curve is a 21-point table of cumulative percent complete sampled at 5%
//! steps of the elapsed span. Presets cover the usual construction loading
//! profiles; arbitrary tables go through the same validation.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const CURVE_POINTS: usize = 21;
const SEGMENTS: usize = CURVE_POINTS - 1;

const LINEAR: [f64; CURVE_POINTS] = [
    0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0,
    80.0, 85.0, 90.0, 95.0, 100.0,
];

const BELL: [f64; CURVE_POINTS] = [
    0.0, 1.0, 2.5, 4.5, 7.5, 11.5, 16.5, 22.5, 29.5, 38.0, 50.0, 62.0, 70.5, 77.5, 83.5, 88.5,
    92.5, 95.5, 98.0, 99.9, 100.0,
];

const FRONT_LOADED: [f64; CURVE_POINTS] = [
    0.0, 10.0, 19.0, 27.5, 35.5, 43.0, 50.0, 56.5, 62.5, 68.0, 73.0, 77.5, 81.5, 85.0, 88.0, 90.5,
    92.75, 94.75, 96.5, 98.25, 100.0,
];

const BACK_LOADED: [f64; CURVE_POINTS] = [
    0.0, 1.75, 3.5, 5.25, 7.25, 9.5, 12.0, 15.0, 18.5, 22.5, 27.0, 32.0, 37.5, 43.5, 50.0, 57.0,
    64.5, 72.5, 81.0, 90.0, 100.0,
];

const TRIANGULAR: [f64; CURVE_POINTS] = [
    0.0, 0.5, 2.0, 4.5, 8.0, 12.5, 18.0, 24.5, 32.0, 40.5, 50.0, 59.5, 68.0, 75.5, 82.0, 87.5,
    92.0, 95.5, 98.0, 99.5, 100.0,
];

// Linear ramp over the first and last quarter, flat rate in between.
const TRAPEZOIDAL: [f64; CURVE_POINTS] = [
    0.0, 0.67, 2.67, 6.0, 10.67, 16.67, 23.33, 30.0, 36.67, 43.33, 50.0, 56.67, 63.33, 70.0, 76.67,
    83.33, 89.33, 94.0, 97.33, 99.33, 100.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurvePreset {
    Linear,
    #[serde(alias = "s_curve")]
    Bell,
    FrontLoaded,
    BackLoaded,
    Triangular,
    Trapezoidal,
}

impl CurvePreset {
    pub const ALL: [CurvePreset; 6] = [
        CurvePreset::Linear,
        CurvePreset::Bell,
        CurvePreset::FrontLoaded,
        CurvePreset::BackLoaded,
        CurvePreset::Triangular,
        CurvePreset::Trapezoidal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurvePreset::Linear => "linear",
            CurvePreset::Bell => "bell",
            CurvePreset::FrontLoaded => "front_loaded",
            CurvePreset::BackLoaded => "back_loaded",
            CurvePreset::Triangular => "triangular",
            CurvePreset::Trapezoidal => "trapezoidal",
        }
    }

    fn points(&self) -> [f64; CURVE_POINTS] {
        match self {
            CurvePreset::Linear => LINEAR,
            CurvePreset::Bell => BELL,
            CurvePreset::FrontLoaded => FRONT_LOADED,
            CurvePreset::BackLoaded => BACK_LOADED,
            CurvePreset::Triangular => TRIANGULAR,
            CurvePreset::Trapezoidal => TRAPEZOIDAL,
        }
    }

    pub fn curve(&self) -> DistributionCurve {
        DistributionCurve {
            points: self.points(),
        }
    }
}

impl fmt::Display for CurvePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurvePreset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "linear" | "uniform" => Ok(CurvePreset::Linear),
            "bell" | "s_curve" | "scurve" => Ok(CurvePreset::Bell),
            "front_loaded" | "front" => Ok(CurvePreset::FrontLoaded),
            "back_loaded" | "back" => Ok(CurvePreset::BackLoaded),
            "triangular" => Ok(CurvePreset::Triangular),
            "trapezoidal" => Ok(CurvePreset::Trapezoidal),
            _ => Err(EngineError::UnknownCurve(s.to_string())),
        }
    }
}

/// Validated 21-point cumulative percent table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct DistributionCurve {
    points: [f64; CURVE_POINTS],
}

impl DistributionCurve {
    pub fn new(points: &[f64]) -> EngineResult<Self> {
        if points.len() != CURVE_POINTS {
            return Err(EngineError::InvalidCurve(format!(
                "expected {CURVE_POINTS} points, got {}",
                points.len()
            )));
        }
        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(EngineError::InvalidCurve(format!(
                "point {idx} is not a finite number"
            )));
        }
        if points[0] != 0.0 {
            return Err(EngineError::InvalidCurve(format!(
                "first point must be 0 (got {})",
                points[0]
            )));
        }
        if points[SEGMENTS] != 100.0 {
            return Err(EngineError::InvalidCurve(format!(
                "last point must be 100 (got {})",
                points[SEGMENTS]
            )));
        }
        for idx in 1..CURVE_POINTS {
            if points[idx] < points[idx - 1] {
                return Err(EngineError::InvalidCurve(format!(
                    "point {idx} ({}) is below point {} ({})",
                    points[idx],
                    idx - 1,
                    points[idx - 1]
                )));
            }
        }
        let mut table = [0.0; CURVE_POINTS];
        table.copy_from_slice(points);
        Ok(Self { points: table })
    }

    pub fn linear() -> Self {
        CurvePreset::Linear.curve()
    }

    pub fn points(&self) -> &[f64; CURVE_POINTS] {
        &self.points
    }

    /// Cumulative percent complete at `position` (0.0 = span start, 1.0 = span end).
    pub fn percent_at(&self, position: f64) -> f64 {
        if position.is_nan() || position <= 0.0 {
            return 0.0;
        }
        if position >= 1.0 {
            return 100.0;
        }
        let scaled = position * SEGMENTS as f64;
        let idx = (scaled.floor() as usize).min(SEGMENTS - 1);
        let fraction = scaled - idx as f64;
        let lower = self.points[idx];
        let upper = self.points[idx + 1];
        lower + (upper - lower) * fraction
    }
}

impl Default for DistributionCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl TryFrom<Vec<f64>> for DistributionCurve {
    type Error = EngineError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DistributionCurve> for Vec<f64> {
    fn from(curve: DistributionCurve) -> Self {
        curve.points.to_vec()
    }
}

impl From<CurvePreset> for DistributionCurve {
    fn from(preset: CurvePreset) -> Self {
        preset.curve()
    }
}

/// Presets plus named custom curves, used to resolve allocation curve references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveLibrary {
    #[serde(default)]
    custom: BTreeMap<String, DistributionCurve>,
}

impl CurveLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom curve. Custom names shadow preset names.
    pub fn register(&mut self, name: impl Into<String>, curve: DistributionCurve) {
        self.custom.insert(name.into(), curve);
    }

    pub fn get(&self, name: &str) -> Option<DistributionCurve> {
        if let Some(curve) = self.custom.get(name) {
            return Some(curve.clone());
        }
        CurvePreset::from_str(name).ok().map(|preset| preset.curve())
    }

    pub fn resolve(
        &self,
        reference: Option<&str>,
        fallback: CurvePreset,
    ) -> EngineResult<DistributionCurve> {
        match reference.map(str::trim).filter(|name| !name.is_empty()) {
            None => Ok(fallback.curve()),
            Some(name) => self
                .get(name)
                .ok_or_else(|| EngineError::UnknownCurve(name.to_string())),
        }
    }

    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }
}
