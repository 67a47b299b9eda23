//! Over-allocation detection.
//!
//! Walks a resource's per-day load in date order and groups consecutive
//! over-capacity days into episodes. A day at or below capacity, a missing
//! day in the sparse load map, or the end of the series closes the open
//! episode.

use crate::aggregation::{DailyLoad, DailyLoadMap};
use crate::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Relative margin: loads within `LOAD_TOLERANCE * capacity` of capacity count as at capacity.
pub const LOAD_TOLERANCE: f64 = 1e-9;

/// Whether `load` exceeds `capacity` by more than rounding noise. NaN never does.
pub fn is_over_capacity(load: f64, capacity: f64) -> bool {
    load - capacity > LOAD_TOLERANCE * capacity
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Tier for a peak excess over `capacity`. Boundary ratios fall to the lower tier.
    pub fn classify(max_excess: f64, capacity: f64) -> Self {
        if max_excess > capacity {
            return Severity::Critical;
        }
        let ratio = max_excess / capacity;
        if ratio > 0.5 {
            Severity::High
        } else if ratio > 0.25 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEpisode {
    pub resource_id: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub day_count: i64,
    pub capacity: f64,
    pub peak_date: NaiveDate,
    pub peak_load: f64,
    pub max_excess: f64,
    pub excess_ratio: f64,
    pub allocation_ids: Vec<String>,
    pub activity_ids: Vec<String>,
    pub severity: Severity,
}

impl ConflictEpisode {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenEpisode {
    start: NaiveDate,
    end: NaiveDate,
    day_count: i64,
    peak_date: NaiveDate,
    peak_load: f64,
    max_excess: f64,
    allocation_ids: BTreeSet<String>,
    activity_ids: BTreeSet<String>,
}

impl OpenEpisode {
    fn begin(date: NaiveDate, load: &DailyLoad, excess: f64) -> Self {
        Self {
            start: date,
            end: date,
            day_count: 1,
            peak_date: date,
            peak_load: load.total,
            max_excess: excess,
            allocation_ids: load.allocation_ids.clone(),
            activity_ids: load.activity_ids.clone(),
        }
    }

    fn extend(&mut self, date: NaiveDate, load: &DailyLoad, excess: f64) {
        self.end = date;
        self.day_count += 1;
        if excess > self.max_excess {
            self.max_excess = excess;
            self.peak_load = load.total;
            self.peak_date = date;
        }
        self.allocation_ids.extend(load.allocation_ids.iter().cloned());
        self.activity_ids.extend(load.activity_ids.iter().cloned());
    }

    fn follows(&self, date: NaiveDate) -> bool {
        self.end.succ_opt() == Some(date)
    }

    fn into_episode(self, resource_id: &str, capacity: f64) -> ConflictEpisode {
        ConflictEpisode {
            resource_id: resource_id.to_string(),
            date_start: self.start,
            date_end: self.end,
            day_count: self.day_count,
            capacity,
            peak_date: self.peak_date,
            peak_load: self.peak_load,
            max_excess: self.max_excess,
            excess_ratio: self.max_excess / capacity,
            allocation_ids: self.allocation_ids.into_iter().collect(),
            activity_ids: self.activity_ids.into_iter().collect(),
            severity: Severity::classify(self.max_excess, capacity),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeState {
    NoOpenEpisode,
    OpenEpisode(OpenEpisode),
}

/// Run-length state machine over ascending dates for one resource.
#[derive(Debug, Clone)]
pub struct EpisodeTracker {
    resource_id: String,
    capacity: f64,
    state: EpisodeState,
    episodes: Vec<ConflictEpisode>,
}

impl EpisodeTracker {
    pub fn new(resource_id: impl Into<String>, capacity: f64) -> EngineResult<Self> {
        let resource_id = resource_id.into();
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(EngineError::NonPositiveCapacity {
                resource_id,
                capacity,
            });
        }
        Ok(Self {
            resource_id,
            capacity,
            state: EpisodeState::NoOpenEpisode,
            episodes: Vec::new(),
        })
    }

    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, EpisodeState::OpenEpisode(_))
    }

    /// Feed the next day. Dates must be strictly ascending.
    pub fn observe(&mut self, date: NaiveDate, load: &DailyLoad) {
        if !is_over_capacity(load.total, self.capacity) {
            self.close();
            return;
        }
        let excess = load.total - self.capacity;

        if let EpisodeState::OpenEpisode(open) = &mut self.state {
            if open.follows(date) {
                open.extend(date, load, excess);
                return;
            }
        }
        // Skipped dates had zero load, so a gap ends the previous run.
        self.close();
        self.state = EpisodeState::OpenEpisode(OpenEpisode::begin(date, load, excess));
    }

    /// Close the open episode, if any, and record it.
    pub fn close(&mut self) {
        if let EpisodeState::OpenEpisode(open) =
            std::mem::replace(&mut self.state, EpisodeState::NoOpenEpisode)
        {
            self.episodes
                .push(open.into_episode(&self.resource_id, self.capacity));
        }
    }

    pub fn finish(mut self) -> Vec<ConflictEpisode> {
        self.close();
        self.episodes
    }
}

/// Episodes where `loads` exceed `capacity`, in date order.
pub fn detect(
    resource_id: &str,
    loads: &DailyLoadMap,
    capacity: f64,
) -> EngineResult<Vec<ConflictEpisode>> {
    let mut tracker = EpisodeTracker::new(resource_id, capacity)?;
    for (date, load) in loads {
        tracker.observe(*date, load);
    }
    Ok(tracker.finish())
}
