use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Commodity grouping used by the cost curves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Labor,
    Material,
    Equipment,
    Subcontractor,
    #[default]
    Other,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 5] = [
        ResourceCategory::Labor,
        ResourceCategory::Material,
        ResourceCategory::Equipment,
        ResourceCategory::Subcontractor,
        ResourceCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Labor => "labor",
            ResourceCategory::Material => "material",
            ResourceCategory::Equipment => "equipment",
            ResourceCategory::Subcontractor => "subcontractor",
            ResourceCategory::Other => "other",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "labor" | "labour" => Ok(ResourceCategory::Labor),
            "material" | "materials" => Ok(ResourceCategory::Material),
            "equipment" => Ok(ResourceCategory::Equipment),
            "subcontractor" | "subcontract" => Ok(ResourceCategory::Subcontractor),
            "other" | "" => Ok(ResourceCategory::Other),
            other => Err(format!("unknown resource category '{other}'")),
        }
    }
}

/// Price tier applied to an allocation's planned quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    #[default]
    Standard,
    Overtime,
    /// Index into `CostRates::additional_rates`.
    Tier(usize),
}

impl FromStr for RateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "" | "standard" => Ok(RateType::Standard),
            "overtime" => Ok(RateType::Overtime),
            _ => value
                .strip_prefix("tier")
                .and_then(|idx| idx.trim_start_matches(['_', ':']).parse::<usize>().ok())
                .map(RateType::Tier)
                .ok_or_else(|| format!("unknown rate type '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    /// Cost per unit of capacity (e.g. per hour).
    pub hourly_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overtime_rate: Option<f64>,
    /// Charged once per allocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_use_cost: Option<f64>,
    /// Lump sum spread across the allocation with its quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_rates: Vec<f64>,
}

impl CostRates {
    pub fn hourly(rate: f64) -> Self {
        Self {
            hourly_rate: rate,
            ..Self::default()
        }
    }

    /// Unit rate for a tier, falling back to the standard rate when the tier is not priced.
    pub fn unit_rate(&self, rate_type: RateType) -> f64 {
        match rate_type {
            RateType::Standard => self.hourly_rate,
            RateType::Overtime => self.overtime_rate.unwrap_or(self.hourly_rate),
            RateType::Tier(idx) => self
                .additional_rates
                .get(idx)
                .copied()
                .unwrap_or(self.hourly_rate),
        }
    }
}

/// A person, crew, piece of equipment, or material supply with a daily capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Committable units per day (e.g. hours/day). Must be positive for conflict checks.
    pub daily_capacity: f64,
    #[serde(default)]
    pub cost_rates: CostRates,
    #[serde(default)]
    pub category: ResourceCategory,
}

impl Resource {
    pub fn new(id: impl Into<String>, daily_capacity: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            daily_capacity,
            cost_rates: CostRates::default(),
            category: ResourceCategory::Other,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_category(mut self, category: ResourceCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_cost_rates(mut self, cost_rates: CostRates) -> Self {
        self.cost_rates = cost_rates;
        self
    }

    pub fn has_positive_capacity(&self) -> bool {
        self.daily_capacity.is_finite() && self.daily_capacity > 0.0
    }
}
