use crate::curve::CurvePreset;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Roughly ten years of calendar days.
pub const DEFAULT_MAX_SPAN_DAYS: i64 = 3660;

pub const ENV_MAX_SPAN_DAYS: &str = "RESOURCE_ENGINE_MAX_SPAN_DAYS";
pub const ENV_SKIP_WEEKENDS: &str = "RESOURCE_ENGINE_SKIP_WEEKENDS";
pub const ENV_DEFAULT_CURVE: &str = "RESOURCE_ENGINE_DEFAULT_CURVE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest inclusive date span, in days, the engine iterates day by day.
    pub max_span_days: i64,
    /// Spread planned quantities over Monday-Friday only.
    pub skip_weekends: bool,
    /// Curve used for allocations without a curve reference.
    pub default_curve: CurvePreset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_span_days: DEFAULT_MAX_SPAN_DAYS,
            skip_weekends: false,
            default_curve: CurvePreset::Linear,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: EngineConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with any `RESOURCE_ENGINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_SPAN_DAYS) {
            self.max_span_days = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_MAX_SPAN_DAYS.to_string(),
                message: format!("'{raw}' is not an integer"),
            })?;
        }
        if let Some(raw) = lookup(ENV_SKIP_WEEKENDS) {
            self.skip_weekends = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_SKIP_WEEKENDS.to_string(),
                        message: format!("'{other}' is not a boolean"),
                    });
                }
            };
        }
        if let Some(raw) = lookup(ENV_DEFAULT_CURVE) {
            self.default_curve =
                CurvePreset::from_str(&raw).map_err(|err| ConfigError::InvalidValue {
                    key: ENV_DEFAULT_CURVE.to_string(),
                    message: err.to_string(),
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_span_days < 1 {
            return Err(ConfigError::InvalidValue {
                key: "max_span_days".to_string(),
                message: format!("must be at least 1 (got {})", self.max_span_days),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = EngineConfig::default()
            .with_overrides(lookup(&[
                (ENV_MAX_SPAN_DAYS, "400"),
                (ENV_SKIP_WEEKENDS, "yes"),
                (ENV_DEFAULT_CURVE, "bell"),
            ]))
            .unwrap();
        assert_eq!(config.max_span_days, 400);
        assert!(config.skip_weekends);
        assert_eq!(config.default_curve, CurvePreset::Bell);
    }

    #[test]
    fn rejects_zero_span_limit() {
        let err = EngineConfig::default()
            .with_overrides(lookup(&[(ENV_MAX_SPAN_DAYS, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_unparseable_flag() {
        let err = EngineConfig::default()
            .with_overrides(lookup(&[(ENV_SKIP_WEEKENDS, "sometimes")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_SKIP_WEEKENDS));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"skip_weekends": true}"#).unwrap();
        assert!(config.skip_weekends);
        assert_eq!(config.max_span_days, DEFAULT_MAX_SPAN_DAYS);
        assert_eq!(config.default_curve, CurvePreset::Linear);
    }
}
