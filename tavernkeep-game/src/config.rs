//! Static per-inn configuration, loaded once and validated up front.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when inn configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("arrival floor {floor:.2} exceeds ceiling {ceiling:.2}")]
    ArrivalBounds { floor: f32, ceiling: f32 },
}

/// Floor-plan footprint; consumed by the external renderer, carried here so
/// a single record describes the whole inn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 12,
            height: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnConfig {
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default = "InnConfig::default_max_customers")]
    pub max_customers: u32,
    #[serde(default = "InnConfig::default_base_arrival_chance")]
    pub base_arrival_chance: f32,
    #[serde(default = "InnConfig::default_arrival_floor")]
    pub arrival_floor: f32,
    #[serde(default = "InnConfig::default_arrival_ceiling")]
    pub arrival_ceiling: f32,
    /// Fraction of each fulfilled order's price that lands in the till.
    #[serde(default = "InnConfig::default_base_earnings_rate")]
    pub base_earnings_rate: f32,
    #[serde(default = "InnConfig::default_base_wage")]
    pub base_wage: i64,
    #[serde(default = "InnConfig::default_overnight_fee")]
    pub overnight_fee: i64,
    #[serde(default = "InnConfig::default_level")]
    pub level: u32,
}

impl InnConfig {
    const fn default_max_customers() -> u32 {
        12
    }

    const fn default_base_arrival_chance() -> f32 {
        0.25
    }

    const fn default_arrival_floor() -> f32 {
        0.05
    }

    const fn default_arrival_ceiling() -> f32 {
        0.75
    }

    const fn default_base_earnings_rate() -> f32 {
        1.0
    }

    const fn default_base_wage() -> i64 {
        10
    }

    const fn default_overnight_fee() -> i64 {
        15
    }

    const fn default_level() -> u32 {
        1
    }

    /// Validate configuration invariants before sanitization.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_customers == 0 {
            return Err(ConfigError::MinViolation {
                field: "max_customers",
                min: 1.0,
                value: 0.0,
            });
        }
        if !(0.0..=1.0).contains(&self.base_arrival_chance) {
            return Err(ConfigError::RangeViolation {
                field: "base_arrival_chance",
                min: 0.0,
                max: 1.0,
                value: f64::from(self.base_arrival_chance),
            });
        }
        if self.arrival_floor > self.arrival_ceiling {
            return Err(ConfigError::ArrivalBounds {
                floor: self.arrival_floor,
                ceiling: self.arrival_ceiling,
            });
        }
        if !(0.0..=1.0).contains(&self.arrival_floor) || !(0.0..=1.0).contains(&self.arrival_ceiling)
        {
            return Err(ConfigError::RangeViolation {
                field: "arrival_floor/arrival_ceiling",
                min: 0.0,
                max: 1.0,
                value: f64::from(self.arrival_floor),
            });
        }
        if self.base_earnings_rate <= 0.0 {
            return Err(ConfigError::MinViolation {
                field: "base_earnings_rate",
                min: 0.01,
                value: f64::from(self.base_earnings_rate),
            });
        }
        if self.base_wage < 0 {
            return Err(ConfigError::MinViolation {
                field: "base_wage",
                min: 0.0,
                value: self.base_wage as f64,
            });
        }
        if self.overnight_fee < 0 {
            return Err(ConfigError::MinViolation {
                field: "overnight_fee",
                min: 0.0,
                value: self.overnight_fee as f64,
            });
        }
        Ok(())
    }

    /// Clamp soft fields into their working ranges after deserialization.
    pub fn sanitize(&mut self) {
        self.base_arrival_chance = self.base_arrival_chance.clamp(0.0, 1.0);
        self.arrival_floor = self.arrival_floor.clamp(0.0, 1.0);
        self.arrival_ceiling = self.arrival_ceiling.clamp(self.arrival_floor, 1.0);
        self.base_earnings_rate = self.base_earnings_rate.max(0.01);
        self.base_wage = self.base_wage.max(0);
        self.overnight_fee = self.overnight_fee.max(0);
        self.level = self.level.max(1);
    }
}

impl Default for InnConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::default(),
            max_customers: Self::default_max_customers(),
            base_arrival_chance: Self::default_base_arrival_chance(),
            arrival_floor: Self::default_arrival_floor(),
            arrival_ceiling: Self::default_arrival_ceiling(),
            base_earnings_rate: Self::default_base_earnings_rate(),
            base_wage: Self::default_base_wage(),
            overnight_fee: Self::default_overnight_fee(),
            level: Self::default_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = InnConfig::default();
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: InnConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(cfg, InnConfig::default());
    }

    #[test]
    fn rejects_inverted_arrival_bounds() {
        let cfg = InnConfig {
            arrival_floor: 0.9,
            arrival_ceiling: 0.1,
            ..InnConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ArrivalBounds { .. })
        ));
    }

    #[test]
    fn sanitize_restores_working_ranges() {
        let mut cfg = InnConfig {
            base_arrival_chance: 3.0,
            arrival_floor: 0.5,
            arrival_ceiling: 0.2,
            base_wage: -4,
            ..InnConfig::default()
        };
        cfg.sanitize();
        assert!((cfg.base_arrival_chance - 1.0).abs() < f32::EPSILON);
        assert!(cfg.arrival_ceiling >= cfg.arrival_floor);
        assert_eq!(cfg.base_wage, 0);
    }
}
