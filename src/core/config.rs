use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{FusionError, Result};

pub const DEFAULT_TOLERANCE_FRACTION: f64 = 0.05;
pub const DEFAULT_RESCUE_MULTIPLIER: f64 = 4.0;

/// Numeric knobs of the fusion core.
///
/// * `tolerance_fraction` - buffer as a fraction of the median token height.
/// * `rescue_multiplier` - rescue tolerance as a multiple of the buffer.
/// * `band_height` - line bucket height for reading order; `None` uses the
///   median token height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FusionConfig {
    pub tolerance_fraction: f64,
    pub rescue_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_height: Option<f64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            tolerance_fraction: DEFAULT_TOLERANCE_FRACTION,
            rescue_multiplier: DEFAULT_RESCUE_MULTIPLIER,
            band_height: None,
        }
    }
}

impl FusionConfig {
    pub fn with_tolerance_fraction(mut self, value: f64) -> Self {
        self.tolerance_fraction = value;
        self
    }

    pub fn with_rescue_multiplier(mut self, value: f64) -> Self {
        self.rescue_multiplier = value;
        self
    }

    pub fn with_band_height(mut self, value: Option<f64>) -> Self {
        self.band_height = value;
        self
    }

    /// Reads a TOML file with any subset of the fields.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: FusionConfig =
            toml::from_str(raw).map_err(|e| FusionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_fraction.is_finite() || self.tolerance_fraction < 0.0 {
            return Err(FusionError::InvalidConfig(format!(
                "tolerance_fraction must be a non-negative number, got {}",
                self.tolerance_fraction
            )));
        }
        if !self.rescue_multiplier.is_finite() || self.rescue_multiplier < 0.0 {
            return Err(FusionError::InvalidConfig(format!(
                "rescue_multiplier must be a non-negative number, got {}",
                self.rescue_multiplier
            )));
        }
        if let Some(band) = self.band_height {
            if !band.is_finite() || band <= 0.0 {
                return Err(FusionError::InvalidConfig(format!(
                    "band_height must be positive, got {band}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = FusionConfig::from_toml_str("tolerance_fraction = 0.02\n").unwrap();
        assert_eq!(config.tolerance_fraction, 0.02);
        assert_eq!(config.rescue_multiplier, DEFAULT_RESCUE_MULTIPLIER);
        assert_eq!(config.band_height, None);
    }

    #[test]
    fn rejects_negative_and_unknown_values() {
        assert!(FusionConfig::from_toml_str("rescue_multiplier = -1.0").is_err());
        assert!(FusionConfig::from_toml_str("band_height = 0.0").is_err());
        assert!(FusionConfig::from_toml_str("tolerance = 0.1").is_err());
        assert!(FusionConfig::default().validate().is_ok());
    }
}
