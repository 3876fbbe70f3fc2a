//! Board configuration.
//!
//! Every field has a default, so a config file only needs to name the values
//! it overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Zoom limits and wheel step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Multiplicative factor applied per zoom notch.
    pub scale_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 10.0,
            scale_step: 1.1,
        }
    }
}

/// Background grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Logical spacing between adjacent grid lines.
    pub step: f64,
    /// Minimum on-screen spacing in pixels before the step is coarsened.
    pub min_screen_spacing: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            step: 20.0,
            min_screen_spacing: 4.0,
        }
    }
}

/// Element geometry limits and load-time defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementConfig {
    /// Smallest width or height a resize may produce.
    pub min_size: f64,
    pub default_width: f64,
    pub default_height: f64,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            min_size: 5.0,
            default_width: 100.0,
            default_height: 100.0,
        }
    }
}

/// Top-level configuration for a board session.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub viewport: ViewportConfig,
    pub grid: GridConfig,
    pub elements: ElementConfig,
}

impl BoardConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.viewport.validate()?;
        self.grid.validate()?;
        self.elements.validate()
    }

    /// This config if it validates, otherwise the defaults.
    pub fn or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                log::warn!("{}; using default board config", e);
                Self::default()
            }
        }
    }
}

impl ViewportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale && self.max_scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "scale bounds must satisfy 0 < min_scale <= max_scale (got {} and {})",
                self.min_scale, self.max_scale
            )));
        }
        if !(self.scale_step > 1.0 && self.scale_step.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "scale_step must be greater than 1 (got {})",
                self.scale_step
            )));
        }
        Ok(())
    }

    /// This config if it validates, otherwise the defaults.
    pub fn or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                log::warn!("{}; using default viewport limits", e);
                Self::default()
            }
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "grid step must be positive (got {})",
                self.step
            )));
        }
        if !(self.min_screen_spacing >= 0.0 && self.min_screen_spacing.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "min_screen_spacing must be a finite non-negative number (got {})",
                self.min_screen_spacing
            )));
        }
        Ok(())
    }
}

impl ElementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_size >= 0.0 && self.min_size.is_finite()) {
            return Err(ConfigError::Invalid("min_size must be a finite non-negative number".to_string()));
        }
        if !(self.default_width > 0.0 && self.default_height > 0.0)
            || !(self.default_width.is_finite() && self.default_height.is_finite())
        {
            return Err(ConfigError::Invalid(format!(
                "default element size must be positive (got {}x{})",
                self.default_width, self.default_height
            )));
        }
        Ok(())
    }
}
