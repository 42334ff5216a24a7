//! Editor configuration parsed from environment variables.

use std::path::PathBuf;

use crate::consts::WATERMARK_TEXT;
use crate::export::{ExportOptions, Quality, Theme};
use crate::grid::MapConfig;

pub const DEFAULT_ICON_DIR: &str = "assets/icons";
pub const DEFAULT_STORE_DIR: &str = ".stronghold";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An enumerated setting has a value outside its allowed set.
    #[error("unsupported {var} '{value}' (expected {expected})")]
    Unsupported { var: &'static str, value: String, expected: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub map: MapConfig,
    pub export_quality: Quality,
    pub export_theme: Theme,
    /// Directory or URL prefix holding the building icons.
    pub icon_dir: String,
    /// Directory backing the persisted key-value store.
    pub store_dir: PathBuf,
    pub watermark: String,
    pub log_level: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            export_quality: Quality::default(),
            export_theme: Theme::default(),
            icon_dir: DEFAULT_ICON_DIR.to_owned(),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            watermark: WATERMARK_TEXT.to_owned(),
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
        }
    }
}

impl EditorConfig {
    /// Build typed editor config from environment variables.
    ///
    /// Optional:
    /// - `STRONGHOLD_HEX_RADIUS`: default 40
    /// - `STRONGHOLD_EXPORT_QUALITY`: `1`, `2` (default) or `4`
    /// - `STRONGHOLD_EXPORT_THEME`: `light` (default) or `dark`
    /// - `STRONGHOLD_ICON_DIR`: default `assets/icons`
    /// - `STRONGHOLD_STORE_DIR`: default `.stronghold`
    /// - `STRONGHOLD_WATERMARK`: default `noswork`; empty disables it
    /// - `STRONGHOLD_LOG`: default `info`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown quality or theme.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EditorConfig::from_env`] over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unknown quality or theme.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let radius = parse_radius(lookup("STRONGHOLD_HEX_RADIUS").as_deref()).unwrap_or(defaults.map.radius);
        let export_quality = parse_quality(lookup("STRONGHOLD_EXPORT_QUALITY").as_deref())?;
        let export_theme = parse_theme(lookup("STRONGHOLD_EXPORT_THEME").as_deref())?;
        let icon_dir = lookup("STRONGHOLD_ICON_DIR")
            .map(|dir| dir.trim_end_matches('/').to_owned())
            .filter(|dir| !dir.is_empty())
            .unwrap_or(defaults.icon_dir);
        let store_dir = lookup("STRONGHOLD_STORE_DIR").map_or(defaults.store_dir, PathBuf::from);
        let watermark = lookup("STRONGHOLD_WATERMARK").unwrap_or(defaults.watermark);
        let log_level = lookup("STRONGHOLD_LOG").unwrap_or(defaults.log_level);

        Ok(Self {
            map: MapConfig { radius, ..defaults.map },
            export_quality,
            export_theme,
            icon_dir,
            store_dir,
            watermark,
            log_level,
        })
    }

    /// Export options carried by this config.
    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions { quality: self.export_quality, theme: self.export_theme, watermark: self.watermark.clone() }
    }
}

fn parse_radius(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|r| r.is_finite() && *r > 0.0)
}

fn parse_quality(raw: Option<&str>) -> Result<Quality, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Quality::default());
    };
    Quality::parse(raw).ok_or_else(|| ConfigError::Unsupported {
        var: "STRONGHOLD_EXPORT_QUALITY",
        value: raw.to_owned(),
        expected: "1, 2 or 4",
    })
}

fn parse_theme(raw: Option<&str>) -> Result<Theme, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Theme::default());
    };
    Theme::parse(raw).ok_or_else(|| ConfigError::Unsupported {
        var: "STRONGHOLD_EXPORT_THEME",
        value: raw.to_owned(),
        expected: "'light' or 'dark'",
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
