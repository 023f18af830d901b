use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::LngLat;

pub const OFF_PATH_THRESHOLD_METERS: f64 = 50.0;
pub const ARRIVAL_RADIUS_METERS: f64 = 10.0;
pub const ROUTE_BOUNDS_PADDING: f64 = 0.2;
pub const INITIAL_CENTER: LngLat = LngLat {
    lng: 10.840_601_938_197_864,
    lat: 49.971_698_275_409_054,
};
pub const INITIAL_ZOOM: f64 = 5.0;
pub const DEFAULT_ZOOM: f64 = 12.0;
pub const NAVIGATION_ZOOM: f64 = 17.0;
pub const MAX_ZOOM: f64 = 18.0;
pub const NAVIGATION_PITCH: f64 = 30.0;
pub const GEOCODE_LIMIT: u32 = 1;
pub const SUGGESTION_LIMIT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid configuration json: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Options forwarded to the platform position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u32,
    pub maximum_age_ms: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 1_000,
            maximum_age_ms: 0,
        }
    }
}

/// Tunables for a navigation session. Shells may override any subset of
/// these by sending a JSON document; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub off_path_threshold_m: f64,
    pub arrival_radius_m: f64,
    pub bounds_padding: f64,
    pub initial_center: LngLat,
    pub initial_zoom: f64,
    pub default_zoom: f64,
    pub navigation_zoom: f64,
    pub max_zoom: f64,
    pub navigation_pitch: f64,
    pub geocode_limit: u32,
    pub suggestion_limit: u32,
    pub watch: WatchOptions,
    /// Ignore live GPS fixes once a position is known, so a developer can
    /// drag the rider marker around instead.
    pub simulation_mode: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            off_path_threshold_m: OFF_PATH_THRESHOLD_METERS,
            arrival_radius_m: ARRIVAL_RADIUS_METERS,
            bounds_padding: ROUTE_BOUNDS_PADDING,
            initial_center: INITIAL_CENTER,
            initial_zoom: INITIAL_ZOOM,
            default_zoom: DEFAULT_ZOOM,
            navigation_zoom: NAVIGATION_ZOOM,
            max_zoom: MAX_ZOOM,
            navigation_pitch: NAVIGATION_PITCH,
            geocode_limit: GEOCODE_LIMIT,
            suggestion_limit: SUGGESTION_LIMIT,
            watch: WatchOptions::default(),
            simulation_mode: false,
        }
    }
}

impl NavigationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.off_path_threshold_m.is_finite() && self.off_path_threshold_m > 0.0) {
            return Err(ConfigError::Validation(
                "off_path_threshold_m must be > 0".into(),
            ));
        }
        if !(self.arrival_radius_m.is_finite() && self.arrival_radius_m > 0.0) {
            return Err(ConfigError::Validation("arrival_radius_m must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.bounds_padding) {
            return Err(ConfigError::Validation(
                "bounds_padding must be within [0, 1]".into(),
            ));
        }
        if LngLat::new(self.initial_center.lng, self.initial_center.lat).is_err() {
            return Err(ConfigError::Validation(
                "initial_center is not a valid coordinate".into(),
            ));
        }
        for (name, zoom) in [
            ("initial_zoom", self.initial_zoom),
            ("default_zoom", self.default_zoom),
            ("navigation_zoom", self.navigation_zoom),
        ] {
            if !(0.0..=self.max_zoom).contains(&zoom) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within [0, max_zoom]"
                )));
            }
        }
        if !(0.0..=85.0).contains(&self.navigation_pitch) {
            return Err(ConfigError::Validation(
                "navigation_pitch must be within [0, 85]".into(),
            ));
        }
        if self.geocode_limit == 0 || self.suggestion_limit == 0 {
            return Err(ConfigError::Validation(
                "geocoder limits must be > 0".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(0.0, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(NavigationConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            NavigationConfig::from_json(r#"{ "simulation_mode": true, "navigation_zoom": 16 }"#)
                .unwrap();
        assert!(config.simulation_mode);
        assert_eq!(config.navigation_zoom, 16.0);
        assert_eq!(config.off_path_threshold_m, OFF_PATH_THRESHOLD_METERS);
        assert_eq!(config.watch, WatchOptions::default());
    }

    #[test]
    fn center_is_read_longitude_first() {
        let config = NavigationConfig::from_json(r#"{ "initial_center": [13.4, 52.5] }"#).unwrap();
        assert_eq!(config.initial_center, LngLat { lng: 13.4, lat: 52.5 });
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            NavigationConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let result = NavigationConfig::from_json(r#"{ "off_path_threshold_m": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zoom_above_max() {
        let config = NavigationConfig {
            navigation_zoom: 19.0,
            ..NavigationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn clamps_user_zoom() {
        let config = NavigationConfig::default();
        assert_eq!(config.clamp_zoom(25.0), MAX_ZOOM);
        assert_eq!(config.clamp_zoom(-1.0), 0.0);
    }
}
