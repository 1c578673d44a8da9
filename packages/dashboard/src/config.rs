//! Dashboard settings, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration:
//!
//! ```toml
//! top_n = 5
//! user_zoom = 13
//! station_zoom = 12
//! fit_padding_px = 50
//! geolocation_timeout_secs = 10
//! min_search_query_len = 3
//!
//! [default_view]
//! center = { lat = 20.5937, lng = 78.9629 }
//! zoom = 5
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wardwatch_focus::CameraSettings;
use wardwatch_station_models::Coordinate;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`DashboardConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the map starts before any data arrives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: Coordinate,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: Coordinate::new(20.5937, 78.9629),
            zoom: 5,
        }
    }
}

/// Tunables for the dashboard controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Length of the "top critical zones" list.
    pub top_n: usize,
    /// Zoom when flying to the user's location.
    pub user_zoom: u8,
    /// Zoom when flying to a station.
    pub station_zoom: u8,
    /// Padding for the one-time fit of all stations.
    pub fit_padding_px: u32,
    /// Geolocation gives up after this many seconds.
    pub geolocation_timeout_secs: u64,
    /// Shorter queries are not sent to the search collaborator.
    pub min_search_query_len: usize,
    pub default_view: MapView,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let camera = CameraSettings::default();
        Self {
            top_n: 5,
            user_zoom: camera.user_zoom,
            station_zoom: camera.station_zoom,
            fit_padding_px: camera.fit_padding_px,
            geolocation_timeout_secs: 10,
            min_search_query_len: 3,
            default_view: MapView::default(),
        }
    }
}

impl DashboardConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("Loaded dashboard config from {}", path.display());
        Ok(config)
    }

    /// Camera settings for the focus arbiter.
    #[must_use]
    pub const fn camera(&self) -> CameraSettings {
        CameraSettings {
            user_zoom: self.user_zoom,
            station_zoom: self.station_zoom,
            fit_padding_px: self.fit_padding_px,
        }
    }

    /// Upper bound on a geolocation attempt.
    #[must_use]
    pub const fn geolocation_timeout(&self) -> Duration {
        Duration::from_secs(self.geolocation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.geolocation_timeout(), Duration::from_secs(10));
        assert_eq!(config.camera(), CameraSettings::default());
    }

    #[test]
    fn partial_document_overrides_some_fields() {
        let config = DashboardConfig::from_toml_str(
            r"
            top_n = 10
            station_zoom = 14

            [default_view]
            center = { lat = 28.6, lng = 77.2 }
            zoom = 9
            ",
        )
        .unwrap();

        assert_eq!(config.top_n, 10);
        assert_eq!(config.camera().station_zoom, 14);
        assert_eq!(config.camera().user_zoom, 13);
        assert_eq!(config.default_view.zoom, 9);
        assert_eq!(config.min_search_query_len, 3);
    }

    #[test]
    fn wrong_type_is_a_parse_error() {
        let err = DashboardConfig::from_toml_str("top_n = \"five\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DashboardConfig::load(Path::new("/nonexistent/wardwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
