#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Monitoring station ("ward") types shared across the wardwatch system.
//!
//! These types are serialized with camelCase field names so the JSON shape
//! matches what the dashboard front end and the upstream feeds exchange.
//! The fusion and focus logic only ever look at [`Station::id`],
//! [`Station::location`] and [`Station::aqi`]; everything else is
//! descriptive payload carried through untouched.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of daily readings carried in [`Station::trend`].
pub const TREND_LEN: usize = 7;

/// A WGS84 coordinate.
///
/// Ranges are not validated; out-of-range input is a caller error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude in degrees.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Pollutant concentrations reported by a station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    /// Fine particulate matter (PM2.5).
    pub pm25: f64,
    /// Coarse particulate matter (PM10).
    pub pm10: f64,
    /// Nitrogen dioxide.
    pub no2: f64,
    /// Sulphur dioxide.
    pub so2: f64,
    /// Carbon monoxide.
    pub co: f64,
    /// Ozone.
    pub o3: f64,
}

/// An air-quality monitoring station.
///
/// `id` is unique within a repository but is not trusted on its own for
/// cross-feed identity: two feeds may publish the same sensor under
/// different ids, which is why [`Station::location`] acts as a secondary
/// identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// Opaque feed-assigned identifier.
    pub id: String,
    /// Human-readable station or area name.
    pub name: String,
    /// Population served by the ward, when known.
    #[serde(default)]
    pub population: u64,
    /// Air Quality Index. Drives sort order and colour mapping.
    pub aqi: u32,
    /// Latest pollutant readings.
    #[serde(default)]
    pub pollutants: Pollutants,
    /// Dominant pollution source.
    #[serde(default)]
    pub primary_source: String,
    /// Secondary pollution source.
    #[serde(default)]
    pub secondary_source: String,
    /// Station position.
    pub location: Coordinate,
    /// Last [`TREND_LEN`] daily AQI readings, oldest first.
    #[serde(default)]
    pub trend: Vec<u32>,
}

impl Station {
    /// Severity band for this station's current AQI.
    #[must_use]
    pub const fn severity(&self) -> AqiSeverity {
        AqiSeverity::from_aqi(self.aqi)
    }
}

/// AQI severity bands.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum AqiSeverity {
    /// 0-50
    Good,
    /// 51-100
    Moderate,
    /// 101-150
    #[strum(serialize = "Unhealthy for Sensitive Groups")]
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    UnhealthySensitive,
    /// 151-200
    Unhealthy,
    /// 201-300
    #[strum(serialize = "Very Unhealthy")]
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    /// Above 300
    Hazardous,
}

impl AqiSeverity {
    /// Maps an AQI value onto its severity band.
    #[must_use]
    pub const fn from_aqi(aqi: u32) -> Self {
        match aqi {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthySensitive,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    /// Hex colour used for map markers and charts.
    #[must_use]
    pub const fn color_hex(self) -> &'static str {
        match self {
            Self::Good => "#10b981",
            Self::Moderate => "#eab308",
            Self::UnhealthySensitive => "#f97316",
            Self::Unhealthy => "#ef4444",
            Self::VeryUnhealthy => "#a855f7",
            Self::Hazardous => "#881337",
        }
    }

    /// Returns all variants of this enum, least severe first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Good,
            Self::Moderate,
            Self::UnhealthySensitive,
            Self::Unhealthy,
            Self::VeryUnhealthy,
            Self::Hazardous,
        ]
    }
}

/// Perspective the dashboard is viewed from. Changes the tone of the
/// generated analysis.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum UserRole {
    /// Resident checking conditions near them.
    #[default]
    #[strum(to_string = "Citizen")]
    #[serde(rename = "Citizen")]
    Citizen,
    /// Authority responsible for mitigation.
    #[strum(
        to_string = "Government Official",
        serialize = "official",
        serialize = "authority"
    )]
    #[serde(rename = "Government Official")]
    Official,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_band_edges() {
        assert_eq!(AqiSeverity::from_aqi(0), AqiSeverity::Good);
        assert_eq!(AqiSeverity::from_aqi(50), AqiSeverity::Good);
        assert_eq!(AqiSeverity::from_aqi(51), AqiSeverity::Moderate);
        assert_eq!(AqiSeverity::from_aqi(150), AqiSeverity::UnhealthySensitive);
        assert_eq!(AqiSeverity::from_aqi(200), AqiSeverity::Unhealthy);
        assert_eq!(AqiSeverity::from_aqi(300), AqiSeverity::VeryUnhealthy);
        assert_eq!(AqiSeverity::from_aqi(301), AqiSeverity::Hazardous);
    }

    #[test]
    fn severity_bands_are_ordered() {
        let bands = AqiSeverity::all();
        for pair in bands.windows(2) {
            assert!(pair[0] < pair[1], "{:?} should sort before {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn severity_labels() {
        assert_eq!(
            AqiSeverity::UnhealthySensitive.to_string(),
            "Unhealthy for Sensitive Groups"
        );
        assert_eq!(AqiSeverity::Hazardous.color_hex(), "#881337");
    }

    #[test]
    fn role_parses_short_names() {
        assert_eq!("official".parse::<UserRole>().unwrap(), UserRole::Official);
        assert_eq!("Citizen".parse::<UserRole>().unwrap(), UserRole::Citizen);
        assert_eq!(UserRole::Official.to_string(), "Government Official");
        assert!("mayor".parse::<UserRole>().is_err());
    }

    #[test]
    fn station_uses_camel_case_json() {
        let json = serde_json::json!({
            "id": "w-101",
            "name": "Industrial Zone A",
            "aqi": 312,
            "primarySource": "Industrial Emissions",
            "location": { "lat": 28.75, "lng": 77.10 }
        });
        let station: Station = serde_json::from_value(json).unwrap();
        assert_eq!(station.primary_source, "Industrial Emissions");
        assert_eq!(station.severity(), AqiSeverity::Hazardous);
        assert!(station.trend.is_empty());
        assert_eq!(station.population, 0);
    }
}
