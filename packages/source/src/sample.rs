//! Bundled sample dataset: five wards of a fictional metro city.
//!
//! Used for offline runs (`wardwatch --sample`) and as a deterministic
//! [`StationSource`] in tests.

use async_trait::async_trait;
use wardwatch_geo::distance_km;
use wardwatch_station_models::{Coordinate, Pollutants, Station};

use crate::{SourceError, StationSource};

/// Local fetches return wards within this distance of the coordinate.
const LOCAL_RADIUS_KM: f64 = 50.0;

#[allow(clippy::too_many_arguments)]
fn ward(
    id: &str,
    name: &str,
    population: u64,
    aqi: u32,
    pollutants: Pollutants,
    sources: (&str, &str),
    location: (f64, f64),
    trend: [u32; 7],
) -> Station {
    Station {
        id: id.to_string(),
        name: name.to_string(),
        population,
        aqi,
        pollutants,
        primary_source: sources.0.to_string(),
        secondary_source: sources.1.to_string(),
        location: Coordinate::new(location.0, location.1),
        trend: trend.to_vec(),
    }
}

const fn readings(pm25: f64, pm10: f64, no2: f64, so2: f64, co: f64, o3: f64) -> Pollutants {
    Pollutants {
        pm25,
        pm10,
        no2,
        so2,
        co,
        o3,
    }
}

/// The sample wards, in declaration order.
#[must_use]
pub fn metro_wards() -> Vec<Station> {
    vec![
        ward(
            "w-101",
            "Industrial Zone A",
            12_500,
            312,
            readings(180.0, 250.0, 80.0, 45.0, 2.5, 50.0),
            ("Industrial Emissions", "Heavy Transport"),
            (28.75, 77.10),
            [280, 290, 305, 310, 300, 315, 312],
        ),
        ward(
            "w-102",
            "Downtown Central",
            45_000,
            155,
            readings(65.0, 110.0, 60.0, 15.0, 3.0, 35.0),
            ("Vehicular Traffic", "Construction"),
            (28.65, 77.25),
            [140, 145, 150, 160, 155, 152, 155],
        ),
        ward(
            "w-103",
            "Greenwood Suburbs",
            28_000,
            45,
            readings(12.0, 30.0, 10.0, 5.0, 0.5, 20.0),
            ("Seasonal Pollen", "Residential Heating"),
            (28.55, 77.15),
            [40, 42, 45, 48, 44, 43, 45],
        ),
        ward(
            "w-104",
            "Tech Park District",
            32_000,
            110,
            readings(45.0, 80.0, 40.0, 10.0, 1.2, 30.0),
            ("Vehicular Traffic", "Diesel Generators"),
            (28.58, 77.28),
            [100, 105, 110, 108, 112, 115, 110],
        ),
        ward(
            "w-105",
            "Construction Hub",
            8_000,
            240,
            readings(120.0, 300.0, 30.0, 10.0, 1.0, 25.0),
            ("Construction Activity", "Waste Burning"),
            (28.62, 77.20),
            [210, 220, 230, 225, 235, 238, 240],
        ),
    ]
}

/// [`StationSource`] serving a fixed station list.
#[derive(Debug, Clone)]
pub struct SampleSource {
    stations: Vec<Station>,
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new(metro_wards())
    }
}

impl SampleSource {
    /// Serves `stations` instead of the bundled wards.
    #[must_use]
    pub const fn new(stations: Vec<Station>) -> Self {
        Self { stations }
    }
}

#[async_trait]
impl StationSource for SampleSource {
    fn name(&self) -> &str {
        "sample"
    }

    async fn fetch_stations(&self, near: Option<Coordinate>) -> Result<Vec<Station>, SourceError> {
        Ok(match near {
            None => self.stations.clone(),
            Some(center) => self
                .stations
                .iter()
                .filter(|s| distance_km(center, s.location) <= LOCAL_RADIUS_KM)
                .cloned()
                .collect(),
        })
    }

    async fn search_stations(&self, query: &str) -> Result<Vec<Station>, SourceError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .stations
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
