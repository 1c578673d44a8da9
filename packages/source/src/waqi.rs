//! World Air Quality Index (WAQI) feed client.
//!
//! Three endpoints are used:
//!
//! | Endpoint | Used for |
//! |----------|----------|
//! | `/v2/map/bounds?latlng=` | global (country box) and local (box around a point) listings |
//! | `/search/?keyword=` | free-text station search |
//! | `/feed/@{uid}/` | per-station detail: pollutant sub-indices, dominant pollutant, daily forecast |
//!
//! Listings only carry name, position and AQI, so local and search results
//! are enriched with `/feed` detail for the closest few stations. Station
//! ids are `@{uid}`. Listing entries whose AQI is not numeric (WAQI reports
//! `"-"` for offline sensors) are skipped.
//!
//! See <https://aqicn.org/json-api/doc/>

use async_trait::async_trait;
use futures::future::join_all;
use wardwatch_geo::{Bounds, distance_km};
use wardwatch_station_models::{Coordinate, Pollutants, Station, TREND_LEN};

use crate::{SourceError, StationSource, retry};

const DEFAULT_BASE_URL: &str = "https://api.waqi.info";

/// Placeholder used when the feed does not say where pollution comes from.
const UNKNOWN_SOURCE: &str = "Unknown";

/// Connection and scoping settings for [`WaqiSource`].
#[derive(Debug, Clone)]
pub struct WaqiConfig {
    /// API root (e.g., `"https://api.waqi.info"`).
    pub base_url: String,
    /// API token from <https://aqicn.org/data-platform/token/>.
    pub token: String,
    /// Box covering the global (country) dataset.
    pub country_bounds: Bounds,
    /// Half-width in degrees of the box fetched around a coordinate.
    pub local_half_span_deg: f64,
    /// How many stations per local/search result get `/feed` detail.
    pub detail_limit: usize,
}

impl WaqiConfig {
    /// Creates a configuration with India as the country box.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token,
            country_bounds: Bounds {
                south_west: Coordinate::new(6.5, 68.0),
                north_east: Coordinate::new(35.7, 97.5),
            },
            local_half_span_deg: 0.25,
            detail_limit: 8,
        }
    }

    /// Reads `WAQI_TOKEN` (required) and `WAQI_BASE_URL` (optional).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if `WAQI_TOKEN` is not set.
    pub fn from_env() -> Result<Self, SourceError> {
        let token = std::env::var("WAQI_TOKEN").map_err(|_| SourceError::Config {
            message: "WAQI_TOKEN environment variable not set".to_string(),
        })?;

        let mut config = Self::new(token);
        if let Ok(base_url) = std::env::var("WAQI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

/// [`StationSource`] backed by the WAQI JSON API.
pub struct WaqiSource {
    config: WaqiConfig,
    client: reqwest::Client,
}

impl WaqiSource {
    /// Creates a client for the given configuration.
    #[must_use]
    pub fn new(config: WaqiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn list_bounds(&self, bounds: Bounds) -> Result<Vec<Listed>, SourceError> {
        let url = format!("{}/v2/map/bounds", self.config.base_url);
        let latlng = format!(
            "{},{},{},{}",
            bounds.south_west.lat, bounds.south_west.lng, bounds.north_east.lat, bounds.north_east.lng
        );

        let body = retry::send_json(|| {
            self.client.get(&url).query(&[
                ("latlng", latlng.as_str()),
                ("networks", "all"),
                ("token", self.config.token.as_str()),
            ])
        })
        .await?;

        parse_bounds_response(&body)
    }

    async fn feed(&self, uid: i64) -> Result<serde_json::Value, SourceError> {
        let url = format!("{}/feed/@{uid}/", self.config.base_url);
        let body =
            retry::send_json(|| self.client.get(&url).query(&[("token", &self.config.token)]))
                .await?;
        ok_data(body)
    }

    /// Fetches `/feed` detail for the first `detail_limit` stations and
    /// folds it in. A failed detail request keeps the listing as-is.
    async fn enrich(&self, listed: Vec<Listed>) -> Vec<Station> {
        let limit = self.config.detail_limit.min(listed.len());
        let details = join_all(listed[..limit].iter().map(|l| self.feed(l.uid))).await;

        let mut stations: Vec<Station> = Vec::with_capacity(listed.len());
        let mut details = details.into_iter();

        for entry in listed {
            let mut station = entry.station;
            match details.next() {
                Some(Ok(detail)) => apply_feed_detail(&mut station, &detail),
                Some(Err(e)) => {
                    log::debug!("No detail for {}: {e}", station.id);
                }
                None => {}
            }
            stations.push(station);
        }

        stations
    }
}

#[async_trait]
impl StationSource for WaqiSource {
    fn name(&self) -> &str {
        "waqi"
    }

    async fn fetch_stations(&self, near: Option<Coordinate>) -> Result<Vec<Station>, SourceError> {
        let Some(center) = near else {
            let listed = self.list_bounds(self.config.country_bounds).await?;
            log::info!("WAQI global listing returned {} stations", listed.len());
            return Ok(listed.into_iter().map(|l| l.station).collect());
        };

        let mut listed = self
            .list_bounds(Bounds::around(center, self.config.local_half_span_deg))
            .await?;
        listed.sort_by(|a, b| {
            distance_km(center, a.station.location).total_cmp(&distance_km(center, b.station.location))
        });
        log::info!(
            "WAQI local listing around ({}, {}) returned {} stations",
            center.lat,
            center.lng,
            listed.len()
        );

        Ok(self.enrich(listed).await)
    }

    async fn search_stations(&self, query: &str) -> Result<Vec<Station>, SourceError> {
        let url = format!("{}/search/", self.config.base_url);
        let body = retry::send_json(|| {
            self.client
                .get(&url)
                .query(&[("keyword", query), ("token", self.config.token.as_str())])
        })
        .await?;

        let listed = parse_search_response(&body)?;
        log::debug!("WAQI search '{query}' returned {} stations", listed.len());
        Ok(self.enrich(listed).await)
    }
}

/// A listing entry: the station plus the WAQI uid needed for `/feed`.
#[derive(Debug, Clone)]
struct Listed {
    uid: i64,
    station: Station,
}

/// Unwraps `{"status": "ok", "data": ...}`.
fn ok_data(mut body: serde_json::Value) -> Result<serde_json::Value, SourceError> {
    if body["status"].as_str() == Some("ok") {
        return Ok(body["data"].take());
    }

    let message = body["data"]
        .as_str()
        .or_else(|| body["message"].as_str())
        .unwrap_or("unknown error")
        .to_string();
    Err(SourceError::Upstream { message })
}

/// Parses an AQI that WAQI may send as a number or a numeric string.
fn parse_aqi(value: &serde_json::Value) -> Option<u32> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .and_then(|v| u32::try_from(v).ok())
}

fn base_station(uid: i64, name: &str, aqi: u32, location: Coordinate) -> Station {
    Station {
        id: format!("@{uid}"),
        name: name.to_string(),
        population: 0,
        aqi,
        pollutants: Pollutants::default(),
        primary_source: UNKNOWN_SOURCE.to_string(),
        secondary_source: UNKNOWN_SOURCE.to_string(),
        location,
        trend: vec![aqi; TREND_LEN],
    }
}

/// Parses the `/v2/map/bounds` response.
fn parse_bounds_response(body: &serde_json::Value) -> Result<Vec<Listed>, SourceError> {
    let data = ok_data(body.clone())?;
    let entries = data.as_array().ok_or_else(|| SourceError::Upstream {
        message: "map/bounds data is not an array".to_string(),
    })?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let uid = entry["uid"].as_i64()?;
            let aqi = parse_aqi(&entry["aqi"])?;
            let lat = entry["lat"].as_f64()?;
            let lng = entry["lon"].as_f64()?;
            let name = entry["station"]["name"].as_str().unwrap_or("Unnamed station");
            Some(Listed {
                uid,
                station: base_station(uid, name, aqi, Coordinate::new(lat, lng)),
            })
        })
        .collect())
}

/// Parses the `/search/` response.
fn parse_search_response(body: &serde_json::Value) -> Result<Vec<Listed>, SourceError> {
    let data = ok_data(body.clone())?;
    let entries = data.as_array().ok_or_else(|| SourceError::Upstream {
        message: "search data is not an array".to_string(),
    })?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let uid = entry["uid"].as_i64()?;
            let aqi = parse_aqi(&entry["aqi"])?;
            let geo = entry["station"]["geo"].as_array()?;
            let lat = geo.first()?.as_f64()?;
            let lng = geo.get(1)?.as_f64()?;
            let name = entry["station"]["name"].as_str().unwrap_or("Unnamed station");
            Some(Listed {
                uid,
                station: base_station(uid, name, aqi, Coordinate::new(lat, lng)),
            })
        })
        .collect())
}

/// Likely emission sources for a dominant pollutant code.
fn sources_for_pollutant(code: &str) -> Option<(&'static str, &'static str)> {
    Some(match code {
        "pm25" => ("Vehicular & Combustion Emissions", "Biomass Burning"),
        "pm10" => ("Road Dust & Construction", "Vehicular Traffic"),
        "no2" => ("Vehicular Traffic", "Power Generation"),
        "so2" => ("Industrial Emissions", "Coal Combustion"),
        "co" => ("Incomplete Combustion", "Vehicular Traffic"),
        "o3" => ("Photochemical Smog", "Vehicular Traffic"),
        _ => return None,
    })
}

/// Folds `/feed` detail into a listed station.
fn apply_feed_detail(station: &mut Station, detail: &serde_json::Value) {
    if let Some(aqi) = parse_aqi(&detail["aqi"]) {
        station.aqi = aqi;
    }

    let iaqi = &detail["iaqi"];
    let reading = |key: &str| iaqi[key]["v"].as_f64().unwrap_or(0.0);
    station.pollutants = Pollutants {
        pm25: reading("pm25"),
        pm10: reading("pm10"),
        no2: reading("no2"),
        so2: reading("so2"),
        co: reading("co"),
        o3: reading("o3"),
    };

    if let Some((primary, secondary)) = detail["dominentpol"]
        .as_str()
        .and_then(sources_for_pollutant)
    {
        primary.clone_into(&mut station.primary_source);
        secondary.clone_into(&mut station.secondary_source);
    }

    let daily: Vec<u32> = detail["forecast"]["daily"]["pm25"]
        .as_array()
        .map(|days| days.iter().filter_map(|d| parse_aqi(&d["avg"])).collect())
        .unwrap_or_default();

    station.trend = trend_from_daily(&daily, station.aqi);
}

/// Builds a [`TREND_LEN`]-point trend from daily averages, ending with the
/// current reading. Short histories are padded at the front with their
/// oldest value.
fn trend_from_daily(daily: &[u32], current: u32) -> Vec<u32> {
    let keep = TREND_LEN - 1;
    let tail = &daily[daily.len().saturating_sub(keep)..];

    let pad_value = tail.first().copied().unwrap_or(current);
    let mut trend = vec![pad_value; keep - tail.len()];
    trend.extend_from_slice(tail);
    trend.push(current);
    trend
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bounds_listing_and_skips_offline_sensors() {
        let body = serde_json::json!({
            "status": "ok",
            "data": [
                { "lat": 28.6469, "lon": 77.3164, "uid": 2553, "aqi": "312",
                  "station": { "name": "Anand Vihar, Delhi" } },
                { "lat": 28.5, "lon": 77.1, "uid": 11, "aqi": "-",
                  "station": { "name": "Offline" } },
                { "lat": 28.7, "lon": 77.2, "uid": 12, "aqi": 87,
                  "station": { "name": "Numeric AQI" } }
            ]
        });
        let listed = parse_bounds_response(&body).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].uid, 2553);
        assert_eq!(listed[0].station.id, "@2553");
        assert_eq!(listed[0].station.aqi, 312);
        assert_eq!(listed[0].station.trend, vec![312; TREND_LEN]);
        assert_eq!(listed[1].station.aqi, 87);
    }

    #[test]
    fn parses_search_results() {
        let body = serde_json::json!({
            "status": "ok",
            "data": [{
                "uid": 8179,
                "aqi": "154",
                "station": { "name": "Bandra, Mumbai", "geo": [19.0631, 72.8447] }
            }]
        });
        let listed = parse_search_response(&body).unwrap();
        assert_eq!(listed.len(), 1);
        let station = &listed[0].station;
        assert_eq!(station.name, "Bandra, Mumbai");
        assert!((station.location.lat - 19.0631).abs() < 1e-9);
        assert!((station.location.lng - 72.8447).abs() < 1e-9);
    }

    #[test]
    fn error_status_becomes_upstream_error() {
        let body = serde_json::json!({ "status": "error", "data": "Invalid key" });
        let err = parse_bounds_response(&body).unwrap_err();
        assert!(matches!(err, SourceError::Upstream { ref message } if message == "Invalid key"));
    }

    #[test]
    fn feed_detail_fills_pollutants_sources_and_trend() {
        let mut station = base_station(2553, "Anand Vihar", 300, Coordinate::new(28.6, 77.3));
        let detail = serde_json::json!({
            "aqi": 318,
            "dominentpol": "pm25",
            "iaqi": { "pm25": { "v": 318 }, "pm10": { "v": 210 }, "no2": { "v": 41.5 } },
            "forecast": { "daily": { "pm25": [
                { "avg": 280 }, { "avg": 290 }, { "avg": 305 }
            ] } }
        });

        apply_feed_detail(&mut station, &detail);

        assert_eq!(station.aqi, 318);
        assert!((station.pollutants.pm25 - 318.0).abs() < f64::EPSILON);
        assert!((station.pollutants.no2 - 41.5).abs() < f64::EPSILON);
        assert!(station.pollutants.so2.abs() < f64::EPSILON);
        assert_eq!(station.primary_source, "Vehicular & Combustion Emissions");
        assert_eq!(station.trend, vec![280, 280, 280, 280, 290, 305, 318]);
    }

    #[test]
    fn trend_keeps_most_recent_days() {
        let daily = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(trend_from_daily(&daily, 10), vec![4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(trend_from_daily(&[], 42), vec![42; TREND_LEN]);
    }

    #[test]
    fn unknown_dominant_pollutant_keeps_placeholder() {
        let mut station = base_station(1, "X", 50, Coordinate::new(0.0, 0.0));
        apply_feed_detail(&mut station, &serde_json::json!({ "dominentpol": "nh3" }));
        assert_eq!(station.primary_source, UNKNOWN_SOURCE);
        assert_eq!(station.aqi, 50);
    }
}
