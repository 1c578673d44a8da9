#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Station fusion and the ordered station repository.
//!
//! Station data reaches the dashboard through three channels: a bulk
//! global feed, a location-scoped local feed, and single-station search
//! lookups. Different endpoints can report the same physical sensor under
//! different ids, so [`merge`] resolves identity by id *or* proximity
//! before anything lands in the [`repository::StationRepository`].

pub mod merge;
pub mod repository;

pub use merge::{SearchInsertion, backfill, dedup_batch, insert_search_result, merge_local};
pub use repository::{Snapshot, StationRepository};

#[cfg(test)]
pub(crate) fn test_station(id: &str, aqi: u32, lat: f64, lng: f64) -> wardwatch_station_models::Station {
    wardwatch_station_models::Station {
        id: id.to_string(),
        name: format!("Station {id}"),
        population: 0,
        aqi,
        pollutants: wardwatch_station_models::Pollutants::default(),
        primary_source: String::new(),
        secondary_source: String::new(),
        location: wardwatch_station_models::Coordinate::new(lat, lng),
        trend: vec![aqi; wardwatch_station_models::TREND_LEN],
    }
}
