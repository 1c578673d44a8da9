#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Air-quality station feeds.
//!
//! Each feed implements [`StationSource`]: a bulk fetch (whole country, or
//! scoped to a coordinate) and a free-text station search. The dashboard
//! treats every implementation as a black box producing
//! [`Station`]s; identity resolution between feeds happens later, in
//! `wardwatch_fusion`.

pub mod retry;
pub mod sample;
pub mod waqi;

use async_trait::async_trait;
use wardwatch_station_models::{Coordinate, Station};

/// Errors that can occur while fetching station data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The upstream API answered with an error payload or status.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Description of what went wrong.
        message: String,
    },

    /// The source is missing required configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// A provider of station readings.
#[async_trait]
pub trait StationSource: Send + Sync {
    /// Short identifier used in log messages (e.g., `"waqi"`).
    fn name(&self) -> &str;

    /// Fetches stations. With `near == None` this is the global (country
    /// wide) dataset; otherwise a subset around that coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the upstream request fails.
    async fn fetch_stations(&self, near: Option<Coordinate>) -> Result<Vec<Station>, SourceError>;

    /// Finds stations matching a city or station name.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the upstream request fails.
    async fn search_stations(&self, query: &str) -> Result<Vec<Station>, SourceError>;
}
