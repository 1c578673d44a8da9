//! Device location.
//!
//! A [`Geolocator`] produces one fix per call. [`locate_within`] bounds the
//! attempt; hitting the bound is a terminal failure that is reported, not
//! retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use wardwatch_station_models::Coordinate;

/// Errors that can occur while acquiring a location.
#[derive(Debug, thiserror::Error)]
pub enum GeolocationError {
    /// The lookup service could not be reached.
    #[error("Geolocation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// No fix could be produced (permission denied, service refused, ...).
    #[error("Location unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// No fix arrived within the configured bound.
    #[error("Location request timed out after {secs}s")]
    Timeout {
        /// The bound that was exceeded.
        secs: u64,
    },
}

/// Source of the device's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] if no position can be determined.
    async fn current_position(&self) -> Result<Coordinate, GeolocationError>;
}

/// Runs `geolocator` with an upper bound on how long it may take.
///
/// # Errors
///
/// Returns [`GeolocationError::Timeout`] if the bound is exceeded, or the
/// geolocator's own error.
pub async fn locate_within(
    geolocator: &dyn Geolocator,
    timeout: Duration,
) -> Result<Coordinate, GeolocationError> {
    match tokio::time::timeout(timeout, geolocator.current_position()).await {
        Ok(result) => result,
        Err(_) => Err(GeolocationError::Timeout {
            secs: timeout.as_secs(),
        }),
    }
}

/// Always reports the same position. Used when coordinates are given
/// explicitly.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator(pub Coordinate);

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        Ok(self.0)
    }
}

/// Approximate position from the public IP address via `ipapi.co`.
pub struct IpGeolocator {
    client: reqwest::Client,
    url: String,
}

impl Default for IpGeolocator {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: "https://ipapi.co/json/".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct IpApiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

impl IpApiResponse {
    fn into_coordinate(self) -> Result<Coordinate, GeolocationError> {
        if self.error {
            return Err(GeolocationError::Unavailable {
                message: self.reason.unwrap_or_else(|| "lookup refused".to_string()),
            });
        }

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => {
                log::debug!(
                    "IP geolocation resolved to {} ({lat}, {lng})",
                    self.city.as_deref().unwrap_or("unknown city")
                );
                Ok(Coordinate::new(lat, lng))
            }
            _ => Err(GeolocationError::Unavailable {
                message: "response carried no coordinates".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
        let response: IpApiResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.into_coordinate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverAnswers;

    #[async_trait]
    impl Geolocator for NeverAnswers {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn fixed_position_passes_through() {
        let here = Coordinate::new(12.97, 77.59);
        let fix = locate_within(&FixedGeolocator(here), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(fix, here);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out() {
        let err = locate_within(&NeverAnswers, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, GeolocationError::Timeout { secs: 10 }));
    }

    #[test]
    fn parses_ipapi_payloads() {
        let ok: IpApiResponse = serde_json::from_str(
            r#"{ "ip": "1.2.3.4", "city": "Pune", "latitude": 18.52, "longitude": 73.86 }"#,
        )
        .unwrap();
        assert_eq!(ok.into_coordinate().unwrap(), Coordinate::new(18.52, 73.86));

        let refused: IpApiResponse =
            serde_json::from_str(r#"{ "error": true, "reason": "RateLimited" }"#).unwrap();
        let err = refused.into_coordinate().unwrap_err();
        assert!(matches!(err, GeolocationError::Unavailable { ref message } if message == "RateLimited"));
    }
}
