#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Air-quality dashboard controller.
//!
//! [`Dashboard`] owns the station repository and the camera focus state
//! and is the only place either is mutated. [`Session`] drives it against
//! the feed, geolocation and analysis collaborators, applying each
//! asynchronous completion as one indivisible transition guarded by a
//! generation [`Ticket`] so stale answers are dropped.

pub mod config;
pub mod controller;
pub mod generation;
pub mod geolocation;
pub mod session;

pub use config::{ConfigError, DashboardConfig, MapView};
pub use controller::{AnalysisRequest, AnalysisState, Dashboard, Update};
pub use generation::{Generation, Ticket};
pub use geolocation::{FixedGeolocator, GeolocationError, Geolocator, IpGeolocator};
pub use session::{Event, Session};

use thiserror::Error;

/// Errors surfaced to the dashboard's host.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A station feed could not be set up.
    #[error(transparent)]
    Source(#[from] wardwatch_source::SourceError),

    /// The analysis collaborator could not be set up.
    #[error(transparent)]
    Analysis(#[from] wardwatch_ai::AiError),

    /// The device location could not be determined.
    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
}
