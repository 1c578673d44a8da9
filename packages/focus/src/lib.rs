#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Camera focus arbitration.
//!
//! Four things can move the map camera: the device reporting a location,
//! a search selection (or re-selection), a marker/list click, and the
//! first data load. [`next_focus`] compares the previous and next
//! [`FocusState`] and picks exactly one [`FocusAction`] using a fixed
//! priority order:
//!
//! | Priority | Trigger | Action |
//! |----------|---------|--------|
//! | 1 | user location changed | fly to the user, [`CameraSettings::user_zoom`] |
//! | 2 | focus pulse changed and the selection resolves | fly to the station, [`CameraSettings::station_zoom`] |
//! | 3 | selected id changed and resolves | fly to the station, [`CameraSettings::station_zoom`] |
//! | 4 | first data load, not yet initialized | fit all stations |
//! | 5 | anything else | none |
//!
//! A selection that no longer resolves to a held station (for example
//! because a merge dropped it) never errors; its rule is skipped and the
//! next one is tried.

use serde::{Deserialize, Serialize};
use wardwatch_geo::{Bounds, bounds_of};
use wardwatch_station_models::{Coordinate, Station};

/// Inputs that decide where the camera points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusState {
    /// Id of the selected station, if any.
    pub selected_id: Option<String>,
    /// Last known device location.
    pub user_location: Option<Coordinate>,
    /// Bumped to force a re-focus even when nothing else changed.
    pub focus_pulse: u64,
}

impl FocusState {
    /// Selects a station without forcing a re-focus.
    pub fn select(&mut self, id: impl Into<String>) {
        self.selected_id = Some(id.into());
    }

    /// Forces the next evaluation to re-focus on the selection.
    pub const fn pulse(&mut self) {
        self.focus_pulse = self.focus_pulse.wrapping_add(1);
    }

    /// Records a geolocation fix.
    pub const fn locate(&mut self, location: Coordinate) {
        self.user_location = Some(location);
    }
}

/// What the map camera should do next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusAction {
    /// Leave the camera where it is.
    None,
    /// Animate to a point.
    FlyTo {
        /// Where to centre.
        target: Coordinate,
        /// Map zoom level.
        zoom: u8,
    },
    /// Frame every station.
    FitAll {
        /// Box enclosing every station.
        bounds: Bounds,
        /// Screen padding around the box, in pixels.
        #[serde(rename = "paddingPx")]
        padding_px: u32,
    },
}

impl FocusAction {
    /// Whether the camera needs to move.
    #[must_use]
    pub const fn moves_camera(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Zoom levels and padding used for camera moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Zoom when flying to the user's location.
    pub user_zoom: u8,
    /// Zoom when flying to a station.
    pub station_zoom: u8,
    /// Padding applied when fitting all stations.
    pub fit_padding_px: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            user_zoom: 13,
            station_zoom: 12,
            fit_padding_px: 50,
        }
    }
}

/// Decides the camera action for a transition from `prev` to `next`.
///
/// `stations` is the current repository snapshot and `initialized`
/// records whether the one-time fit has already happened. Pure: the
/// caller owns the `initialized` flag (see [`FocusArbiter`]).
#[must_use]
pub fn next_focus(
    prev: &FocusState,
    next: &FocusState,
    stations: &[Station],
    initialized: bool,
    camera: &CameraSettings,
) -> FocusAction {
    if let Some(location) = next.user_location
        && prev.user_location != Some(location)
    {
        return FocusAction::FlyTo {
            target: location,
            zoom: camera.user_zoom,
        };
    }

    let selected = next
        .selected_id
        .as_deref()
        .and_then(|id| stations.iter().find(|s| s.id == id));

    if next.focus_pulse != prev.focus_pulse
        && let Some(station) = selected
    {
        return FocusAction::FlyTo {
            target: station.location,
            zoom: camera.station_zoom,
        };
    }

    // The automatic worst-station pick on first load is not a user
    // selection; it only counts once something was selected before or the
    // initial fit has happened.
    let selection_established = prev.selected_id.is_some() || initialized;
    if next.selected_id != prev.selected_id
        && selection_established
        && let Some(station) = selected
    {
        return FocusAction::FlyTo {
            target: station.location,
            zoom: camera.station_zoom,
        };
    }

    if !initialized
        && prev.selected_id.is_none()
        && let Some(bounds) = bounds_of(stations.iter().map(|s| s.location))
    {
        return FocusAction::FitAll {
            bounds,
            padding_px: camera.fit_padding_px,
        };
    }

    FocusAction::None
}

/// Stateful wrapper around [`next_focus`] that remembers the previous
/// state and the one-time fit.
#[derive(Debug, Clone, Default)]
pub struct FocusArbiter {
    previous: FocusState,
    initialized: bool,
    camera: CameraSettings,
}

impl FocusArbiter {
    /// Creates an arbiter that has seen no state yet.
    #[must_use]
    pub fn new(camera: CameraSettings) -> Self {
        Self {
            previous: FocusState::default(),
            initialized: false,
            camera,
        }
    }

    /// Evaluates `next` against the last observed state and records it.
    pub fn observe(&mut self, next: &FocusState, stations: &[Station]) -> FocusAction {
        let action = next_focus(
            &self.previous,
            next,
            stations,
            self.initialized,
            &self.camera,
        );

        if matches!(action, FocusAction::FitAll { .. }) {
            self.initialized = true;
        }

        if action.moves_camera() {
            log::debug!("Camera focus: {action:?}");
        }

        self.previous.clone_from(next);
        action
    }

    /// Whether the one-time fit has already happened.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The last state passed to [`Self::observe`].
    #[must_use]
    pub const fn previous(&self) -> &FocusState {
        &self.previous
    }
}
