//! The single owner of dashboard state.
//!
//! [`Dashboard`] holds the station repository, the focus state and its
//! arbiter, the viewer role and the analysis panel state. Every event is
//! one `&mut self` call that runs to completion and returns an [`Update`]:
//! the camera action to perform and, when the analysed station or role
//! changed, an [`AnalysisRequest`] to run.
//!
//! Asynchronous work is split into a `begin_*` call that hands out a
//! [`Ticket`] and an `apply_*` call that takes the ticket back. Results
//! whose ticket has been superseded are dropped without touching state.

use wardwatch_ai::{AiError, AnalysisResult};
use wardwatch_focus::{FocusAction, FocusArbiter, FocusState};
use wardwatch_fusion::{Snapshot, StationRepository};
use wardwatch_geo::nearest;
use wardwatch_source::SourceError;
use wardwatch_station_models::{Coordinate, Station, UserRole};

use crate::config::{DashboardConfig, MapView};
use crate::generation::{Generation, Ticket};
use crate::geolocation::GeolocationError;

/// What the analysis panel currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisState {
    /// Nothing requested yet.
    Idle,
    /// A request for `station_id` is in flight.
    Loading { station_id: String },
    /// The latest analysis.
    Ready {
        station_id: String,
        result: AnalysisResult,
    },
    /// The analysis service failed; descriptive data still renders.
    Unavailable { station_id: String, reason: String },
}

/// An analysis the caller should run and hand back through
/// [`Dashboard::apply_analysis`].
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub ticket: Ticket,
    pub station: Station,
    pub role: UserRole,
}

/// Outcome of one event.
#[derive(Debug, Clone)]
pub struct Update {
    /// Where the map camera should go.
    pub camera: FocusAction,
    /// Analysis to start, if the analysed station or role changed.
    pub analysis: Option<AnalysisRequest>,
}

/// Dashboard controller.
#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    repository: StationRepository,
    focus: FocusState,
    arbiter: FocusArbiter,
    role: UserRole,
    analysis: AnalysisState,
    analyzed: Option<(String, UserRole)>,
    search_results: Vec<Station>,
    location_gen: Generation,
    search_gen: Generation,
    analysis_gen: Generation,
}

impl Dashboard {
    /// Creates a dashboard with an empty repository.
    #[must_use]
    pub fn new(config: DashboardConfig) -> Self {
        let arbiter = FocusArbiter::new(config.camera());
        Self {
            config,
            repository: StationRepository::new(),
            focus: FocusState::default(),
            arbiter,
            role: UserRole::default(),
            analysis: AnalysisState::Idle,
            analyzed: None,
            search_results: Vec::new(),
            location_gen: Generation::default(),
            search_gen: Generation::default(),
            analysis_gen: Generation::default(),
        }
    }

    /// Applies the global dataset and selects the worst station if nothing
    /// is selected yet. A failed fetch keeps whatever was known before.
    ///
    /// Only an empty repository is replaced wholesale. Once local or search
    /// stations are held, the global batch is backfilled underneath them so
    /// the current selection keeps resolving.
    pub fn apply_global(&mut self, fetched: Result<Vec<Station>, SourceError>) -> Update {
        match fetched {
            Ok(stations) => {
                if self.repository.is_empty() {
                    self.repository.replace_all(stations);
                } else {
                    self.repository.backfill(stations);
                }
                if self.focus.selected_id.is_none() {
                    let worst = self.repository.as_slice().first().map(|s| s.id.clone());
                    self.focus.selected_id = worst;
                }
            }
            Err(e) => {
                log::warn!(
                    "Global station fetch failed, keeping {} known stations: {e}",
                    self.repository.len()
                );
            }
        }

        self.transition()
    }

    /// A marker or list row was clicked.
    pub fn select(&mut self, id: &str) -> Update {
        self.focus.select(id);
        self.transition()
    }

    /// Starts a geolocation attempt, superseding any earlier one.
    pub const fn begin_locate(&mut self) -> Ticket {
        self.location_gen.next()
    }

    /// Applies a geolocation fix together with the stations fetched around
    /// it.
    ///
    /// The local batch is merged, the nearest local station becomes the
    /// selection and the focus is pulsed. With an empty batch the previous
    /// selection stays. Returns `None` if a newer attempt has started.
    pub fn apply_located(
        &mut self,
        ticket: Ticket,
        location: Coordinate,
        local: Result<Vec<Station>, SourceError>,
    ) -> Option<Update> {
        if !self.location_gen.is_current(ticket) {
            log::debug!("Discarding stale location result ({}, {})", location.lat, location.lng);
            return None;
        }

        let local = local.unwrap_or_else(|e| {
            log::warn!("Local station fetch failed: {e}");
            Vec::new()
        });

        let nearest_id = nearest(location, &local, |s| s.location).map(|s| s.id.clone());
        self.repository.merge(local);
        self.focus.locate(location);

        if let Some(id) = nearest_id {
            self.focus.select(id);
            self.focus.pulse();
        }

        Some(self.transition())
    }

    /// Records a failed geolocation attempt. State is left untouched.
    ///
    /// Returns whether the failure belongs to the latest attempt and should
    /// be shown to the user.
    #[must_use]
    pub fn location_failed(&self, ticket: Ticket, error: &GeolocationError) -> bool {
        if self.location_gen.is_current(ticket) {
            log::warn!("Geolocation failed: {error}");
            true
        } else {
            log::debug!("Discarding stale geolocation failure: {error}");
            false
        }
    }

    /// Starts a search. Returns `None` (and clears the candidates) when the
    /// query is too short to send.
    pub fn begin_search(&mut self, query: &str) -> Option<Ticket> {
        let ticket = self.search_gen.next();
        if query.trim().chars().count() < self.config.min_search_query_len {
            self.search_results.clear();
            return None;
        }
        Some(ticket)
    }

    /// Stores search candidates. Returns `None` if a newer search started.
    pub fn apply_search(
        &mut self,
        ticket: Ticket,
        found: Result<Vec<Station>, SourceError>,
    ) -> Option<&[Station]> {
        if !self.search_gen.is_current(ticket) {
            log::debug!("Discarding stale search results");
            return None;
        }

        self.search_results = found.unwrap_or_else(|e| {
            log::warn!("Station search failed: {e}");
            Vec::new()
        });
        Some(&self.search_results)
    }

    /// A search candidate was picked. Inserts it unless it duplicates a
    /// known station, then selects and re-focuses on the resolved station.
    pub fn choose_search_result(&mut self, found: Station) -> Update {
        let resolved = self.repository.insert(found);
        self.search_results.clear();
        self.focus.select(resolved.id);
        self.focus.pulse();
        self.transition()
    }

    /// Switches the viewer role.
    pub fn set_role(&mut self, role: UserRole) -> Update {
        self.role = role;
        self.transition()
    }

    /// Applies an analysis result. Returns whether it was current.
    pub fn apply_analysis(&mut self, ticket: Ticket, result: Result<AnalysisResult, AiError>) -> bool {
        if !self.analysis_gen.is_current(ticket) {
            log::debug!("Discarding stale analysis result");
            return false;
        }

        let station_id = match std::mem::replace(&mut self.analysis, AnalysisState::Idle) {
            AnalysisState::Loading { station_id } => station_id,
            other => {
                self.analysis = other;
                return false;
            }
        };

        self.analysis = match result {
            Ok(result) => AnalysisState::Ready { station_id, result },
            Err(e) => {
                log::warn!("Analysis for {station_id} unavailable: {e}");
                AnalysisState::Unavailable {
                    station_id,
                    reason: e.to_string(),
                }
            }
        };
        true
    }

    fn transition(&mut self) -> Update {
        let camera = self.arbiter.observe(&self.focus, self.repository.as_slice());
        let analysis = self.refresh_analysis();
        Update { camera, analysis }
    }

    fn refresh_analysis(&mut self) -> Option<AnalysisRequest> {
        let station = self.active_station()?.clone();
        let key = (station.id.clone(), self.role);
        if self.analyzed.as_ref() == Some(&key) {
            return None;
        }

        self.analyzed = Some(key);
        self.analysis = AnalysisState::Loading {
            station_id: station.id.clone(),
        };
        Some(AnalysisRequest {
            ticket: self.analysis_gen.next(),
            station,
            role: self.role,
        })
    }

    /// The selected station, or the worst one if the selection does not
    /// resolve.
    #[must_use]
    pub fn active_station(&self) -> Option<&Station> {
        self.focus
            .selected_id
            .as_deref()
            .and_then(|id| self.repository.get(id))
            .or_else(|| self.repository.as_slice().first())
    }

    /// Heading for the summary panel.
    #[must_use]
    pub const fn overview_label(&self) -> &'static str {
        if self.focus.user_location.is_some() {
            "Local Overview"
        } else {
            "Country Overview"
        }
    }

    /// Current station snapshot, worst first.
    #[must_use]
    pub fn stations(&self) -> Snapshot {
        self.repository.all()
    }

    /// The configured number of worst stations.
    #[must_use]
    pub fn top_critical(&self) -> &[Station] {
        self.repository.top_n(self.config.top_n)
    }

    /// Mean AQI over every known station.
    #[must_use]
    pub fn average_aqi(&self) -> u32 {
        self.repository.average_aqi()
    }

    /// Where the camera sits before any station is known.
    #[must_use]
    pub const fn default_view(&self) -> MapView {
        self.config.default_view
    }

    #[must_use]
    pub const fn focus(&self) -> &FocusState {
        &self.focus
    }

    #[must_use]
    pub const fn role(&self) -> UserRole {
        self.role
    }

    #[must_use]
    pub const fn analysis(&self) -> &AnalysisState {
        &self.analysis
    }

    /// Candidates from the latest search.
    #[must_use]
    pub fn search_results(&self) -> &[Station] {
        &self.search_results
    }

    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }
}
