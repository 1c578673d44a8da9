//! Async driver around [`Dashboard`].
//!
//! Collaborator calls (fetch, search, geolocation, analysis) run on tokio
//! tasks. Each task sends exactly one completion back over an `mpsc`
//! channel, and [`Session::next_event`] applies completions one at a time,
//! so the dashboard itself is only ever touched from the session's owner.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use wardwatch_ai::{AiError, AnalysisResult, Analyzer};
use wardwatch_focus::FocusAction;
use wardwatch_source::{SourceError, StationSource};
use wardwatch_station_models::{Coordinate, Station, UserRole};

use crate::config::DashboardConfig;
use crate::controller::{AnalysisRequest, Dashboard, Update};
use crate::generation::Ticket;
use crate::geolocation::{GeolocationError, Geolocator, locate_within};

/// What happened when a completion was applied.
#[derive(Debug)]
pub enum Event {
    /// The global dataset was applied (or its failure absorbed).
    Loaded { camera: FocusAction },
    /// A geolocation fix and its local stations were applied.
    Located {
        location: Coordinate,
        camera: FocusAction,
    },
    /// The latest geolocation attempt failed. Nothing changed.
    LocateFailed(GeolocationError),
    /// Search candidates are available via [`Dashboard::search_results`].
    SearchResults { count: usize },
    /// The analysis panel state changed.
    Analysis,
    /// A superseded result was dropped.
    Discarded,
}

enum Completion {
    Global(Result<Vec<Station>, SourceError>),
    Located {
        ticket: Ticket,
        location: Coordinate,
        local: Result<Vec<Station>, SourceError>,
    },
    LocateFailed {
        ticket: Ticket,
        error: GeolocationError,
    },
    Search {
        ticket: Ticket,
        found: Result<Vec<Station>, SourceError>,
    },
    Analysis {
        ticket: Ticket,
        result: Result<AnalysisResult, AiError>,
    },
}

/// Runs a [`Dashboard`] against real collaborators.
pub struct Session {
    dashboard: Dashboard,
    source: Arc<dyn StationSource>,
    geolocator: Arc<dyn Geolocator>,
    analyzer: Option<Arc<dyn Analyzer>>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl Session {
    /// Creates a session without an analyzer; analyses are reported as
    /// unavailable until one is attached with [`Self::with_analyzer`].
    #[must_use]
    pub fn new(
        config: DashboardConfig,
        source: Arc<dyn StationSource>,
        geolocator: Arc<dyn Geolocator>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            dashboard: Dashboard::new(config),
            source,
            geolocator,
            analyzer: None,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Attaches the analysis collaborator.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Read-only view of the dashboard state.
    #[must_use]
    pub const fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Starts the global fetch.
    pub fn load(&mut self) {
        let source = Arc::clone(&self.source);
        log::debug!("Fetching global stations from {}", source.name());
        self.spawn(async move { Completion::Global(source.fetch_stations(None).await) });
    }

    /// Starts a geolocation attempt followed by a local fetch around the
    /// fix.
    pub fn locate(&mut self) {
        let ticket = self.dashboard.begin_locate();
        let timeout = self.dashboard.config().geolocation_timeout();
        let source = Arc::clone(&self.source);
        let geolocator = Arc::clone(&self.geolocator);

        self.spawn(async move {
            match locate_within(geolocator.as_ref(), timeout).await {
                Ok(location) => Completion::Located {
                    ticket,
                    location,
                    local: source.fetch_stations(Some(location)).await,
                },
                Err(error) => Completion::LocateFailed { ticket, error },
            }
        });
    }

    /// Starts a search. Returns `false` if the query was too short to send.
    pub fn search(&mut self, query: &str) -> bool {
        let Some(ticket) = self.dashboard.begin_search(query) else {
            return false;
        };

        let source = Arc::clone(&self.source);
        let query = query.trim().to_string();
        self.spawn(async move {
            Completion::Search {
                ticket,
                found: source.search_stations(&query).await,
            }
        });
        true
    }

    /// A station was clicked.
    pub fn select(&mut self, id: &str) -> FocusAction {
        let update = self.dashboard.select(id);
        self.dispatch(update)
    }

    /// Picks the `index`-th search candidate. Returns `None` if there is no
    /// such candidate.
    pub fn choose_search_result(&mut self, index: usize) -> Option<FocusAction> {
        let found = self.dashboard.search_results().get(index)?.clone();
        let update = self.dashboard.choose_search_result(found);
        Some(self.dispatch(update))
    }

    /// Switches the viewer role.
    pub fn set_role(&mut self, role: UserRole) -> FocusAction {
        let update = self.dashboard.set_role(role);
        self.dispatch(update)
    }

    /// Whether any collaborator call is still running.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    /// Waits for the next completion and applies it. Returns `None` when
    /// nothing is in flight.
    pub async fn next_event(&mut self) -> Option<Event> {
        if self.in_flight == 0 {
            return None;
        }

        let completion = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(self.apply(completion))
    }

    /// Applies completions until nothing is in flight.
    pub async fn run_until_idle(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn apply(&mut self, completion: Completion) -> Event {
        match completion {
            Completion::Global(fetched) => {
                let update = self.dashboard.apply_global(fetched);
                Event::Loaded {
                    camera: self.dispatch(update),
                }
            }
            Completion::Located {
                ticket,
                location,
                local,
            } => match self.dashboard.apply_located(ticket, location, local) {
                Some(update) => Event::Located {
                    location,
                    camera: self.dispatch(update),
                },
                None => Event::Discarded,
            },
            Completion::LocateFailed { ticket, error } => {
                if self.dashboard.location_failed(ticket, &error) {
                    Event::LocateFailed(error)
                } else {
                    Event::Discarded
                }
            }
            Completion::Search { ticket, found } => self
                .dashboard
                .apply_search(ticket, found)
                .map_or(Event::Discarded, |results| Event::SearchResults {
                    count: results.len(),
                }),
            Completion::Analysis { ticket, result } => {
                if self.dashboard.apply_analysis(ticket, result) {
                    Event::Analysis
                } else {
                    Event::Discarded
                }
            }
        }
    }

    fn dispatch(&mut self, update: Update) -> FocusAction {
        if let Some(request) = update.analysis {
            self.request_analysis(request);
        }
        update.camera
    }

    fn request_analysis(&mut self, request: AnalysisRequest) {
        let Some(analyzer) = self.analyzer.clone() else {
            self.dashboard.apply_analysis(
                request.ticket,
                Err(AiError::Config {
                    message: "no analysis provider configured".to_string(),
                }),
            );
            return;
        };

        self.spawn(async move {
            let result = analyzer.analyze(&request.station, request.role).await;
            Completion::Analysis {
                ticket: request.ticket,
                result,
            }
        });
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            // The receiver lives as long as the session.
            let _ = tx.send(task.await);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use wardwatch_ai::{Recommendation, RecommendationKind};
    use wardwatch_source::sample::SampleSource;

    use super::*;
    use crate::controller::AnalysisState;
    use crate::geolocation::FixedGeolocator;

    /// Answers after a per-station delay with one recommendation titled
    /// after the station.
    struct SlowAnalyzer {
        slow_station: &'static str,
    }

    #[async_trait]
    impl Analyzer for SlowAnalyzer {
        async fn analyze(&self, station: &Station, role: UserRole) -> Result<AnalysisResult, AiError> {
            if station.id == self.slow_station {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(AnalysisResult {
                recommendations: vec![Recommendation {
                    id: format!("{}-{role}", station.id),
                    title: station.id.clone(),
                    description: String::new(),
                    kind: RecommendationKind::Advisory,
                }],
                ..AnalysisResult::default()
            })
        }
    }

    struct NeverAnswers;

    #[async_trait]
    impl Geolocator for NeverAnswers {
        async fn current_position(&self) -> Result<Coordinate, GeolocationError> {
            std::future::pending().await
        }
    }

    fn session(geolocator: Arc<dyn Geolocator>) -> Session {
        Session::new(
            DashboardConfig::default(),
            Arc::new(SampleSource::default()),
            geolocator,
        )
    }

    fn analyzed_station(session: &Session) -> Option<&str> {
        match session.dashboard().analysis() {
            AnalysisState::Ready { station_id, .. } => Some(station_id),
            _ => None,
        }
    }

    #[tokio::test]
    async fn load_fits_all_then_analyses_worst_station() {
        let mut session = session(Arc::new(FixedGeolocator(Coordinate::new(0.0, 0.0))))
            .with_analyzer(Arc::new(SlowAnalyzer { slow_station: "" }));
        session.load();

        let events = session.run_until_idle().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Event::Loaded {
                camera: FocusAction::FitAll { .. }
            }
        ));
        assert!(matches!(events[1], Event::Analysis));
        assert_eq!(analyzed_station(&session), Some("w-101"));
        assert!(session.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_analysis_cannot_overwrite_newer_one() {
        let mut session = session(Arc::new(FixedGeolocator(Coordinate::new(0.0, 0.0))))
            .with_analyzer(Arc::new(SlowAnalyzer {
                slow_station: "w-101",
            }));
        session.load();
        assert!(matches!(
            session.next_event().await,
            Some(Event::Loaded { .. })
        ));

        // w-101's analysis is still running when the user clicks w-103.
        session.select("w-103");

        let events = session.run_until_idle().await;
        assert!(matches!(events[..], [Event::Analysis, Event::Discarded]));
        assert_eq!(analyzed_station(&session), Some("w-103"));
    }

    #[tokio::test]
    async fn locate_flies_to_user_and_selects_nearest() {
        let user = Coordinate::new(28.56, 77.16);
        let mut session = session(Arc::new(FixedGeolocator(user)));
        session.load();
        session.run_until_idle().await;

        session.locate();
        let events = session.run_until_idle().await;

        assert!(matches!(
            events[..],
            [Event::Located {
                camera: FocusAction::FlyTo { zoom: 13, .. },
                ..
            }]
        ));
        let dashboard = session.dashboard();
        assert_eq!(dashboard.focus().selected_id.as_deref(), Some("w-103"));
        assert_eq!(dashboard.focus().user_location, Some(user));
        assert_eq!(dashboard.stations().len(), 5);
        assert!(matches!(
            dashboard.analysis(),
            AnalysisState::Unavailable { station_id, .. } if station_id == "w-103"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn geolocation_timeout_is_reported_and_changes_nothing() {
        let mut session = session(Arc::new(NeverAnswers));
        session.load();
        session.run_until_idle().await;
        let before = session.dashboard().focus().clone();

        session.locate();
        let events = session.run_until_idle().await;

        assert!(matches!(
            events[..],
            [Event::LocateFailed(GeolocationError::Timeout { secs: 10 })]
        ));
        assert_eq!(session.dashboard().focus(), &before);
    }

    #[tokio::test]
    async fn search_then_choose_resolves_existing_station() {
        let mut session = session(Arc::new(FixedGeolocator(Coordinate::new(0.0, 0.0))));
        session.load();
        session.run_until_idle().await;

        assert!(!session.search("do"));
        assert!(session.search("downtown"));
        let events = session.run_until_idle().await;
        assert!(matches!(events[..], [Event::SearchResults { count: 1 }]));

        let camera = session.choose_search_result(0).unwrap();
        assert_eq!(
            camera,
            FocusAction::FlyTo {
                target: Coordinate::new(28.65, 77.25),
                zoom: 12
            }
        );
        assert_eq!(session.dashboard().focus().selected_id.as_deref(), Some("w-102"));
        assert!(session.choose_search_result(0).is_none());
    }

    #[tokio::test]
    async fn role_change_reanalyses_current_station() {
        let mut session = session(Arc::new(FixedGeolocator(Coordinate::new(0.0, 0.0))))
            .with_analyzer(Arc::new(SlowAnalyzer { slow_station: "" }));
        session.load();
        session.run_until_idle().await;

        assert_eq!(session.set_role(UserRole::Official), FocusAction::None);
        session.run_until_idle().await;

        let AnalysisState::Ready { result, .. } = session.dashboard().analysis() else {
            panic!("expected a ready analysis");
        };
        assert_eq!(result.recommendations[0].id, "w-101-Government Official");
    }
}
