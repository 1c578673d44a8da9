//! The in-memory station set shown on the map and in the station list.

use std::sync::Arc;

use wardwatch_station_models::{Coordinate, Station};

use crate::merge::{backfill, dedup_batch, insert_search_result, merge_local};

/// An immutable, AQI-descending view of the repository.
///
/// Cheap to clone. A snapshot taken before a mutation keeps showing the
/// old contents, so readers never observe a half-applied update.
pub type Snapshot = Arc<Vec<Station>>;

/// Ordered, deduplicated station collection.
///
/// Starts empty and is replaced wholesale by the first global fetch.
/// Afterwards it only changes through [`Self::merge`], [`Self::insert`]
/// and [`Self::backfill`], none of which drop a held station without a
/// replacement at the same site.
/// Every mutation builds a new [`Snapshot`] and swaps it in.
#[derive(Debug, Default, Clone)]
pub struct StationRepository {
    stations: Snapshot,
}

impl StationRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with a bulk (global) dataset. Co-located
    /// sensors within the batch collapse to one station.
    pub fn replace_all(&mut self, stations: Vec<Station>) {
        let stations = dedup_batch(stations);
        log::info!("Station repository replaced with {} stations", stations.len());
        self.stations = Arc::new(stations);
    }

    /// Adds a bulk dataset underneath the stations already held, which
    /// stay untouched.
    pub fn backfill(&mut self, bulk: Vec<Station>) {
        let held = Arc::unwrap_or_clone(std::mem::take(&mut self.stations));
        let held_len = held.len();
        let merged = backfill(held, bulk);

        log::info!(
            "Backfilled {} bulk stations under {held_len} held",
            merged.len() - held_len
        );
        self.stations = Arc::new(merged);
    }

    /// Merges a local or search batch, dropping superseded stations.
    pub fn merge(&mut self, incoming: Vec<Station>) {
        if incoming.is_empty() {
            return;
        }

        let incoming_len = incoming.len();
        let prior = Arc::unwrap_or_clone(std::mem::take(&mut self.stations));
        let merged = merge_local(prior, incoming);

        log::info!(
            "Merged {incoming_len} incoming stations; repository now holds {}",
            merged.len()
        );
        self.stations = Arc::new(merged);
    }

    /// Inserts a station chosen from search results and returns the
    /// station that should be selected for it.
    ///
    /// The returned station is the pre-existing entry when `found`
    /// duplicates one.
    pub fn insert(&mut self, found: Station) -> Station {
        let current = Arc::unwrap_or_clone(std::mem::take(&mut self.stations));
        let outcome = insert_search_result(current, found);

        if outcome.inserted {
            log::info!("Added search result {} to repository", outcome.resolved.id);
        }

        self.stations = Arc::new(outcome.stations);
        outcome.resolved
    }

    /// Current snapshot, worst AQI first.
    #[must_use]
    pub fn all(&self) -> Snapshot {
        Arc::clone(&self.stations)
    }

    /// Borrowed view of the current contents.
    #[must_use]
    pub fn as_slice(&self) -> &[Station] {
        &self.stations
    }

    /// The `n` worst stations.
    #[must_use]
    pub fn top_n(&self, n: usize) -> &[Station] {
        &self.stations[..n.min(self.stations.len())]
    }

    /// Looks a station up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Coordinates of every held station, in snapshot order.
    pub fn locations(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.stations.iter().map(|s| s.location)
    }

    /// Number of stations held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether the repository holds no stations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Mean AQI rounded to the nearest integer; `0` when empty.
    #[must_use]
    pub fn average_aqi(&self) -> u32 {
        if self.stations.is_empty() {
            return 0;
        }

        let total: u64 = self.stations.iter().map(|s| u64::from(s.aqi)).sum();
        let count = self.stations.len() as u64;
        let rounded = (total + count / 2) / count;
        u32::try_from(rounded).unwrap_or(u32::MAX)
    }
}
