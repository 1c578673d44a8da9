//! Identity resolution between station batches.
//!
//! ## Identity rules
//!
//! | Check | Same station when |
//! |-------|-------------------|
//! | id | ids are equal |
//! | proximity | [`is_same_site`] (closer than 0.5 km) |
//!
//! Either check alone is enough. Both [`merge_local`] and
//! [`insert_search_result`] use the same rules, so a sensor published
//! under different ids by the bulk, local and search endpoints only ever
//! produces one pin.

use wardwatch_geo::is_same_site;
use wardwatch_station_models::Station;

/// Whether `a` and `b` describe the same physical station.
#[must_use]
pub fn same_station(a: &Station, b: &Station) -> bool {
    a.id == b.id || is_same_site(a.location, b.location)
}

/// Finds the station in `stations` that `candidate` duplicates, if any.
#[must_use]
pub fn find_existing<'a>(stations: &'a [Station], candidate: &Station) -> Option<&'a Station> {
    stations.iter().find(|s| same_station(s, candidate))
}

/// Sorts by AQI, worst first. Stable, so equal AQIs keep their input order.
pub fn sort_by_aqi_desc(stations: &mut [Station]) {
    stations.sort_by(|a, b| b.aqi.cmp(&a.aqi));
}

/// Merges a freshly fetched local or search batch into the prior set.
///
/// Every incoming station is kept. A prior station survives only if no
/// incoming station shares its id or sits within the same-station radius.
/// The result is `incoming ++ retained`, stably sorted by AQI descending.
///
/// An empty `incoming` batch returns `prior` unchanged apart from the
/// (no-op for already sorted input) re-sort.
#[must_use]
pub fn merge_local(prior: Vec<Station>, incoming: Vec<Station>) -> Vec<Station> {
    let prior_len = prior.len();
    let mut merged = incoming;
    let incoming_len = merged.len();

    let retained: Vec<Station> = prior
        .into_iter()
        .filter(|old| !merged.iter().any(|new| same_station(old, new)))
        .collect();

    let dropped = prior_len - retained.len();
    if dropped > 0 {
        log::debug!("Dropped {dropped} prior stations superseded by {incoming_len} incoming");
    }

    merged.extend(retained);
    sort_by_aqi_desc(&mut merged);
    merged
}

/// Outcome of [`insert_search_result`].
#[derive(Debug, Clone)]
pub struct SearchInsertion {
    /// The repository contents after the insertion.
    pub stations: Vec<Station>,
    /// The station the caller should select: the already-known entry when
    /// one matched, otherwise the inserted station.
    pub resolved: Station,
    /// Whether `resolved` was newly added.
    pub inserted: bool,
}

/// Adds a station picked from search results, unless it duplicates one
/// already held.
///
/// When a match exists (by id or proximity) the existing entry is returned
/// as `resolved` and `stations` is left untouched, so anything keyed on the
/// existing id stays stable. Otherwise `found` is prepended and the set is
/// stably re-sorted by AQI, which keeps it ahead of equal-AQI stations.
#[must_use]
pub fn insert_search_result(stations: Vec<Station>, found: Station) -> SearchInsertion {
    if let Some(existing) = find_existing(&stations, &found) {
        log::debug!(
            "Search result {} resolved to existing station {}",
            found.id,
            existing.id
        );
        let resolved = existing.clone();
        return SearchInsertion {
            stations,
            resolved,
            inserted: false,
        };
    }

    let mut updated = Vec::with_capacity(stations.len() + 1);
    updated.push(found.clone());
    updated.extend(stations);
    sort_by_aqi_desc(&mut updated);

    SearchInsertion {
        stations: updated,
        resolved: found,
        inserted: true,
    }
}

/// Collapses stations within one bulk batch that describe the same site.
///
/// The batch is sorted worst first and the first station of each group is
/// kept, so a co-located pair reports the higher reading.
#[must_use]
pub fn dedup_batch(mut stations: Vec<Station>) -> Vec<Station> {
    sort_by_aqi_desc(&mut stations);
    let batch_len = stations.len();

    let mut kept: Vec<Station> = Vec::with_capacity(batch_len);
    for candidate in stations {
        if find_existing(&kept, &candidate).is_none() {
            kept.push(candidate);
        }
    }

    let dropped = batch_len - kept.len();
    if dropped > 0 {
        log::debug!("Collapsed {dropped} co-located stations in a batch of {batch_len}");
    }
    kept
}

/// Folds a bulk batch in underneath stations that are already held.
///
/// Held stations always win: a bulk station is only added when it shares
/// neither id nor site with one of them. This is [`merge_local`] with the
/// roles swapped, so the result is sorted and duplicate-free.
#[must_use]
pub fn backfill(held: Vec<Station>, bulk: Vec<Station>) -> Vec<Station> {
    merge_local(dedup_batch(bulk), held)
}

#[cfg(test)]
mod tests {
    use wardwatch_geo::distance_km;
    use wardwatch_station_models::Coordinate;

    use super::*;
    use crate::test_station as station;

    fn ids(stations: &[Station]) -> Vec<&str> {
        stations.iter().map(|s| s.id.as_str()).collect()
    }

    fn assert_no_duplicates(stations: &[Station]) {
        for (i, a) in stations.iter().enumerate() {
            for b in &stations[i + 1..] {
                assert!(
                    distance_km(a.location, b.location) >= 0.5,
                    "{} and {} are within the same-station radius",
                    a.id,
                    b.id
                );
                assert_ne!(a.id, b.id);
            }
        }
    }

    fn assert_sorted(stations: &[Station]) {
        for pair in stations.windows(2) {
            assert!(pair[0].aqi >= pair[1].aqi, "{:?}", ids(stations));
        }
    }

    #[test]
    fn nearby_incoming_replaces_prior_with_different_id() {
        let prior = vec![station("w1", 50, 10.0, 10.0)];
        let merged = merge_local(prior, vec![station("w2", 80, 10.001, 10.001)]);
        assert_eq!(ids(&merged), ["w2"]);
    }

    #[test]
    fn distant_incoming_is_added_alongside_prior() {
        let prior = vec![station("w1", 50, 10.0, 10.0)];
        let merged = merge_local(prior, vec![station("w3", 30, 50.0, 50.0)]);
        assert_eq!(ids(&merged), ["w1", "w3"]);
    }

    #[test]
    fn same_id_is_replaced_even_when_moved() {
        let prior = vec![station("w1", 50, 10.0, 10.0), station("w9", 20, 40.0, 40.0)];
        let merged = merge_local(prior, vec![station("w1", 120, 30.0, 30.0)]);
        assert_eq!(ids(&merged), ["w1", "w9"]);
        assert_eq!(merged[0].aqi, 120);
    }

    #[test]
    fn empty_incoming_is_identity() {
        let prior = vec![
            station("a", 300, 1.0, 1.0),
            station("b", 200, 2.0, 2.0),
            station("c", 200, 3.0, 3.0),
        ];
        let merged = merge_local(prior.clone(), Vec::new());
        assert_eq!(merged, prior);
    }

    #[test]
    fn ties_keep_incoming_before_retained() {
        let prior = vec![station("old", 100, 1.0, 1.0)];
        let merged = merge_local(prior, vec![station("new", 100, 5.0, 5.0)]);
        assert_eq!(ids(&merged), ["new", "old"]);
    }

    #[test]
    fn incoming_is_kept_unconditionally() {
        let prior = vec![station("p", 10, 0.0, 0.0)];
        let incoming = vec![station("x", 40, 20.0, 20.0), station("y", 60, 21.0, 21.0)];
        let merged = merge_local(prior, incoming);
        assert_eq!(ids(&merged), ["y", "x", "p"]);
    }

    #[test]
    fn search_hit_near_existing_resolves_to_existing() {
        let stations = vec![station("w1", 50, 10.0, 10.0), station("w2", 40, 20.0, 20.0)];
        let found = station("@9999", 55, 10.0005, 10.0005);
        let outcome = insert_search_result(stations, found);
        assert!(!outcome.inserted);
        assert_eq!(outcome.resolved.id, "w1");
        assert_eq!(outcome.stations.len(), 2);
    }

    #[test]
    fn search_hit_with_known_id_resolves_to_existing() {
        let stations = vec![station("w1", 50, 10.0, 10.0)];
        let outcome = insert_search_result(stations, station("w1", 99, 60.0, 60.0));
        assert!(!outcome.inserted);
        assert_eq!(outcome.resolved.aqi, 50);
    }

    #[test]
    fn new_search_hit_is_inserted_in_order() {
        let stations = vec![station("a", 300, 1.0, 1.0), station("b", 100, 2.0, 2.0)];
        let outcome = insert_search_result(stations, station("s", 100, 30.0, 30.0));
        assert!(outcome.inserted);
        assert_eq!(outcome.resolved.id, "s");
        assert_eq!(ids(&outcome.stations), ["a", "s", "b"]);
    }

    #[test]
    fn mixed_sequence_never_duplicates() {
        let mut stations = merge_local(
            Vec::new(),
            vec![
                station("g1", 310, 28.75, 77.10),
                station("g2", 155, 28.65, 77.25),
                station("g3", 45, 28.55, 77.15),
            ],
        );
        assert_sorted(&stations);

        stations = merge_local(
            stations,
            vec![
                station("l1", 160, 28.6501, 77.2501),
                station("l2", 90, 28.70, 77.00),
            ],
        );
        assert_no_duplicates(&stations);
        assert_sorted(&stations);

        let outcome = insert_search_result(stations, station("s1", 48, 28.5502, 77.1501));
        assert!(!outcome.inserted);
        stations = outcome.stations;

        let outcome = insert_search_result(stations, station("s2", 500, 19.07, 72.87));
        assert!(outcome.inserted);
        stations = outcome.stations;

        stations = merge_local(stations, vec![station("l3", 20, 19.0701, 72.8701)]);
        assert_no_duplicates(&stations);
        assert_sorted(&stations);
        assert_eq!(ids(&stations), ["g1", "l1", "l2", "g3", "l3"]);
        assert!(stations.iter().all(|s| s.location != Coordinate::new(19.07, 72.87)));
    }

    #[test]
    fn bulk_batch_keeps_worst_of_co_located_sensors() {
        let batch = dedup_batch(vec![
            station("@1", 120, 28.60, 77.20),
            station("@2", 180, 28.6001, 77.2001),
            station("@3", 60, 19.07, 72.87),
            station("@3", 70, 12.97, 77.59),
        ]);

        assert_eq!(ids(&batch), ["@2", "@3"]);
        assert_eq!(batch[1].aqi, 70);
        assert_no_duplicates(&batch);
    }

    #[test]
    fn backfill_never_displaces_held_stations() {
        let held = vec![
            station("@9001", 330, 28.7501, 77.1001),
            station("s1", 40, 19.07, 72.87),
        ];
        let bulk = vec![
            station("g1", 310, 28.75, 77.10),
            station("g2", 155, 28.65, 77.25),
            station("s1", 99, 19.07, 72.87),
        ];

        let merged = backfill(held, bulk);

        assert_eq!(ids(&merged), ["@9001", "g2", "s1"]);
        assert_eq!(merged[2].aqi, 40);
        assert_no_duplicates(&merged);
        assert_sorted(&merged);
    }
}
