#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geodesic helpers for station identity and camera framing.
//!
//! [`distance_km`] is the haversine great-circle distance on a sphere of
//! radius [`EARTH_RADIUS_KM`]. Two stations closer than
//! [`SAME_STATION_RADIUS_KM`] are treated as the same physical sensor by
//! every deduplication path in the system, so that threshold lives here
//! as the single shared constant.

use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use wardwatch_station_models::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Two coordinates strictly closer than this are the same physical station.
pub const SAME_STATION_RADIUS_KM: f64 = 0.5;

/// Great-circle distance between two coordinates in kilometres.
///
/// Total and symmetric; `distance_km(a, a) == 0.0`.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Whether two coordinates identify the same physical station.
#[must_use]
pub fn is_same_site(a: Coordinate, b: Coordinate) -> bool {
    distance_km(a, b) < SAME_STATION_RADIUS_KM
}

/// Returns the item closest to `origin`.
///
/// Ties keep the first item encountered. Returns `None` for an empty
/// slice.
#[must_use]
pub fn nearest<T>(origin: Coordinate, items: &[T], coord_of: impl Fn(&T) -> Coordinate) -> Option<&T> {
    let mut best: Option<(&T, f64)> = None;

    for item in items {
        let dist = distance_km(origin, coord_of(item));
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((item, dist)),
        }
    }

    best.map(|(item, _)| item)
}

/// An axis-aligned lat/lng rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Minimum latitude and longitude.
    pub south_west: Coordinate,
    /// Maximum latitude and longitude.
    pub north_east: Coordinate,
}

impl Bounds {
    /// A square box extending `half_span_deg` degrees from `center` in
    /// every direction.
    #[must_use]
    pub fn around(center: Coordinate, half_span_deg: f64) -> Self {
        Self {
            south_west: Coordinate::new(center.lat - half_span_deg, center.lng - half_span_deg),
            north_east: Coordinate::new(center.lat + half_span_deg, center.lng + half_span_deg),
        }
    }

    /// Whether `coord` lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&coord.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&coord.lng)
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            f64::midpoint(self.south_west.lat, self.north_east.lat),
            f64::midpoint(self.south_west.lng, self.north_east.lng),
        )
    }
}

/// Smallest [`Bounds`] enclosing every coordinate, or `None` if there are
/// none.
#[must_use]
pub fn bounds_of(coords: impl IntoIterator<Item = Coordinate>) -> Option<Bounds> {
    let points: Vec<geo::Point<f64>> = coords
        .into_iter()
        .map(|c| geo::Point::new(c.lng, c.lat))
        .collect();

    geo::MultiPoint(points).bounding_rect().map(|rect| Bounds {
        south_west: Coordinate::new(rect.min().y, rect.min().x),
        north_east: Coordinate::new(rect.max().y, rect.max().x),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELHI: Coordinate = Coordinate::new(28.6139, 77.2090);
    const MUMBAI: Coordinate = Coordinate::new(19.0760, 72.8777);

    #[test]
    fn distance_is_zero_for_identical_points() {
        assert!(distance_km(DELHI, DELHI).abs() < f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (DELHI, MUMBAI),
            (Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0)),
            (Coordinate::new(-33.9, 151.2), Coordinate::new(51.5, -0.12)),
        ];
        for (a, b) in pairs {
            assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn delhi_to_mumbai() {
        let d = distance_km(DELHI, MUMBAI);
        assert!((1140.0..1160.0).contains(&d), "got {d}");
    }

    #[test]
    fn same_site_threshold() {
        let base = Coordinate::new(10.0, 10.0);
        assert!(is_same_site(base, Coordinate::new(10.001, 10.001)));
        assert!(!is_same_site(base, Coordinate::new(10.01, 10.0)));
        assert!(!is_same_site(base, Coordinate::new(50.0, 50.0)));
    }

    #[test]
    fn nearest_prefers_first_on_tie() {
        let origin = Coordinate::new(0.0, 0.0);
        let items = [
            ("east", Coordinate::new(0.0, 1.0)),
            ("west", Coordinate::new(0.0, -1.0)),
            ("far", Coordinate::new(5.0, 5.0)),
        ];
        let hit = nearest(origin, &items, |(_, c)| *c).unwrap();
        assert_eq!(hit.0, "east");
    }

    #[test]
    fn nearest_of_empty_is_none() {
        let items: [Coordinate; 0] = [];
        assert!(nearest(DELHI, &items, |c| *c).is_none());
    }

    #[test]
    fn bounds_enclose_all_points() {
        let bounds = bounds_of([DELHI, MUMBAI, Coordinate::new(22.57, 88.36)]).unwrap();
        assert!((bounds.south_west.lat - 19.0760).abs() < 1e-9);
        assert!((bounds.south_west.lng - 72.8777).abs() < 1e-9);
        assert!((bounds.north_east.lat - 28.6139).abs() < 1e-9);
        assert!((bounds.north_east.lng - 88.36).abs() < 1e-9);
        assert!(bounds.contains(DELHI));
        assert!(!bounds.contains(Coordinate::new(35.0, 80.0)));
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(bounds_of(Vec::new()).is_none());
    }

    #[test]
    fn box_around_center() {
        let bounds = Bounds::around(DELHI, 0.5);
        let center = bounds.center();
        assert!((center.lat - DELHI.lat).abs() < 1e-9);
        assert!((center.lng - DELHI.lng).abs() < 1e-9);
        assert!(bounds.contains(Coordinate::new(28.9, 77.5)));
    }
}
