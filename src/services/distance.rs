// src/services/distance.rs
// DOCUMENTATION: Great-circle distance and candidate ranking
// PURPOSE: Single source of distance math for stores, finder and handlers

use crate::models::{Coordinates, Place, ScoredPlace};

/// Mean Earth radius
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Hard cap on how many ranked places a store hands back
pub const STORE_RESULT_CAP: usize = 10;

/// Slack added to bounding boxes so rows right on the edge are not lost
const BOX_MARGIN_DEG: f64 = 1e-6;

/// Calculate distance between two coordinates in kilometers
/// Uses Haversine formula
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + (lat1.to_radians().cos()) * (lat2.to_radians().cos()) * (d_lon / 2.0).sin().powi(2);

    // rounding can push a a hair above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// lat in [-90, 90], lon in [-180, 180]; NaN and infinities are invalid
pub fn validate_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Round a distance to 2 decimals
pub fn round_km(distance_km: f64) -> f64 {
    (distance_km * 100.0).round() / 100.0
}

/// Google Maps link that drops a pin on the coordinates
pub fn map_link(coordinates: &Coordinates) -> String {
    format!(
        "https://maps.google.com/maps?q={},{}",
        coordinates.lat, coordinates.lon
    )
}

/// Human readable distance: "650 m", "3.4 km", "27 km"
pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{} m", (distance_km * 1000.0) as i64)
    } else if distance_km < 10.0 {
        format!("{:.1} km", distance_km)
    } else {
        format!("{} km", distance_km as i64)
    }
}

/// Lat/lon rectangle enclosing every point within a radius
/// DOCUMENTATION: Used by stores as an index-friendly prefilter before the
/// exact haversine check. `lon_range` is None when the circle reaches a pole
/// or crosses the antimeridian; only the latitude band applies then.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub lon_range: Option<(f64, f64)>,
}

impl BoundingBox {
    pub fn around(center: &Coordinates, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let d_lat = angular.to_degrees() + BOX_MARGIN_DEG;

        let min_lat = center.lat - d_lat;
        let max_lat = center.lat + d_lat;

        if min_lat <= -90.0 || max_lat >= 90.0 {
            return Self {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                lon_range: None,
            };
        }

        // widest longitude span of the circle, reached off the center latitude
        let ratio = angular.sin() / center.lat.to_radians().cos();
        if ratio >= 1.0 {
            return Self {
                min_lat,
                max_lat,
                lon_range: None,
            };
        }

        let d_lon = ratio.asin().to_degrees() + BOX_MARGIN_DEG;
        let min_lon = center.lon - d_lon;
        let max_lon = center.lon + d_lon;

        let lon_range = (min_lon >= -180.0 && max_lon <= 180.0).then_some((min_lon, max_lon));

        Self {
            min_lat,
            max_lat,
            lon_range,
        }
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        let lat_ok = point.lat >= self.min_lat && point.lat <= self.max_lat;
        match self.lon_range {
            Some((min_lon, max_lon)) => lat_ok && point.lon >= min_lon && point.lon <= max_lon,
            None => lat_ok,
        }
    }
}

/// Score, filter, sort and cap candidate places
/// DOCUMENTATION: Records with out-of-range stored coordinates are skipped
/// and logged, never failing the whole lookup. Output is ascending by
/// distance rounded to 2 decimals, ties broken by ascending id, at most
/// `cap` long.
pub fn rank_within_radius(
    places: Vec<Place>,
    center: &Coordinates,
    radius_km: f64,
    cap: usize,
) -> Vec<ScoredPlace> {
    let total = places.len();
    let mut skipped = 0usize;

    let mut scored: Vec<ScoredPlace> = places
        .into_iter()
        .filter_map(|place| {
            if !place.coordinates.is_valid() {
                log::warn!(
                    "Skipping place {} with invalid coordinates ({}, {})",
                    place.id,
                    place.coordinates.lat,
                    place.coordinates.lon
                );
                skipped += 1;
                return None;
            }

            let distance_km = center.distance_to(&place.coordinates);
            (distance_km <= radius_km).then_some(ScoredPlace { place, distance_km })
        })
        .collect();

    // order by the distance callers see, so equal displayed values fall back to id
    scored.sort_by(|a, b| {
        round_km(a.distance_km)
            .total_cmp(&round_km(b.distance_km))
            .then_with(|| a.place.id.cmp(&b.place.id))
    });
    scored.truncate(cap);

    log::debug!(
        "Ranked {} candidates: {} kept, {} skipped as malformed",
        total,
        scored.len(),
        skipped
    );

    scored
}
