//! Offline nearest-place lookup.
//!
//! Distance is a locally corrected squared Euclidean metric in degrees:
//! `dlat² + cos²(lat) · dlng²`. Candidates are prefiltered by a fixed
//! ±1.5° box. The box does not wrap at the antimeridian or the poles.

use super::dataset::Dataset;
use super::types::{Coordinate, Place, Result};
use tracing::debug;

/// Half-width of the search box in degrees, both axes.
pub const WINDOW_DEGREES: f64 = 1.5;

/// Rectangular prefilter around a query point. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWindow {
    pub center: Coordinate,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl SearchWindow {
    pub fn around(center: Coordinate) -> Self {
        Self::with_half_width(center, WINDOW_DEGREES)
    }

    pub fn with_half_width(center: Coordinate, half: f64) -> Self {
        Self {
            center,
            min_lat: center.latitude - half,
            max_lat: center.latitude + half,
            min_lng: center.longitude - half,
            max_lng: center.longitude + half,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lng..=self.max_lng).contains(&point.longitude)
    }
}

/// Longitude correction factor, `cos(lat)²`.
pub fn latitude_scale(lat: f64) -> f64 {
    lat.to_radians().cos().powi(2)
}

/// Scaled squared distance between the query and a candidate.
pub fn scaled_distance(query: Coordinate, point: Coordinate, scale: f64) -> f64 {
    let dlat = query.latitude - point.latitude;
    let dlng = query.longitude - point.longitude;
    dlat * dlat + scale * dlng * dlng
}

/// Pick the candidate inside `window` closest to its center.
///
/// Ties keep the earliest candidate.
pub fn nearest<'a, I>(candidates: I, window: &SearchWindow, scale: f64) -> Option<&'a Place>
where
    I: IntoIterator<Item = (&'a Coordinate, &'a Place)>,
{
    let mut best: Option<(f64, &Place)> = None;
    for (point, place) in candidates {
        if !window.contains(*point) {
            continue;
        }
        let dist = scaled_distance(window.center, *point, scale);
        match best {
            Some((best_dist, _)) if best_dist <= dist => {}
            _ => best = Some((dist, place)),
        }
    }
    best.map(|(_, place)| place)
}

/// Find the nearest dataset place within the search window of `(lat, lng)`.
///
/// `Ok(None)` is a miss, not an error; dataset failures propagate.
pub fn resolve_offline<D: Dataset + ?Sized>(lat: f64, lng: f64, dataset: &D) -> Result<Option<Place>> {
    let window = SearchWindow::around(Coordinate::new(lat, lng));
    let scale = latitude_scale(lat);
    let found = dataset.nearest_in_window(&window, scale)?;
    debug!(lat, lng, scale, hit = found.is_some(), "offline lookup");
    Ok(found)
}
