//! Place resolver: offline dataset first, online geocoder on a miss.

use super::dataset::Dataset;
use super::offline::resolve_offline;
use super::online::OnlineGeocoder;
use super::types::{Place, PlaceSource, ResolvedPlace, Result};
use tracing::{debug, info};

/// Offline-first resolver over a dataset and an online fallback.
pub struct PlaceResolver<D, G> {
    dataset: D,
    online: G,
}

impl<D: Dataset, G: OnlineGeocoder> PlaceResolver<D, G> {
    pub fn new(dataset: D, online: G) -> Self {
        Self { dataset, online }
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Resolve a coordinate pair to a place.
    pub fn get_place(&self, lat: f64, lng: f64) -> Result<Place> {
        self.locate(lat, lng).map(|r| r.place)
    }

    /// Resolve a coordinate pair, reporting which source answered.
    pub fn locate(&self, lat: f64, lng: f64) -> Result<ResolvedPlace> {
        locate(lat, lng, &self.dataset, &self.online)
    }

    /// Dataset lookup only; a miss is `Ok(None)`.
    pub fn locate_offline(&self, lat: f64, lng: f64) -> Result<Option<Place>> {
        resolve_offline(lat, lng, &self.dataset)
    }
}

/// Resolve through `dataset`, falling back to `online` on a miss.
pub fn get_place<D, G>(lat: f64, lng: f64, dataset: &D, online: &G) -> Result<Place>
where
    D: Dataset + ?Sized,
    G: OnlineGeocoder + ?Sized,
{
    locate(lat, lng, dataset, online).map(|r| r.place)
}

pub fn locate<D, G>(lat: f64, lng: f64, dataset: &D, online: &G) -> Result<ResolvedPlace>
where
    D: Dataset + ?Sized,
    G: OnlineGeocoder + ?Sized,
{
    if let Some(place) = resolve_offline(lat, lng, dataset)? {
        return Ok(ResolvedPlace {
            place,
            source: PlaceSource::Offline,
        });
    }
    locate_online(lat, lng, online)
}

/// The fallback half of [`locate`], for callers that ran the offline
/// lookup themselves.
pub fn locate_online<G: OnlineGeocoder + ?Sized>(lat: f64, lng: f64, online: &G) -> Result<ResolvedPlace> {
    debug!(lat, lng, provider = online.name(), "offline miss, falling back online");
    let place = online.reverse(lat, lng)?;
    info!(lat, lng, provider = online.name(), place = %place.name, "resolved online");
    Ok(ResolvedPlace {
        place,
        source: PlaceSource::Online,
    })
}
