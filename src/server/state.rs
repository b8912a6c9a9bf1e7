use crate::geocode::resolver::locate_online;
use crate::geocode::{resolve_offline, Dataset, OnlineGeocoder, PlaceSource, ResolvedPlace, Result};
use std::sync::Mutex;

pub type SharedDataset = Box<dyn Dataset + Send>;
pub type SharedGeocoder = Box<dyn OnlineGeocoder + Send + Sync>;

/// Only the dataset connection is serialized; online calls run unlocked.
pub struct AppState {
    pub dataset: Mutex<SharedDataset>,
    pub online: SharedGeocoder,
}

impl AppState {
    pub fn new(dataset: SharedDataset, online: SharedGeocoder) -> Self {
        Self {
            dataset: Mutex::new(dataset),
            online,
        }
    }

    pub fn locate(&self, lat: f64, lng: f64) -> Result<ResolvedPlace> {
        let offline = {
            let dataset = self.dataset.lock().unwrap_or_else(|e| e.into_inner());
            resolve_offline(lat, lng, &**dataset)?
        };
        match offline {
            Some(place) => Ok(ResolvedPlace {
                place,
                source: PlaceSource::Offline,
            }),
            None => locate_online(lat, lng, &*self.online),
        }
    }

    pub fn point_count(&self) -> Result<usize> {
        self.dataset.lock().unwrap_or_else(|e| e.into_inner()).count()
    }
}
