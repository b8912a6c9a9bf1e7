//! Reverse geocoding subsystem.
//!
//! Offline nearest-point lookup over a local dataset, with an online
//! geocoder as fallback when the dataset has nothing nearby.

pub mod dataset;
pub mod offline;
pub mod online;
pub mod resolver;
pub mod types;

pub use dataset::{Dataset, MemoryDataset, SqliteDataset};
pub use offline::{resolve_offline, SearchWindow};
pub use online::{resolve_online, GoogleGeocoder, OnlineGeocoder};
pub use resolver::{get_place, PlaceResolver};
pub use types::{Coordinate, GeocodeError, Place, PlaceSource, ResolvedPlace, Result};
