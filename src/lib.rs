pub mod config;
pub mod geocode;
pub mod server;

pub use geocode::{
    get_place, resolve_offline, resolve_online, Coordinate, Dataset, GeocodeError, GoogleGeocoder,
    MemoryDataset, OnlineGeocoder, Place, PlaceResolver, PlaceSource, ResolvedPlace, SqliteDataset,
};
