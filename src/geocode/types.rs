//! Core types for the geocoding subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved place: locality name plus its two enclosing administrative areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// Second-level administrative area (district, county).
    pub sub_region_name: String,
    /// First-level administrative area (region, state).
    pub region_name: String,
}

impl Place {
    pub fn new(
        name: impl Into<String>,
        sub_region_name: impl Into<String>,
        region_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sub_region_name: sub_region_name.into(),
            region_name: region_name.into(),
        }
    }

    pub fn display_line(&self) -> String {
        format!("{}, {}, {}", self.name, self.sub_region_name, self.region_name)
    }
}

/// A point in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject points outside lat -90..90 / lng -180..180.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeocodeError::InvalidCoordinate {
                lat: latitude,
                lng: longitude,
            });
        }
        Ok(Self::new(latitude, longitude))
    }
}

/// How a place was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceSource {
    Offline,
    Online,
}

impl fmt::Display for PlaceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Online => write!(f, "online"),
        }
    }
}

/// A place together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPlace {
    #[serde(flatten)]
    pub place: Place,
    pub source: PlaceSource,
}

/// Geocoding errors.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("dataset error: {0}")]
    Dataset(#[from] rusqlite::Error),

    #[error("import error: {0}")]
    Import(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid geocoder response: {0}")]
    InvalidResponse(String),

    #[error("geocoder returned status {status}")]
    Remote { status: String },

    #[error("no place found for {lat}, {lng}")]
    NoResult { lat: f64, lng: f64 },

    #[error("geocoder response has no '{0}' component")]
    MissingComponent(&'static str),

    #[error("geocoder response shape not recognized")]
    UnrecognizedResponse,

    #[error("invalid coordinates {lat}, {lng} (lat: -90..90, lng: -180..180)")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

pub type Result<T, E = GeocodeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_serializes_three_fields() {
        let place = Place::new("Springfield", "Greene", "Ohio");
        let json = serde_json::to_value(&place).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Springfield",
                "sub_region_name": "Greene",
                "region_name": "Ohio",
            })
        );
    }

    #[test]
    fn test_resolved_place_flattens() {
        let resolved = ResolvedPlace {
            place: Place::new("Null Island", "-", "-"),
            source: PlaceSource::Online,
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["name"], "Null Island");
        assert_eq!(json["source"], "online");
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::validated(40.0, -75.0).is_ok());
        assert!(Coordinate::validated(90.0, 180.0).is_ok());
        assert!(matches!(
            Coordinate::validated(91.0, 0.0),
            Err(GeocodeError::InvalidCoordinate { .. })
        ));
        assert!(Coordinate::validated(0.0, -180.5).is_err());
        assert!(Coordinate::validated(f64::NAN, 0.0).is_err());
    }
}
