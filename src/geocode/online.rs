//! Online reverse geocoding fallback (Google Geocoding API).
//!
//! Responses come in two shapes. A populated area yields results typed
//! `administrative_area_level_1` / `_2` / `political`; the fields are the
//! first component of each. Tracks, hills and unnamed ways yield results
//! without that typing, and the fields have to be picked out of the
//! component type tags instead. Anything else is rejected.

use super::types::{GeocodeError, Place, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const ADMIN_LEVEL_1: &str = "administrative_area_level_1";
const ADMIN_LEVEL_2: &str = "administrative_area_level_2";
const POLITICAL: &str = "political";
const LOCALITY: &str = "locality";

/// A remote reverse-geocoding provider.
///
/// Calls are blocking and unauthenticated unless the provider says otherwise.
/// No caching, retry or rate limiting happens here.
pub trait OnlineGeocoder {
    fn reverse(&self, lat: f64, lng: f64) -> Result<Place>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

impl<G: OnlineGeocoder + ?Sized> OnlineGeocoder for &G {
    fn reverse(&self, lat: f64, lng: f64) -> Result<Place> {
        (**self).reverse(lat, lng)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<G: OnlineGeocoder + ?Sized> OnlineGeocoder for Box<G> {
    fn reverse(&self, lat: f64, lng: f64) -> Result<Place> {
        (**self).reverse(lat, lng)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

// ─── Response model ──────────────────────────────────────────────

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct GeocodeResult {
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

fn has_type(types: &[String], wanted: &str) -> bool {
    types.iter().any(|t| t == wanted)
}

/// Which extractor applies to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Some result typed `administrative_area_level_1` has components.
    Administrative,
    /// No usable administrative result, but an address component carries the tag.
    Degraded,
    Unrecognized,
}

impl ResponseShape {
    pub fn classify(response: &GeocodeResponse) -> Self {
        let administrative = response
            .results
            .iter()
            .any(|r| has_type(&r.types, ADMIN_LEVEL_1) && !r.address_components.is_empty());
        if administrative {
            return Self::Administrative;
        }
        let tagged = response
            .results
            .iter()
            .flat_map(|r| r.address_components.iter())
            .any(|c| has_type(&c.types, ADMIN_LEVEL_1));
        if tagged {
            Self::Degraded
        } else {
            Self::Unrecognized
        }
    }
}

impl GeocodeResponse {
    /// First component name, in document order, among results typed `result_type`.
    fn result_name(&self, result_type: &'static str) -> Result<String> {
        self.results
            .iter()
            .filter(|r| has_type(&r.types, result_type))
            .flat_map(|r| r.address_components.iter())
            .next()
            .map(|c| c.long_name.clone())
            .ok_or(GeocodeError::MissingComponent(result_type))
    }

    /// Name of the first component, across all results, typed `component_type`.
    fn component_name(&self, component_type: &'static str) -> Result<String> {
        self.results
            .iter()
            .flat_map(|r| r.address_components.iter())
            .find(|c| has_type(&c.types, component_type))
            .map(|c| c.long_name.clone())
            .ok_or(GeocodeError::MissingComponent(component_type))
    }

    fn extract_administrative(&self) -> Result<Place> {
        Ok(Place {
            region_name: self.result_name(ADMIN_LEVEL_1)?,
            sub_region_name: self.result_name(ADMIN_LEVEL_2)?,
            name: self.result_name(POLITICAL)?,
        })
    }

    fn extract_degraded(&self) -> Result<Place> {
        let name = self
            .results
            .iter()
            .flat_map(|r| r.address_components.iter())
            .next()
            .map(|c| c.long_name.clone())
            .ok_or(GeocodeError::MissingComponent("address_component"))?;
        Ok(Place {
            name,
            region_name: self.component_name(ADMIN_LEVEL_1)?,
            sub_region_name: self.component_name(LOCALITY)?,
        })
    }

    /// Turn a decoded response into a complete place, or an error.
    pub fn into_place(self, lat: f64, lng: f64) -> Result<Place> {
        if self.status == "ZERO_RESULTS" {
            return Err(GeocodeError::NoResult { lat, lng });
        }
        if self.status != "OK" {
            if let Some(msg) = &self.error_message {
                warn!(status = %self.status, "geocoder error: {}", msg);
            }
            return Err(GeocodeError::Remote { status: self.status });
        }

        let shape = ResponseShape::classify(&self);
        debug!(?shape, results = self.results.len(), "classified geocoder response");
        match shape {
            ResponseShape::Administrative => self.extract_administrative(),
            ResponseShape::Degraded => self.extract_degraded(),
            ResponseShape::Unrecognized => Err(GeocodeError::UnrecognizedResponse),
        }
    }
}

/// Decode a JSON body and extract the place.
pub fn parse_response(body: &str, lat: f64, lng: f64) -> Result<Place> {
    let response: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;
    response.into_place(lat, lng)
}

// ─── Google provider ─────────────────────────────────────────────

/// Blocking client for the Google reverse geocoding endpoint.
pub struct GoogleGeocoder {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
}

impl Default for GoogleGeocoder {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, None, None)
    }
}

impl GoogleGeocoder {
    /// `timeout` of `None` leaves the request unbounded.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Self {
            agent: builder.build(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl OnlineGeocoder for GoogleGeocoder {
    fn reverse(&self, lat: f64, lng: f64) -> Result<Place> {
        let latlng = format!("{},{}", lat, lng);
        let mut request = self
            .agent
            .get(&self.endpoint)
            .set("User-Agent", concat!("geoplace/", env!("CARGO_PKG_VERSION")))
            .query("latlng", &latlng);
        if let Some(key) = &self.api_key {
            request = request.query("key", key);
        }

        debug!(endpoint = %self.endpoint, %latlng, "online reverse geocode");

        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(code, _) => GeocodeError::Remote {
                status: format!("HTTP {}", code),
            },
            ureq::Error::Transport(t) => GeocodeError::Network(t.to_string()),
        })?;

        let body: GeocodeResponse = response
            .into_json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        body.into_place(lat, lng)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

/// Reverse geocode through the default Google endpoint.
pub fn resolve_online(lat: f64, lng: f64) -> Result<Place> {
    GoogleGeocoder::default().reverse(lat, lng)
}
