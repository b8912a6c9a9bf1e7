//! Runtime settings shared by the CLI subcommands.
//!
//! Every flag can also come from a `GEOPLACE_*` environment variable.

use crate::geocode::online::{GoogleGeocoder, DEFAULT_ENDPOINT};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Location of the SQLite point dataset.
#[derive(Args, Debug, Clone, Default)]
pub struct DatasetArgs {
    /// Path to the places database. Defaults to <data dir>/geoplace/places.sqlite.
    #[arg(long, env = "GEOPLACE_DB")]
    pub db: Option<PathBuf>,
}

impl DatasetArgs {
    pub fn path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(default_dataset_path)
    }
}

pub fn default_dataset_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geoplace")
        .join("places.sqlite")
}

/// Online fallback provider settings.
#[derive(Args, Debug, Clone)]
pub struct GeocoderArgs {
    /// Reverse geocoding endpoint (Google Geocoding JSON API).
    #[arg(long, env = "GEOPLACE_GEOCODER_URL", default_value = DEFAULT_ENDPOINT)]
    pub geocoder_url: String,

    /// API key appended as `key=`. Requests are unauthenticated without it.
    #[arg(long, env = "GEOPLACE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds. No timeout when unset.
    #[arg(long, env = "GEOPLACE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl Default for GeocoderArgs {
    fn default() -> Self {
        Self {
            geocoder_url: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

impl GeocoderArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn build(&self) -> GoogleGeocoder {
        let endpoint = self.geocoder_url.trim().trim_end_matches('/');
        let key = self.api_key.clone().filter(|k| !k.trim().is_empty());
        GoogleGeocoder::new(endpoint, key, self.timeout())
    }
}

/// HTTP listener settings for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    #[arg(long, env = "GEOPLACE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "GEOPLACE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}
