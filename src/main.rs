use anyhow::Context;
use clap::{Parser, Subcommand};
use geoplace::config::{DatasetArgs, GeocoderArgs, ServerArgs};
use geoplace::geocode::{
    Coordinate, Dataset, GeocodeError, PlaceResolver, PlaceSource, ResolvedPlace, SqliteDataset,
};
use geoplace::server::{SharedDataset, SharedGeocoder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// geoplace: single-country reverse geocoder
///
/// Looks coordinates up in a local places database first and asks an
/// online geocoder only when nothing is within range.
///
/// Examples:
///   geoplace import places.csv
///   geoplace lookup --lat -41.2865 --lng 174.7762
///   geoplace lookup --lat -39.14 --lng 175.64 --json
///   geoplace serve --port 8080
#[derive(Parser)]
#[command(name = "geoplace", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a coordinate pair to place, sub-region and region.
    Lookup {
        /// Latitude (-90 to 90).
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude (-180 to 180).
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Only use the local database; a miss is an error.
        #[arg(long)]
        offline: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        dataset: DatasetArgs,

        #[command(flatten)]
        geocoder: GeocoderArgs,
    },

    /// Create the places database (if needed) and load a CSV into it.
    Import {
        /// CSV with header feature_id,latitude,longitude,name,sub_region_name,region_name
        csv: PathBuf,

        #[command(flatten)]
        dataset: DatasetArgs,
    },

    /// Serve lookups over HTTP.
    Serve {
        #[command(flatten)]
        server: ServerArgs,

        #[command(flatten)]
        dataset: DatasetArgs,

        #[command(flatten)]
        geocoder: GeocoderArgs,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geoplace=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Lookup {
            lat,
            lng,
            offline,
            json,
            dataset,
            geocoder,
        } => lookup(lat, lng, offline, json, &dataset, &geocoder),
        Command::Import { csv, dataset } => import(&csv, &dataset),
        Command::Serve {
            server,
            dataset,
            geocoder,
        } => serve(&server, &dataset, &geocoder),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn lookup(
    lat: f64,
    lng: f64,
    offline: bool,
    json: bool,
    dataset: &DatasetArgs,
    geocoder: &GeocoderArgs,
) -> anyhow::Result<()> {
    let coord = Coordinate::validated(lat, lng)?;
    let db = open_dataset(dataset)?;

    let resolver = PlaceResolver::new(db, geocoder.build());

    let resolved = if offline {
        let place = resolver
            .locate_offline(coord.latitude, coord.longitude)?
            .ok_or(GeocodeError::NoResult { lat, lng })?;
        ResolvedPlace {
            place,
            source: PlaceSource::Offline,
        }
    } else {
        resolver.locate(coord.latitude, coord.longitude)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        eprintln!("  \u{1F4CD} ({})", resolved.source);
        println!("{}", resolved.place.display_line());
    }
    Ok(())
}

fn open_dataset(dataset: &DatasetArgs) -> anyhow::Result<SqliteDataset> {
    let path = dataset.path();
    SqliteDataset::open_read_only(&path)
        .with_context(|| format!("cannot open places database {}", path.display()))
}

fn import(csv: &Path, dataset: &DatasetArgs) -> anyhow::Result<()> {
    let path = dataset.path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("cannot create {}", parent.display()))?;
    }

    let file = File::open(csv).with_context(|| format!("cannot read {}", csv.display()))?;
    let mut db = SqliteDataset::open(&path)
        .with_context(|| format!("cannot open places database {}", path.display()))?;
    db.provision()?;
    let rows = db.import_csv(file)?;

    eprintln!("  Imported {} rows into {} ({} points total)", rows, path.display(), db.count()?);
    Ok(())
}

fn serve(server: &ServerArgs, dataset: &DatasetArgs, geocoder: &GeocoderArgs) -> anyhow::Result<()> {
    let db: SharedDataset = Box::new(open_dataset(dataset)?);
    let online: SharedGeocoder = Box::new(geocoder.build());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime
        .block_on(geoplace::server::start(&server.host, server.port, db, online))
        .with_context(|| format!("server on {}:{} failed", server.host, server.port))
}
