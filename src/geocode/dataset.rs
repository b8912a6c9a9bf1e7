//! Point datasets: SQLite store and an in-memory scan.
//!
//! SQLite schema (one row per named feature, one or more points each):
//!
//! ```text
//! everything(id INTEGER PRIMARY KEY, name, admin2_name, admin1_name)
//! coordinates(feature_id -> everything.id, latitude, longitude)
//! ```

use super::offline::{self, SearchWindow};
use super::types::{Coordinate, GeocodeError, Place, Result};
use rusqlite::{named_params, Connection, OpenFlags, OptionalExtension};
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// A read-only, queryable point collection.
pub trait Dataset {
    /// Nearest place inside `window` under the latitude-scaled metric.
    fn nearest_in_window(&self, window: &SearchWindow, scale: f64) -> Result<Option<Place>>;

    /// Number of points.
    fn count(&self) -> Result<usize>;
}

impl<D: Dataset + ?Sized> Dataset for &D {
    fn nearest_in_window(&self, window: &SearchWindow, scale: f64) -> Result<Option<Place>> {
        (**self).nearest_in_window(window, scale)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}

impl<D: Dataset + ?Sized> Dataset for Box<D> {
    fn nearest_in_window(&self, window: &SearchWindow, scale: f64) -> Result<Option<Place>> {
        (**self).nearest_in_window(window, scale)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}

// ─── In-memory dataset ──────────────────────────────────────────

/// Linear bounding-box scan over owned points.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    points: Vec<(Coordinate, Place)>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: Coordinate, place: Place) {
        self.points.push((point, place));
    }
}

impl FromIterator<(Coordinate, Place)> for MemoryDataset {
    fn from_iter<T: IntoIterator<Item = (Coordinate, Place)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl Dataset for MemoryDataset {
    fn nearest_in_window(&self, window: &SearchWindow, scale: f64) -> Result<Option<Place>> {
        let candidates = self.points.iter().map(|(point, place)| (point, place));
        Ok(offline::nearest(candidates, window, scale).cloned())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.points.len())
    }
}

// ─── SQLite dataset ─────────────────────────────────────────────

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS everything (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    admin2_name TEXT NOT NULL,
    admin1_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS coordinates (
    feature_id INTEGER NOT NULL REFERENCES everything(id),
    latitude   REAL NOT NULL,
    longitude  REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS coordinates_lat_lng ON coordinates (latitude, longitude);
";

const NEAREST_SQL: &str = "
SELECT e.name, e.admin2_name, e.admin1_name
FROM coordinates c
JOIN everything e ON e.id = c.feature_id
WHERE c.latitude BETWEEN :min_lat AND :max_lat
  AND c.longitude BETWEEN :min_lng AND :max_lng
ORDER BY (:lat - c.latitude) * (:lat - c.latitude)
       + (:lng - c.longitude) * (:lng - c.longitude) * :scale ASC,
         c.rowid ASC
LIMIT 1
";

/// Dataset backed by a SQLite file.
pub struct SqliteDataset {
    conn: Connection,
}

impl SqliteDataset {
    /// Open (creating if needed) a dataset file for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened dataset");
        Ok(Self { conn })
    }

    /// Open an existing dataset file without write access.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.as_ref().display(), "opened dataset read-only");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create the tables and index if they do not exist.
    pub fn provision(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a feature and one of its points.
    ///
    /// Reusing a `feature_id` adds another point to the existing feature. The
    /// names must match what is already stored for it; a mismatch is an
    /// `Import` error and nothing is written.
    pub fn insert_place(&self, feature_id: i64, point: Coordinate, place: &Place) -> Result<()> {
        insert_row(&self.conn, feature_id, point, place)
    }

    /// Load CSV rows into the dataset in a single transaction.
    ///
    /// Expected header: `feature_id,latitude,longitude,name,sub_region_name,region_name`.
    /// Returns the number of imported rows. Nothing is committed on error.
    pub fn import_csv<R: io::Read>(&mut self, reader: R) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut imported = 0usize;

        for (idx, row) in csv_reader.deserialize::<ImportRow>().enumerate() {
            // Header is line 1.
            let line = idx + 2;
            let row = row.map_err(|e| GeocodeError::Import(format!("line {}: {}", line, e)))?;
            let point = Coordinate::validated(row.latitude, row.longitude)
                .map_err(|e| GeocodeError::Import(format!("line {}: {}", line, e)))?;
            let place = Place::new(row.name, row.sub_region_name, row.region_name);
            insert_row(&tx, row.feature_id, point, &place).map_err(|e| match e {
                GeocodeError::Import(msg) => GeocodeError::Import(format!("line {}: {}", line, msg)),
                other => other,
            })?;
            imported += 1;
        }

        tx.commit()?;
        info!(rows = imported, "imported places");
        Ok(imported)
    }
}

fn insert_row(conn: &Connection, feature_id: i64, point: Coordinate, place: &Place) -> Result<()> {
    let existing = conn
        .prepare_cached("SELECT name, admin2_name, admin1_name FROM everything WHERE id = ?1")?
        .query_row([feature_id], |row| {
            Ok(Place {
                name: row.get(0)?,
                sub_region_name: row.get(1)?,
                region_name: row.get(2)?,
            })
        })
        .optional()?;

    match existing {
        Some(stored) if stored != *place => {
            return Err(GeocodeError::Import(format!(
                "feature {} is already '{}' but was given as '{}'",
                feature_id,
                stored.display_line(),
                place.display_line()
            )));
        }
        Some(_) => {}
        None => {
            conn.prepare_cached(
                "INSERT INTO everything (id, name, admin2_name, admin1_name) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute((feature_id, &place.name, &place.sub_region_name, &place.region_name))?;
        }
    }

    conn.prepare_cached(
        "INSERT INTO coordinates (feature_id, latitude, longitude) VALUES (?1, ?2, ?3)",
    )?
    .execute((feature_id, point.latitude, point.longitude))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ImportRow {
    feature_id: i64,
    latitude: f64,
    longitude: f64,
    name: String,
    sub_region_name: String,
    region_name: String,
}

impl Dataset for SqliteDataset {
    fn nearest_in_window(&self, window: &SearchWindow, scale: f64) -> Result<Option<Place>> {
        let mut stmt = self.conn.prepare_cached(NEAREST_SQL)?;
        let place = stmt
            .query_row(
                named_params! {
                    ":min_lat": window.min_lat,
                    ":max_lat": window.max_lat,
                    ":min_lng": window.min_lng,
                    ":max_lng": window.max_lng,
                    ":lat": window.center.latitude,
                    ":lng": window.center.longitude,
                    ":scale": scale,
                },
                |row| {
                    Ok(Place {
                        name: row.get(0)?,
                        sub_region_name: row.get(1)?,
                        region_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(place)
    }

    fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM coordinates", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::offline::{latitude_scale, resolve_offline};
    use tempfile::TempDir;

    fn sample_rows() -> Vec<(i64, Coordinate, Place)> {
        vec![
            (1, Coordinate::new(-41.2865, 174.7762), Place::new("Wellington", "Wellington City", "Wellington")),
            (2, Coordinate::new(-41.1337, 175.0421), Place::new("Upper Hutt", "Upper Hutt City", "Wellington")),
            (3, Coordinate::new(-40.3523, 175.6082), Place::new("Palmerston North", "Palmerston North City", "Manawatu-Wanganui")),
            (4, Coordinate::new(-43.5321, 172.6362), Place::new("Christchurch", "Christchurch City", "Canterbury")),
            // Equidistant pair around (-35.0, 174.0).
            (5, Coordinate::new(-35.0, 174.5), Place::new("East Point", "Far North District", "Northland")),
            (6, Coordinate::new(-35.0, 173.5), Place::new("West Point", "Far North District", "Northland")),
        ]
    }

    fn sqlite_sample() -> SqliteDataset {
        let ds = SqliteDataset::open_in_memory().unwrap();
        ds.provision().unwrap();
        for (id, point, place) in sample_rows() {
            ds.insert_place(id, point, &place).unwrap();
        }
        ds
    }

    fn memory_sample() -> MemoryDataset {
        sample_rows().into_iter().map(|(_, p, place)| (p, place)).collect()
    }

    #[test]
    fn test_sqlite_nearest() {
        let ds = sqlite_sample();
        let found = resolve_offline(-41.25, 174.8, &ds).unwrap().unwrap();
        assert_eq!(found.name, "Wellington");
        assert_eq!(found.region_name, "Wellington");
    }

    #[test]
    fn test_sqlite_miss_outside_window() {
        let ds = sqlite_sample();
        assert_eq!(resolve_offline(-46.4, 168.35, &ds).unwrap(), None);
    }

    #[test]
    fn test_sqlite_matches_memory_scan() {
        let sqlite = sqlite_sample();
        let memory = memory_sample();
        let queries = [
            (-41.2, 174.9),
            (-41.0, 175.2),
            (-40.5, 175.5),
            (-42.5, 173.0),
            (-43.9, 171.9),
            (-44.0, 176.0),
            (-35.0, 174.0),
        ];
        for (lat, lng) in queries {
            let window = SearchWindow::around(Coordinate::new(lat, lng));
            let scale = latitude_scale(lat);
            assert_eq!(
                sqlite.nearest_in_window(&window, scale).unwrap(),
                memory.nearest_in_window(&window, scale).unwrap(),
                "query {}, {}",
                lat,
                lng
            );
        }
    }

    #[test]
    fn test_sqlite_tie_keeps_first_inserted() {
        let sqlite = sqlite_sample();
        let memory = memory_sample();
        let window = SearchWindow::around(Coordinate::new(-35.0, 174.0));
        let scale = latitude_scale(-35.0);
        let from_sqlite = sqlite.nearest_in_window(&window, scale).unwrap().unwrap();
        let from_memory = memory.nearest_in_window(&window, scale).unwrap().unwrap();
        assert_eq!(from_sqlite.name, "East Point");
        assert_eq!(from_memory.name, "East Point");
    }

    #[test]
    fn test_sqlite_rejects_conflicting_feature_names() {
        let ds = SqliteDataset::open_in_memory().unwrap();
        ds.provision().unwrap();
        let nelson = Place::new("Nelson", "Nelson City", "Nelson");
        ds.insert_place(9, Coordinate::new(-41.27, 173.28), &nelson).unwrap();

        let renamed = Place::new("Richmond", "Tasman District", "Tasman");
        let err = ds.insert_place(9, Coordinate::new(-41.34, 173.18), &renamed).unwrap_err();
        assert!(matches!(err, GeocodeError::Import(_)));

        assert_eq!(ds.count().unwrap(), 1);
        assert_eq!(resolve_offline(-41.34, 173.18, &ds).unwrap(), Some(nelson));
    }

    #[test]
    fn test_import_csv_rejects_conflicting_feature() {
        let mut ds = SqliteDataset::open_in_memory().unwrap();
        ds.provision().unwrap();
        let csv = "\
feature_id,latitude,longitude,name,sub_region_name,region_name
1,-36.8485,174.7633,Auckland,Auckland,Auckland
1,-36.9000,174.8000,Manukau,Auckland,Auckland
";
        match ds.import_csv(csv.as_bytes()).unwrap_err() {
            GeocodeError::Import(msg) => assert!(msg.starts_with("line 3"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ds.count().unwrap(), 0);
    }

    #[test]
    fn test_sqlite_multiple_points_per_feature() {
        let ds = SqliteDataset::open_in_memory().unwrap();
        ds.provision().unwrap();
        let place = Place::new("Lake Taupo", "Taupo District", "Waikato");
        ds.insert_place(7, Coordinate::new(-38.7, 175.8), &place).unwrap();
        ds.insert_place(7, Coordinate::new(-38.9, 175.9), &place).unwrap();
        assert_eq!(ds.count().unwrap(), 2);
        assert_eq!(resolve_offline(-38.95, 175.9, &ds).unwrap(), Some(place));
    }

    #[test]
    fn test_sqlite_unprovisioned_is_error() {
        let ds = SqliteDataset::open_in_memory().unwrap();
        let result = resolve_offline(0.0, 0.0, &ds);
        assert!(matches!(result, Err(GeocodeError::Dataset(_))));
    }

    #[test]
    fn test_sqlite_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("places.sqlite");
        {
            let ds = SqliteDataset::open(&path).unwrap();
            ds.provision().unwrap();
            ds.insert_place(1, Coordinate::new(40.0, -75.0), &Place::new("Springfield", "Greene", "Ohio"))
                .unwrap();
        }
        let ds = SqliteDataset::open_read_only(&path).unwrap();
        let found = resolve_offline(40.01, -75.01, &ds).unwrap();
        assert_eq!(found, Some(Place::new("Springfield", "Greene", "Ohio")));
    }

    #[test]
    fn test_import_csv() {
        let mut ds = SqliteDataset::open_in_memory().unwrap();
        ds.provision().unwrap();
        let csv = "\
feature_id,latitude,longitude,name,sub_region_name,region_name
1,-36.8485,174.7633,Auckland,Auckland,Auckland
2,-37.7870,175.2793,Hamilton,Hamilton City,Waikato
";
        assert_eq!(ds.import_csv(csv.as_bytes()).unwrap(), 2);
        assert_eq!(ds.count().unwrap(), 2);
        let found = resolve_offline(-37.7, 175.2, &ds).unwrap().unwrap();
        assert_eq!(found.name, "Hamilton");
    }

    #[test]
    fn test_import_csv_rejects_bad_row() {
        let mut ds = SqliteDataset::open_in_memory().unwrap();
        ds.provision().unwrap();
        let csv = "\
feature_id,latitude,longitude,name,sub_region_name,region_name
1,-36.8485,174.7633,Auckland,Auckland,Auckland
2,not-a-number,175.2793,Hamilton,Hamilton City,Waikato
";
        let err = ds.import_csv(csv.as_bytes()).unwrap_err();
        match err {
            GeocodeError::Import(msg) => assert!(msg.starts_with("line 3"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
        // Transaction rolled back.
        assert_eq!(ds.count().unwrap(), 0);
    }

    #[test]
    fn test_import_csv_rejects_out_of_range() {
        let mut ds = SqliteDataset::open_in_memory().unwrap();
        ds.provision().unwrap();
        let csv = "\
feature_id,latitude,longitude,name,sub_region_name,region_name
1,95.0,174.7633,Nowhere,-,-
";
        assert!(matches!(ds.import_csv(csv.as_bytes()), Err(GeocodeError::Import(_))));
    }
}
