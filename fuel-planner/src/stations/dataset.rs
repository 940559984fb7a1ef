//! Station dataset loading from OPIS truck stop CSV exports.
//!
//! Expected header row:
//!
//! ```text
//! OPIS Truckstop ID,Truckstop Name,Address,City,State,Rack ID,Retail Price
//! ```
//!
//! Header matching ignores case, spacing and punctuation. `Rack ID` is
//! optional and unused. The raw OPIS export carries no positions, so
//! `Latitude` and `Longitude` columns are optional too: rows that have them
//! are used as is, rows without them come back as [`UnlocatedStation`]s for
//! [`super::locate_stations`] to geocode. Rows with an unparseable ID, price
//! or position are skipped and counted; for repeated IDs the first row wins.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Coordinate, InvalidPrice, Locality, Station, StationId, check_price};

use super::error::StationError;

const COL_ID: &str = "opistruckstopid";
const COL_NAME: &str = "truckstopname";
const COL_ADDRESS: &str = "address";
const COL_CITY: &str = "city";
const COL_STATE: &str = "state";
const COL_PRICE: &str = "retailprice";
const COL_LAT: &str = "latitude";
const COL_LNG: &str = "longitude";

const REQUIRED: [(&str, &str); 6] = [
    (COL_ID, "OPIS Truckstop ID"),
    (COL_NAME, "Truckstop Name"),
    (COL_ADDRESS, "Address"),
    (COL_CITY, "City"),
    (COL_STATE, "State"),
    (COL_PRICE, "Retail Price"),
];

/// What happened while loading a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Stations ready for use, geocoded ones included.
    pub loaded: usize,
    /// Stations whose position came from the geocoder.
    pub geocoded: usize,
    /// Rows dropped for bad or missing values, or because geocoding failed.
    pub skipped: usize,
    /// Rows dropped because their ID was already seen.
    pub duplicates: usize,
}

/// A valid row that has no position yet.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlocatedStation {
    pub id: StationId,
    pub price_per_unit: f64,
    pub locality: Locality,
}

impl UnlocatedStation {
    /// Geocoder queries to try, most specific first.
    ///
    /// `"{address}, {city}, {state}"` then `"{city}, {state}"`, leaving out
    /// blank parts.
    pub fn geocode_queries(&self) -> Vec<String> {
        let Locality {
            address,
            city,
            state,
            ..
        } = &self.locality;

        let join = |parts: &[&String]| {
            parts
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut queries = vec![join(&[address, city, state])];
        let coarse = join(&[city, state]);
        if !coarse.is_empty() && coarse != queries[0] {
            queries.push(coarse);
        }
        queries.retain(|q| !q.is_empty());
        queries
    }

    /// Attach a position.
    pub fn locate(self, position: Coordinate) -> Result<Station, InvalidPrice> {
        Station::new(self.id, position, self.price_per_unit, self.locality)
    }
}

/// Parsed dataset, before geocoding.
#[derive(Debug, Clone, Default)]
pub struct StationRecords {
    /// Rows that carried their own position.
    pub located: Vec<Station>,
    /// Rows that still need one.
    pub unlocated: Vec<UnlocatedStation>,
    pub summary: LoadSummary,
}

/// Load stations from a CSV file.
pub fn load_stations_csv(path: &Path) -> Result<StationRecords, StationError> {
    let file = File::open(path).map_err(|source| StationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_stations(file)?;

    info!(
        path = %path.display(),
        located = records.located.len(),
        unlocated = records.unlocated.len(),
        skipped = records.summary.skipped,
        duplicates = records.summary.duplicates,
        "read station data"
    );

    Ok(records)
}

/// Parse stations from any CSV source.
pub fn read_stations<R: Read>(reader: R) -> Result<StationRecords, StationError> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (normalize_header(h), i))
        .collect();

    let missing: Vec<String> = REQUIRED
        .iter()
        .filter(|(key, _)| !columns.contains_key(*key))
        .map(|(_, label)| label.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(StationError::MissingColumns(missing));
    }

    let mut records = StationRecords::default();
    let mut seen = HashSet::new();

    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = i + 2;

        let parsed = match parse_row(&record, &columns) {
            Ok(parsed) => parsed,
            Err(reason) => {
                debug!(row, reason, "skipping station row");
                records.summary.skipped += 1;
                continue;
            }
        };

        if !seen.insert(parsed.id()) {
            records.summary.duplicates += 1;
            continue;
        }

        match parsed {
            Row::Located(station) => {
                records.located.push(station);
                records.summary.loaded += 1;
            }
            Row::Unlocated(station) => records.unlocated.push(station),
        }
    }

    Ok(records)
}

/// Lowercase, keep only alphanumerics ("OPIS Truckstop ID" -> "opistruckstopid").
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

enum Row {
    Located(Station),
    Unlocated(UnlocatedStation),
}

impl Row {
    fn id(&self) -> StationId {
        match self {
            Row::Located(s) => s.id,
            Row::Unlocated(s) => s.id,
        }
    }
}

fn parse_row(record: &StringRecord, columns: &HashMap<String, usize>) -> Result<Row, &'static str> {
    let field = |key: &str| {
        columns
            .get(key)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    };

    let id: u64 = field(COL_ID).parse().map_err(|_| "bad id")?;
    let price: f64 = field(COL_PRICE).parse().map_err(|_| "bad price")?;
    check_price(price).map_err(|_| "negative price")?;

    let locality = Locality {
        name: field(COL_NAME).to_string(),
        address: field(COL_ADDRESS).to_string(),
        city: field(COL_CITY).to_string(),
        state: field(COL_STATE).to_uppercase(),
    };

    let (lat, lng) = (field(COL_LAT), field(COL_LNG));
    if lat.is_empty() && lng.is_empty() {
        return Ok(Row::Unlocated(UnlocatedStation {
            id: StationId(id),
            price_per_unit: price,
            locality,
        }));
    }

    let lat: f64 = lat.parse().map_err(|_| "bad latitude")?;
    let lng: f64 = lng.parse().map_err(|_| "bad longitude")?;
    let position = Coordinate::new(lat, lng).map_err(|_| "position out of range")?;

    Station::new(StationId(id), position, price, locality)
        .map(Row::Located)
        .map_err(|_| "negative price")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const HEADER: &str = "OPIS Truckstop ID,Truckstop Name,Address,City,State,Rack ID,Retail Price,Latitude,Longitude\n";
    const OPIS_HEADER: &str =
        "OPIS Truckstop ID,Truckstop Name,Address,City,State,Rack ID,Retail Price\n";

    fn read(body: &str) -> StationRecords {
        read_stations(Cursor::new(format!("{HEADER}{body}"))).unwrap()
    }

    #[test]
    fn parses_rows() {
        let records = read(
            "7,WOODSHED OF BIG CABIN,\"I-44, EXIT 283 & US-69\",Big Cabin,ok,307,3.00733,36.53,-95.22\n",
        );

        assert_eq!(records.summary.loaded, 1);
        assert!(records.unlocated.is_empty());
        let s = &records.located[0];
        assert_eq!(s.id, StationId(7));
        assert_eq!(s.price_per_unit(), 3.00733);
        assert_eq!(s.position.lat(), 36.53);
        assert_eq!(s.locality.address, "I-44, EXIT 283 & US-69");
        assert_eq!(s.locality.city, "Big Cabin");
        assert_eq!(s.locality.state, "OK");
    }

    #[test]
    fn opis_export_without_positions() {
        let csv = format!(
            "{OPIS_HEADER}7,WOODSHED OF BIG CABIN,\"I-44, EXIT 283 & US-69\",Big Cabin,OK,307,3.00733\n"
        );
        let records = read_stations(Cursor::new(csv)).unwrap();

        assert!(records.located.is_empty());
        assert_eq!(records.summary.loaded, 0);
        assert_eq!(records.summary.skipped, 0);

        let row = &records.unlocated[0];
        assert_eq!(row.id, StationId(7));
        assert_eq!(row.price_per_unit, 3.00733);
        assert_eq!(
            row.geocode_queries(),
            vec![
                "I-44, EXIT 283 & US-69, Big Cabin, OK".to_string(),
                "Big Cabin, OK".to_string(),
            ]
        );
    }

    #[test]
    fn geocode_queries_skip_blank_parts() {
        let row = UnlocatedStation {
            id: StationId(1),
            price_per_unit: 3.0,
            locality: Locality {
                city: "Elko".into(),
                state: "NV".into(),
                ..Locality::default()
            },
        };
        assert_eq!(row.geocode_queries(), vec!["Elko, NV".to_string()]);

        let empty = UnlocatedStation {
            locality: Locality::default(),
            ..row
        };
        assert!(empty.geocode_queries().is_empty());
    }

    #[test]
    fn first_duplicate_wins() {
        let records = read(
            "7,First,a,c,OK,1,3.00,36.5,-95.2\n\
             7,Second,a,c,OK,1,2.00,,\n",
        );

        assert_eq!(records.located.len(), 1);
        assert!(records.unlocated.is_empty());
        assert_eq!(records.located[0].locality.name, "First");
        assert_eq!(records.summary.duplicates, 1);
    }

    #[test]
    fn bad_rows_are_skipped() {
        let records = read(
            "1,No Coords,a,c,OK,1,3.00,,\n\
             2,Bad Price,a,c,OK,1,n/a,36.5,-95.2\n\
             3,Off Globe,a,c,OK,1,3.00,123.0,-95.2\n\
             4,Negative,a,c,OK,1,-1.0,36.5,-95.2\n\
             5,Good,a,c,OK,1,3.10,36.5,-95.2\n\
             6,Half,a,c,OK,1,3.10,36.5,\n\
             8,Negative Unlocated,a,c,OK,1,-2.0,,\n",
        );

        assert_eq!(records.located.len(), 1);
        assert_eq!(records.located[0].id, StationId(5));
        assert_eq!(records.unlocated.len(), 1);
        assert_eq!(records.unlocated[0].id, StationId(1));
        assert_eq!(
            records.summary,
            LoadSummary {
                loaded: 1,
                geocoded: 0,
                skipped: 5,
                duplicates: 0
            }
        );
    }

    #[test]
    fn header_matching_is_loose() {
        let csv = "opis_truckstop_id,TRUCKSTOP NAME,address,city,state,retail price,latitude,longitude\n\
                   9,X,a,c,tx,2.5,31.0,-99.0\n";
        let records = read_stations(Cursor::new(csv)).unwrap();
        assert_eq!(records.located[0].id, StationId(9));
    }

    #[test]
    fn missing_columns_are_reported() {
        let csv = "OPIS Truckstop ID,Truckstop Name,Address,City,State\n";
        let err = read_stations(Cursor::new(csv)).unwrap_err();
        match err {
            StationError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Retail Price".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}1,A,a,c,NV,1,3.50,39.5,-119.8\n2,B,a,c,NV,1,3.40,,\n").unwrap();

        let records = load_stations_csv(file.path()).unwrap();
        assert_eq!(records.located.len(), 1);
        assert_eq!(records.unlocated.len(), 1);
        assert_eq!(records.summary.loaded, 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_stations_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, StationError::Io { .. }));
    }
}
