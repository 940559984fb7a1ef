//! Station repository error types.

use std::path::PathBuf;

/// Errors from loading or querying station data.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Dataset file could not be opened
    #[error("cannot open station data {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV (bad quoting, unreadable header row, ...)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Header row lacks columns we need
    #[error("station data missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Backing store could not answer the query
    #[error("station store unavailable: {0}")]
    Unavailable(String),
}
